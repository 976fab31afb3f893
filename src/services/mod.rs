//! Services for tracker storage and aggregation

pub mod aggregator;
pub mod source;
pub mod store;

pub use aggregator::{AggregationEngine, AggregationReport, AggregationRequest, ReportRow};
pub use source::{Source, SourceFactory};
pub use store::{Record, Tracker, TrackerStore};
