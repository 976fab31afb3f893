//! Data source traits consumed by the aggregation engine

use crate::types::{Bucket, CategoryFilter, CategoryId, Result, Window};

/// One independently queryable tracker
pub trait Source {
    /// Tracker name (e.g., "groceries")
    fn name(&self) -> &str;

    /// Display name of a category id, or `CategoryNotFound`
    fn resolve_category(&self, id: CategoryId) -> Result<String>;

    /// Summed quantities, one bucket per period unit, for every unit
    /// from the window's anchor onwards. Units with no samples are absent.
    fn query(&self, window: &Window, filter: &CategoryFilter) -> Result<Vec<Bucket>>;
}

/// Opens sources by name. Shared by every worker of one aggregation.
pub trait SourceFactory: Send + Sync {
    type Source: Source;

    /// Open a source, or `SourceNotFound`
    fn open(&self, name: &str) -> Result<Self::Source>;

    /// Names of every known source, sorted
    fn list(&self) -> Result<Vec<String>>;
}
