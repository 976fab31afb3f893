//! Type definitions for tallytrack

mod category;
mod error;
mod period;
mod quantity;

pub use category::*;
pub use error::*;
pub use period::*;
pub use quantity::*;
