//! Data model for loaded records

mod result;
mod table;

pub use result::MatchResult;
pub use table::{Row, RowMap, TabularStore};
