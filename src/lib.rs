//! scanfind - Prefix lookup over delimited data, fed by typing or barcode scans
//!
//! Loads a CSV-style file keyed by its first column, answers case-insensitive
//! prefix queries over the identifiers, and can drive the same query path
//! from a barcode scanner.

pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod output;
pub mod parser;
pub mod scan;
pub mod search;
pub mod service;
pub mod session;

pub use config::Config;
pub use error::{LookupError, Result};
pub use model::MatchResult;
pub use service::{LookupService, SearchOutcome};
pub use session::Session;
