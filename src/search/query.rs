//! Query normalization and matching

use serde::Serialize;

/// How a query is compared against identifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Identifier equals or starts with the query
    #[default]
    Prefix,
    /// Identifier equals the query
    Exact,
}

/// A trimmed, lower-cased query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    normalized: String,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        Self {
            normalized: raw.trim().to_lowercase(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Length in characters after trimming
    pub fn char_len(&self) -> usize {
        self.normalized.chars().count()
    }

    /// Case-insensitive comparison against an identifier
    pub fn matches(&self, id: &str, mode: SearchMode) -> bool {
        let id = id.to_lowercase();
        match mode {
            SearchMode::Prefix => id.starts_with(&self.normalized),
            SearchMode::Exact => id == self.normalized,
        }
    }
}

/// Where a query came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOrigin {
    /// Typed input, after the quiet period
    Typed,
    /// An identifier picked from a result list
    Selected,
    /// A value decoded by the scanner
    Scanned,
}

/// A query on its way to the search engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub text: String,
    pub mode: SearchMode,
    pub origin: QueryOrigin,
}

impl QueryRequest {
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: SearchMode::Prefix,
            origin: QueryOrigin::Typed,
        }
    }

    pub fn selected(id: impl Into<String>) -> Self {
        Self {
            text: id.into(),
            mode: SearchMode::Exact,
            origin: QueryOrigin::Selected,
        }
    }

    pub fn scanned(value: impl Into<String>) -> Self {
        Self {
            text: value.into(),
            mode: SearchMode::Exact,
            origin: QueryOrigin::Scanned,
        }
    }
}
