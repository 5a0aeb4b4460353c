//! Search result snapshot

use indexmap::IndexMap;
use serde::Serialize;

/// Headers plus the matched rows, in the order they were found
///
/// Owns its data: later changes to the store never show up in a result
/// that was already handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    /// Header labels at query time
    pub headers: Vec<String>,
    /// Matched identifier to field values
    pub matches: IndexMap<String, Vec<String>>,
}

impl MatchResult {
    /// A result with no matches
    pub fn empty(headers: Vec<String>) -> Self {
        Self {
            headers,
            matches: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Values for a matched identifier
    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.matches.get(id).map(Vec::as_slice)
    }

    /// Matched identifiers in result order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.matches.keys().map(String::as_str)
    }

    /// The only match, if there is exactly one
    pub fn single(&self) -> Option<(&str, &[String])> {
        if self.matches.len() != 1 {
            return None;
        }
        self.matches
            .first()
            .map(|(id, values)| (id.as_str(), values.as_slice()))
    }

    /// Header/value pairs of a row, skipping values without a header label
    pub fn labelled<'a>(&'a self, values: &'a [String]) -> impl Iterator<Item = (&'a str, &'a str)> {
        values.iter().enumerate().filter_map(move |(i, value)| {
            self.headers
                .get(i)
                .filter(|label| !label.is_empty())
                .map(|label| (label.as_str(), value.as_str()))
        })
    }
}
