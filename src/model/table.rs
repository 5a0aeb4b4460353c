//! Row and in-memory store keyed by identifier

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::error::{LookupError, Result};

/// Identifier to field values, in first-insertion order
pub type RowMap = IndexMap<String, Vec<String>, FxBuildHasher>;

/// A parsed record: identifier plus field values parallel to the headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Unique key (first column of the source file)
    pub id: String,
    /// Field values, `values[i]` labelled by `headers[i]`
    pub values: Vec<String>,
}

impl Row {
    /// Create a new row
    pub fn new(id: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    /// Build a row from raw cells: cell 0 is the identifier
    ///
    /// Returns `None` for a row without cells.
    pub fn from_cells(mut cells: Vec<String>) -> Option<Self> {
        if cells.is_empty() {
            return None;
        }
        let values = cells.split_off(1);
        let id = cells.pop()?;
        Some(Self { id, values })
    }
}

/// Loaded dataset: header labels plus rows keyed by identifier
///
/// Rows keep the position of their first insertion; re-inserting an
/// identifier replaces its values in place (last write wins).
#[derive(Debug, Default, Clone)]
pub struct TabularStore {
    headers: Vec<String>,
    rows: RowMap,
}

impl TabularStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole content of the store
    ///
    /// Every row is padded with empty values or truncated to the header
    /// width. Fails without touching the store when `rows` is empty.
    pub fn load(&mut self, headers: Vec<String>, rows: Vec<Row>) -> Result<()> {
        if rows.is_empty() {
            return Err(LookupError::EmptyInput);
        }

        let width = headers.len();
        let mut map = RowMap::with_capacity_and_hasher(rows.len(), FxBuildHasher);
        for mut row in rows {
            if row.values.len() != width {
                debug!(
                    id = %row.id,
                    found = row.values.len(),
                    expected = width,
                    "normalizing row width"
                );
                row.values.resize(width, String::new());
            }
            map.insert(row.id, row.values);
        }

        self.headers = headers;
        self.rows = map;
        Ok(())
    }

    /// Reset to empty headers and no rows
    pub fn clear(&mut self) {
        self.headers.clear();
        self.rows.clear();
    }

    /// Current header labels (empty when nothing is loaded)
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Look up a row's values by exact, case-sensitive identifier
    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.rows.get(id).map(Vec::as_slice)
    }

    /// Iterate rows in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
