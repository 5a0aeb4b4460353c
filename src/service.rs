//! Shared lookup facade over the loaded store

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{error, info};

use crate::config::{Config, IngestPolicy};
use crate::error::Result;
use crate::model::{MatchResult, TabularStore};
use crate::parser::{self, ParsedTable, ParserFactory};
use crate::search::{PrefixSearch, Query, QueryOrigin, QueryRequest, SearchMode};

/// Result of evaluating a [`QueryRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchOutcome {
    /// The query was searched
    Results {
        query: String,
        origin: QueryOrigin,
        result: MatchResult,
    },
    /// Typed input too short to search; results should be cleared
    Reset,
}

/// Load, clear and search one dataset
///
/// Cheap to clone; clones share the same store. Loads and clears take the
/// write lock, searches the read lock.
#[derive(Clone, Default)]
pub struct LookupService {
    store: Arc<RwLock<TabularStore>>,
    policy: IngestPolicy,
}

impl LookupService {
    pub fn new(policy: IngestPolicy) -> Self {
        Self {
            store: Arc::new(RwLock::new(TabularStore::new())),
            policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ingest_policy)
    }

    pub fn policy(&self) -> IngestPolicy {
        self.policy
    }

    /// Parse raw file bytes and replace the loaded dataset
    ///
    /// Returns the number of distinct identifiers loaded.
    pub fn load(&self, bytes: &[u8]) -> Result<usize> {
        self.ingest_with(|| parser::ingest(bytes))
    }

    /// Read a file from disk and replace the loaded dataset
    pub fn load_path(&self, path: &Path) -> Result<usize> {
        self.ingest_with(|| ParserFactory::new().parse_path(path))
    }

    fn ingest_with(&self, parse: impl FnOnce() -> Result<ParsedTable>) -> Result<usize> {
        if self.policy == IngestPolicy::ClearFirst {
            self.write().clear();
        }

        let table = match parse() {
            Ok(table) => table,
            Err(err) => {
                error!(%err, "error parsing data file");
                return Err(err);
            }
        };

        let mut store = self.write();
        store.load(table.headers, table.rows)?;
        info!(
            items = store.len(),
            columns = store.headers().len(),
            "data loaded"
        );
        Ok(store.len())
    }

    /// Drop all loaded data
    pub fn clear(&self) {
        self.write().clear();
        info!("data cleared");
    }

    pub fn is_loaded(&self) -> bool {
        !self.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Current header labels
    pub fn headers(&self) -> Vec<String> {
        self.read().headers().to_vec()
    }

    /// Values for an exact, case-sensitive identifier
    pub fn get(&self, id: &str) -> Option<Vec<String>> {
        self.read().get(id).map(<[String]>::to_vec)
    }

    /// Prefix search capped at `limit`
    pub fn search(&self, query: &str, limit: usize) -> MatchResult {
        PrefixSearch::new(&self.read()).find_by_prefix(query, limit)
    }

    /// Case-insensitive exact lookup, at most one match
    pub fn search_exact(&self, id: &str) -> MatchResult {
        PrefixSearch::new(&self.read()).find_exact(id)
    }

    /// Evaluate a request the way the interactive session does
    ///
    /// Typed queries shorter than `min_query_len` reset instead of searching.
    pub fn evaluate(&self, request: &QueryRequest, limit: usize, min_query_len: usize) -> SearchOutcome {
        let query = Query::new(&request.text);
        if query.is_empty() {
            return SearchOutcome::Reset;
        }
        if request.origin == QueryOrigin::Typed && query.char_len() < min_query_len {
            return SearchOutcome::Reset;
        }

        let limit = match request.mode {
            SearchMode::Prefix => limit,
            SearchMode::Exact => 1,
        };
        let result = PrefixSearch::new(&self.read()).find(&query, request.mode, limit);
        SearchOutcome::Results {
            query: request.text.clone(),
            origin: request.origin,
            result,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TabularStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TabularStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}
