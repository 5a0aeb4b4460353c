//! Identifier lookup over a loaded store

mod query;

use tracing::{debug, trace};

use crate::model::{MatchResult, TabularStore};

pub use query::{Query, QueryOrigin, QueryRequest, SearchMode};

/// Scans a store's identifiers in insertion order
///
/// Results are the first `limit` matches in that order; there is no ranking.
pub struct PrefixSearch<'a> {
    store: &'a TabularStore,
}

impl<'a> PrefixSearch<'a> {
    /// Create a search over a store
    pub fn new(store: &'a TabularStore) -> Self {
        Self { store }
    }

    /// Rows whose identifier equals or starts with `partial_id`
    pub fn find_by_prefix(&self, partial_id: &str, limit: usize) -> MatchResult {
        self.find(&Query::new(partial_id), SearchMode::Prefix, limit)
    }

    /// The first row whose identifier equals `id`, ignoring case
    pub fn find_exact(&self, id: &str) -> MatchResult {
        self.find(&Query::new(id), SearchMode::Exact, 1)
    }

    /// Collect up to `limit` matches for a normalized query
    pub fn find(&self, query: &Query, mode: SearchMode, limit: usize) -> MatchResult {
        let mut result = MatchResult::empty(self.store.headers().to_vec());
        if limit == 0 {
            return result;
        }

        debug!(
            term = query.as_str(),
            ?mode,
            items = self.store.len(),
            limit,
            "searching"
        );

        for (id, values) in self.store.iter() {
            if !query.matches(id, mode) {
                continue;
            }
            trace!(id, "match found");
            result.matches.insert(id.to_string(), values.to_vec());
            if result.len() >= limit {
                debug!(limit, "reached limit, stopping search");
                break;
            }
        }

        debug!(found = result.len(), "search finished");
        result
    }
}

/// Convenience function for a one-off prefix search
pub fn find_by_prefix(store: &TabularStore, partial_id: &str, limit: usize) -> MatchResult {
    PrefixSearch::new(store).find_by_prefix(partial_id, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;
    use pretty_assertions::assert_eq;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn store(ids: &[&str]) -> TabularStore {
        let mut store = TabularStore::new();
        let rows = ids
            .iter()
            .map(|id| Row::new(*id, vec![format!("value-{id}")]))
            .collect();
        store.load(strings(&["Value"]), rows).unwrap();
        store
    }

    #[test]
    fn test_prefix_matches_in_insertion_order() {
        let mut store = TabularStore::new();
        store
            .load(
                strings(&["Name", "Price"]),
                vec![
                    Row::new("001", strings(&["Widget", "9.99"])),
                    Row::new("002", strings(&["Gadget", "14.50"])),
                ],
            )
            .unwrap();

        let result = find_by_prefix(&store, "00", 10);
        assert_eq!(result.headers, strings(&["Name", "Price"]));
        assert_eq!(result.ids().collect::<Vec<_>>(), vec!["001", "002"]);
        assert_eq!(result.get("002"), Some(&strings(&["Gadget", "14.50"])[..]));
    }

    #[test]
    fn test_results_follow_insertion_not_alphabetical_order() {
        let store = store(&["ab9", "ab1", "zz", "ab5"]);
        let result = find_by_prefix(&store, "ab", 2);
        assert_eq!(result.ids().collect::<Vec<_>>(), vec!["ab9", "ab1"]);
    }

    #[test]
    fn test_case_insensitive_and_trimmed() {
        let store = store(&["ABC123", "abd"]);
        let result = find_by_prefix(&store, "  abc ", 10);
        assert_eq!(result.ids().collect::<Vec<_>>(), vec!["ABC123"]);
    }

    #[test]
    fn test_empty_query_matches_all_capped() {
        let store = store(&["a", "b", "c", "d"]);
        let result = find_by_prefix(&store, "", 3);
        assert_eq!(result.ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_limit_returns_nothing() {
        let store = store(&["a", "b"]);
        let result = find_by_prefix(&store, "a", 0);
        assert!(result.is_empty());
        assert_eq!(result.headers, strings(&["Value"]));
    }

    #[test]
    fn test_no_match_and_empty_store() {
        let store = store(&["a"]);
        assert!(find_by_prefix(&store, "zzz", 10).is_empty());

        let empty = TabularStore::new();
        let result = find_by_prefix(&empty, "a", 10);
        assert!(result.is_empty());
        assert!(result.headers.is_empty());
    }

    #[test]
    fn test_every_id_found_with_limit_one() {
        let store = store(&["100", "200", "300"]);
        for (id, values) in store.iter() {
            let result = find_by_prefix(&store, id, 1);
            assert_eq!(result.len(), 1);
            assert_eq!(result.get(id), Some(values));
        }
    }

    #[test]
    fn test_exact_skips_longer_identifiers() {
        let store = store(&["0012", "001"]);
        assert_eq!(
            find_by_prefix(&store, "001", 1).ids().collect::<Vec<_>>(),
            vec!["0012"]
        );
        let exact = PrefixSearch::new(&store).find_exact("001");
        assert_eq!(exact.ids().collect::<Vec<_>>(), vec!["001"]);
        assert!(PrefixSearch::new(&store).find_exact("00").is_empty());
    }

    #[test]
    fn test_result_is_a_snapshot() {
        let mut store = store(&["a"]);
        let result = find_by_prefix(&store, "a", 10);
        store.clear();
        assert_eq!(result.len(), 1);
        assert_eq!(result.headers, strings(&["Value"]));
    }
}
