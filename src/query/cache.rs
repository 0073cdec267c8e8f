//! Memoized query results keyed by canonical query key.

use std::collections::{BTreeMap, HashMap};

use super::engine::ResultRow;
use super::facet::{FacetId, NumericRange};

/// Facet values as they were when a query was computed.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetSnapshot {
    pub possible: BTreeMap<String, usize>,
    pub range: NumericRange,
}

#[derive(Debug, Clone)]
pub struct CachedQuery {
    /// Indices of matching entries, in table order.
    pub matched: Vec<usize>,
    /// Matches plus their ancestors, ready for display.
    pub results: Vec<ResultRow>,
    /// Restored on a hit. Has no entry for a facet that was held open.
    pub facets: BTreeMap<FacetId, FacetSnapshot>,
}

/// Result cache. Only cleared when the engine loads a new record set.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<String, CachedQuery>,
    hits: usize,
    misses: usize,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a key up, counting the hit or miss.
    pub fn get(&mut self, key: &str) -> Option<&CachedQuery> {
        match self.entries.get(key) {
            Some(cached) => {
                self.hits += 1;
                Some(cached)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: String, cached: CachedQuery) {
        self.entries.insert(key, cached);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}
