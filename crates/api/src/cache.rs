//! Process-wide memo of normalized view results

use dashmap::DashMap;
use warehouse::{Granularity, MetricView, QueryParams};

use crate::helpers::ResultTable;

/// Cache key: a view plus the parameters that actually shape its query
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    view: MetricView,
    params: QueryParams,
}

impl CacheKey {
    /// Canonical key; granularity is ignored by views without buckets.
    pub const fn new(view: MetricView, params: QueryParams) -> Self {
        let params = if view.uses_granularity() {
            params
        } else {
            params.with_granularity(Granularity::Month)
        };
        Self { view, params }
    }
}

/// Successful view results keyed by [`CacheKey`]. Entries never expire.
#[derive(Debug, Default)]
pub struct MemoCache {
    entries: DashMap<CacheKey, ResultTable>,
}

impl MemoCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `view` under `params`.
    pub fn get(&self, view: MetricView, params: QueryParams) -> Option<ResultTable> {
        self.entries.get(&CacheKey::new(view, params)).map(|entry| entry.value().clone())
    }

    /// Remember a result, replacing any previous entry for the same key.
    pub fn insert(&self, view: MetricView, params: QueryParams, table: ResultTable) {
        self.entries.insert(CacheKey::new(view, params), table);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        cleared
    }
}
