//! Shared state for API handlers

use std::sync::Arc;

use feed::FeedClient;
use warehouse::WarehouseReader;

use crate::cache::MemoCache;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub(crate) reader: Arc<WarehouseReader>,
    pub(crate) feed: Arc<FeedClient>,
    pub(crate) cache: Arc<MemoCache>,
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState").field("cached", &self.cache.len()).finish_non_exhaustive()
    }
}

impl ApiState {
    /// Create a new [`ApiState`] with an empty cache.
    pub fn new(reader: WarehouseReader, feed: FeedClient) -> Self {
        Self {
            reader: Arc::new(reader),
            feed: Arc::new(feed),
            cache: Arc::new(MemoCache::new()),
        }
    }
}
