//! Cache of materialized notifiers and the invalidation contract the
//! repositories drive.
//!
//! Repositories never read through the cache. They only invalidate: a single
//! entry after writes that concern one notifier, everything after a recipient
//! disappears from the registry (which may touch any notifier).

use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use crate::types::Notifier;

pub trait NotifierCacheInvalidator: Send + Sync {
    fn invalidate(&self, name: &str);

    fn invalidate_all(&self);
}

/// For callers that keep no notifier cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl NotifierCacheInvalidator for NoopInvalidator {
    fn invalidate(&self, _name: &str) {}

    fn invalidate_all(&self) {}
}

/// Bounded, TTL-limited notifier cache for the scheduling side.
#[derive(Clone)]
pub struct NotifierCache {
    inner: Cache<String, Notifier>,
}

impl NotifierCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Notifier> {
        self.inner.get(name)
    }

    pub fn insert(&self, notifier: Notifier) {
        self.inner.insert(notifier.name.clone(), notifier);
    }
}

impl NotifierCacheInvalidator for NotifierCache {
    fn invalidate(&self, name: &str) {
        debug!(notifier = name, "notifier cache entry invalidated");
        self.inner.invalidate(name);
    }

    fn invalidate_all(&self) {
        debug!("notifier cache invalidated");
        self.inner.invalidate_all();
    }
}
