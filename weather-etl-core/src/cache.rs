//! Time-boxed memoization in front of the storage read path.
//!
//! Results are keyed by the canonical `{filter, page, limit}` signature and
//! stay valid for one TTL. Expired entries are evicted lazily by the access
//! that finds them expired; there is no background sweep and no capacity
//! bound, since the key space is limited to the distinct queries actually
//! made.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::StoreError;
use crate::model::{QueryOptions, WeatherRecord};
use crate::store::Store;

/// Time source for entry ageing; injectable so tests control expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time, the production clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Canonical cache key; equal option sets hash identically no matter how
/// they were constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueryKey {
    filter: Option<String>,
    page: u32,
    limit: u32,
}

impl From<&QueryOptions> for QueryKey {
    fn from(options: &QueryOptions) -> Self {
        Self { filter: options.filter.clone(), page: options.page, limit: options.limit }
    }
}

/// One memoized result; replaced on refetch, never mutated in place.
struct CacheEntry {
    records: Vec<WeatherRecord>,
    captured_at: Instant,
}

/// TTL-bounded cache over the storage collaborator's read path.
pub struct QueryCache {
    store: Arc<dyn Store>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
}

impl QueryCache {
    pub fn new(store: Arc<dyn Store>, ttl: Duration) -> Self {
        Self::with_clock(store, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn Store>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { store, ttl, clock, entries: Mutex::new(HashMap::new()) }
    }

    /// Return the memoized result for these options, or delegate to storage
    /// and memoize the outcome. Empty result sets are cached like any other.
    ///
    /// The entry map lock is not held across the storage call, so two
    /// concurrent misses for one key may both hit storage and both insert;
    /// the reads are idempotent and the last write wins.
    pub async fn get_data(
        &self,
        options: &QueryOptions,
    ) -> Result<Vec<WeatherRecord>, StoreError> {
        let key = QueryKey::from(options);
        let now = self.clock.now();

        {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get(&key) {
                if now.duration_since(entry.captured_at) < self.ttl {
                    debug!(?key, "query cache hit");
                    return Ok(entry.records.clone());
                }
                debug!(?key, "query cache entry expired, evicting");
                entries.remove(&key);
            }
        }

        debug!(?key, "query cache miss, delegating to storage");
        let records = self.store.find_data(options).await?;

        let entry = CacheEntry { records: records.clone(), captured_at: now };
        self.entries.lock().insert(key, entry);

        Ok(records)
    }
}
