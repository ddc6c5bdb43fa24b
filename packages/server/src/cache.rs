use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::snapshot::TestCaseSnapshot;

/// Session-scoped memo of fetched test case lists, keyed by Polygon id.
///
/// Entries are only ever written from the same session's fetch. There is no
/// time-based expiry; the migrator invalidates after a successful blob sync.
pub trait TestCaseCache: Send + Sync {
    fn put(&self, polygon_id: i64, test_cases: Arc<Vec<TestCaseSnapshot>>);
    fn get(&self, polygon_id: i64) -> Option<Arc<Vec<TestCaseSnapshot>>>;
    fn invalidate(&self, polygon_id: i64);
}

/// Capacity-bounded in-memory cache.
pub struct LruTestCaseCache {
    inner: Mutex<LruCache<i64, Arc<Vec<TestCaseSnapshot>>>>,
}

impl LruTestCaseCache {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl TestCaseCache for LruTestCaseCache {
    fn put(&self, polygon_id: i64, test_cases: Arc<Vec<TestCaseSnapshot>>) {
        let mut cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        cache.put(polygon_id, test_cases);
    }

    fn get(&self, polygon_id: i64) -> Option<Arc<Vec<TestCaseSnapshot>>> {
        let mut cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(&polygon_id).cloned()
    }

    fn invalidate(&self, polygon_id: i64) {
        let mut cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        cache.pop(&polygon_id);
    }
}
