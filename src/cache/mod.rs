//! Thread-safe, bounded, in-memory LRU cache for proxied HTTP responses.
//!
//! The cache couples a [`HashMap`] index with a doubly linked [`List`] of
//! [`CacheEntry`] values under a single [`parking_lot::RwLock`]. The two
//! structures are kept in lockstep: a key is resident if and only if it
//! has both an index entry and a list node, and `current_size` always
//! equals the sum of resident entry sizes.
//!
//! # Locking discipline
//!
//! `put` takes the write lock for its whole duration. `get` takes the
//! read lock first; on a hit it must release the read lock and
//! re-acquire the write lock to promote the entry to MRU, since
//! `parking_lot::RwLock` has no atomic read-to-write upgrade. Between
//! the release and the re-acquire, a concurrent `put`/`get` may evict
//! the entry — `get` re-validates under the write lock and reports a
//! miss if so. This is correct: the entry really was gone by the time
//! the promotion would have happened.
//!
//! # Examples
//!
//! ```
//! use cache_proxy::cache::{Cache, CacheConfig};
//!
//! let cache = Cache::new(CacheConfig::new(1024, 512));
//! cache.put("http://example.com:80/".to_string(), b"hello".to_vec());
//! assert_eq!(cache.get("http://example.com:80/"), Some(b"hello".to_vec()));
//! ```

mod config;
mod entry;
mod list;
mod metrics;

pub use config::CacheConfig;
pub use metrics::CacheStats;

use entry::CacheEntry;
use list::{List, NodeHandle};
use metrics::CacheMetrics;

use std::collections::HashMap;

use parking_lot::RwLock;

struct Inner {
    index: HashMap<String, NodeHandle<CacheEntry>>,
    order: List<CacheEntry>,
    current_size: u64,
}

impl Inner {
    fn new() -> Self {
        Inner {
            index: HashMap::new(),
            order: List::new(),
            current_size: 0,
        }
    }

    /// Evicts from the tail until `current_size + additional` fits within
    /// `max_total_size`, or until nothing is left to evict.
    fn evict_to_fit(&mut self, additional: u64, max_total_size: u64, metrics: &CacheMetrics) {
        while self.current_size + additional > max_total_size {
            let Some(evicted) = self.order.pop_back() else {
                break;
            };
            self.index.remove(&evicted.key);
            self.current_size = self.current_size.saturating_sub(evicted.size);
            metrics.record_eviction();
            tracing::debug!(key = %evicted.key, size = evicted.size, "cache evict");
        }
    }
}

/// A thread-safe, bounded LRU cache keyed by cache-key strings.
///
/// Cloning a [`Cache`] is not supported directly — share it across
/// workers behind an `Arc`, as the connection pipeline does.
pub struct Cache {
    inner: RwLock<Inner>,
    config: CacheConfig,
    metrics: CacheMetrics,
}

impl Cache {
    /// Constructs an empty cache with the given limits. Analogous to the
    /// spec's `cache_init`; construction cannot fail in this
    /// reimplementation since there is no separate lock object to
    /// initialize.
    pub fn new(config: CacheConfig) -> Self {
        Cache {
            inner: RwLock::new(Inner::new()),
            config,
            metrics: CacheMetrics::default(),
        }
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    ///
    /// Returns a fresh copy of the payload; the caller owns it
    /// independently of whatever happens to the cache afterward.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        {
            let guard = self.inner.read();
            if !guard.index.contains_key(key) {
                self.metrics.record_miss();
                return None;
            }
        }

        let mut guard = self.inner.write();
        match guard.index.get(key).copied() {
            Some(handle) => {
                // SAFETY: handle came from `guard.index` under this same lock
                // and has not been invalidated since (we're still holding it).
                let payload = unsafe {
                    guard.order.move_to_front(handle);
                    guard.order.get_mut(handle).payload.clone()
                };
                self.metrics.record_hit();
                Some(payload)
            }
            None => {
                // Evicted between the read-lock lookup and the write-lock
                // re-validation. Correct outcome: report a miss.
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Admits `data` under `key`, subject to the per-entry and aggregate
    /// size budgets. A silent no-op if `data` exceeds `max_element_size`.
    pub fn put(&self, key: String, data: Vec<u8>) {
        let size = data.len() as u64;
        if size > self.config.max_element_size() {
            self.metrics.record_rejected_oversize();
            tracing::debug!(%key, size, "cache put rejected: exceeds max element size");
            return;
        }

        let mut guard = self.inner.write();

        if let Some(&handle) = guard.index.get(&key) {
            // SAFETY: handle came from `guard.index` under this same lock.
            let old_size = unsafe {
                guard.order.move_to_front(handle);
                let entry = guard.order.get_mut(handle);
                let old_size = entry.size;
                entry.payload = data;
                entry.size = size;
                old_size
            };
            guard.current_size = guard.current_size - old_size + size;
            guard.evict_to_fit(0, self.config.max_total_size(), &self.metrics);
            self.metrics.record_admission();
            tracing::debug!(%key, size, "cache admit (replace)");
            return;
        }

        if size > self.config.max_total_size() {
            // Can never fit regardless of eviction; leave state untouched.
            tracing::warn!(%key, size, "cache put abandoned: exceeds total budget");
            return;
        }

        guard.evict_to_fit(size, self.config.max_total_size(), &self.metrics);
        let handle = guard.order.push_front(CacheEntry::new(key.clone(), data));
        guard.index.insert(key.clone(), handle);
        guard.current_size += size;
        self.metrics.record_admission();
        tracing::debug!(%key, size, "cache admit (new)");
    }

    /// Drains all resident entries. The cache remains usable afterward;
    /// this is the explicit-drain analogue of the spec's `cache_destroy`,
    /// scoped so tests can reset a shared cache between scenarios.
    pub fn clear(&self) {
        let mut guard = self.inner.write();
        guard.index.clear();
        guard.order.clear();
        guard.current_size = 0;
    }

    /// Returns the total size in bytes of all entries currently stored in the cache.
    pub fn current_size(&self) -> u64 {
        self.inner.read().current_size
    }

    /// Returns the number of entries currently stored in the cache.
    pub fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    /// Returns `true` if the cache contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configuration the cache was constructed with.
    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Snapshot of hit/miss/eviction counters. Observability only — see
    /// module docs on why these carry no correctness obligation.
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("current_size", &self.current_size())
            .field("len", &self.len())
            .finish()
    }
}

// SAFETY: Cache's only interior state is an `RwLock<Inner>`; all access to
// the raw-pointer-based `List` inside `Inner` happens through the lock.
unsafe impl Sync for Cache {}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cache(max_total: u64, max_element: u64) -> Cache {
        Cache::new(CacheConfig::new(max_total, max_element))
    }

    #[test]
    fn cache_hit_returns_admitted_payload_and_promotes_to_mru() {
        let cache = small_cache(1024, 1024);
        cache.put("http://a:80/x".to_string(), b"hello".to_vec());
        assert_eq!(cache.get("http://a:80/x"), Some(b"hello".to_vec()));
    }

    #[test]
    fn miss_on_absent_key() {
        let cache = small_cache(1024, 1024);
        assert_eq!(cache.get("http://nope:80/"), None);
    }

    #[test]
    fn eviction_removes_least_recently_used() {
        let cache = small_cache(10, 10);
        cache.put("k1".to_string(), vec![0u8; 6]);
        cache.put("k2".to_string(), vec![0u8; 5]);
        // k1 (6B) + k2 (5B) = 11B > 10B budget: k1 is evicted.
        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.get("k2").map(|v| v.len()), Some(5));
    }

    #[test]
    fn access_promotes_entry_ahead_of_fresh_insert() {
        let cache = small_cache(10, 10);
        cache.put("a".to_string(), vec![0u8; 4]);
        cache.put("b".to_string(), vec![0u8; 4]);
        cache.put("c".to_string(), vec![0u8; 4]); // evicts a (4+4+4=12 > 10)
        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some()); // promotes b to MRU
        cache.put("d".to_string(), vec![0u8; 4]); // evicts c (b was promoted)
        assert_eq!(cache.get("c"), None);
        assert!(cache.get("b").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn oversize_put_is_rejected_without_mutating_state() {
        let cache = small_cache(1000, 100);
        cache.put("big".to_string(), vec![0u8; 101]);
        assert_eq!(cache.get("big"), None);
        assert_eq!(cache.current_size(), 0);
        assert_eq!(cache.stats().rejected_oversize, 1);
    }

    #[test]
    fn put_twice_replaces_payload_and_promotes() {
        let cache = small_cache(1024, 1024);
        cache.put("k".to_string(), b"first".to_vec());
        cache.put("k".to_string(), b"second!".to_vec());
        assert_eq!(cache.get("k"), Some(b"second!".to_vec()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn filling_to_exact_budget_then_inserting_evicts_tail() {
        let cache = small_cache(10, 10);
        cache.put("a".to_string(), vec![0u8; 10]);
        assert_eq!(cache.current_size(), 10);
        cache.put("b".to_string(), vec![0u8; 1]);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.current_size(), 1);
    }

    #[test]
    fn entry_at_exact_total_budget_evicts_everything_else() {
        let cache = small_cache(10, 10);
        cache.put("a".to_string(), vec![0u8; 3]);
        cache.put("b".to_string(), vec![0u8; 3]);
        cache.put("c".to_string(), vec![0u8; 10]);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.current_size(), 10);
    }

    #[test]
    fn current_size_never_exceeds_budget_across_many_puts() {
        let cache = small_cache(100, 20);
        for i in 0..50 {
            cache.put(format!("k{i}"), vec![0u8; 7]);
            assert!(cache.current_size() <= 100);
        }
    }

    #[test]
    fn clear_drains_all_entries() {
        let cache = small_cache(1024, 1024);
        cache.put("a".to_string(), vec![1, 2, 3]);
        cache.put("b".to_string(), vec![4, 5, 6]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.current_size(), 0);
        assert_eq!(cache.get("a"), None);
    }
}
