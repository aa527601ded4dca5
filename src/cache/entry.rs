//! A single resident cache entry.

/// One resident response in the cache.
///
/// `size` is tracked separately from `payload.len()` so the invariant
/// `current_size == sum(entry.size)` can be checked without re-deriving
/// it from the payload on every pass.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub(crate) key: String,
    pub(crate) payload: Vec<u8>,
    pub(crate) size: u64,
}

impl CacheEntry {
    pub(crate) fn new(key: String, payload: Vec<u8>) -> Self {
        let size = payload.len() as u64;
        CacheEntry { key, payload, size }
    }
}
