//! Configuration for the LRU response cache.

/// Fixed-at-init limits for a [`Cache`](super::Cache).
///
/// # Examples
///
/// ```
/// use cache_proxy::cache::CacheConfig;
///
/// let config = CacheConfig::new(200 * 1024 * 1024, 10 * 1024 * 1024);
/// assert_eq!(config.max_total_size(), 200 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    max_total_size: u64,
    max_element_size: u64,
}

impl CacheConfig {
    /// The example default from the proxy's operational profile: 200 MiB
    /// total budget, 10 MiB per-entry ceiling.
    pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 200 * 1024 * 1024;
    /// The example default per-entry ceiling: 10 MiB.
    pub const DEFAULT_MAX_ELEMENT_SIZE: u64 = 10 * 1024 * 1024;

    /// Creates a new configuration. `max_element_size` should not exceed
    /// `max_total_size`; a cache built from such a config simply never
    /// admits anything, since no single element could ever fit.
    pub fn new(max_total_size: u64, max_element_size: u64) -> Self {
        CacheConfig {
            max_total_size,
            max_element_size,
        }
    }

    /// The aggregate byte budget across all resident entries.
    pub fn max_total_size(&self) -> u64 {
        self.max_total_size
    }

    /// The byte size ceiling for any single entry.
    pub fn max_element_size(&self) -> u64 {
        self.max_element_size
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::new(Self::DEFAULT_MAX_TOTAL_SIZE, Self::DEFAULT_MAX_ELEMENT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_example_limits() {
        let config = CacheConfig::default();
        assert_eq!(config.max_total_size(), 200 * 1024 * 1024);
        assert_eq!(config.max_element_size(), 10 * 1024 * 1024);
    }
}
