//! CLI argument parsing and runtime configuration.

use clap::Parser;

use crate::cache::CacheConfig;

const DEFAULT_PORT: u16 = 8080;

/// A forwarding HTTP/1.x proxy with a bounded in-memory LRU response cache.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listening port. Falls back to 8080 if omitted, zero, or unparsable.
    port: Option<String>,

    /// Maximum aggregate cache size in bytes. Falls back to the
    /// documented default if omitted or unparsable.
    #[arg(long)]
    max_cache_size: Option<String>,

    /// Maximum size in bytes of any single cached response. Falls back
    /// to the documented default if omitted or unparsable.
    #[arg(long)]
    max_element_size: Option<String>,

    /// Disable the response cache; every request is forwarded.
    #[arg(long)]
    no_cache: bool,

    /// Log filter, forwarded to `tracing_subscriber::EnvFilter`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Fully-resolved configuration for one run of the proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Port to listen on.
    pub port: u16,
    /// Size limits for the response cache.
    pub cache: CacheConfig,
    /// Whether the response cache is active at all.
    pub cache_enabled: bool,
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_level: String,
}

impl ProxyConfig {
    /// Parses `std::env::args()` into a resolved configuration.
    ///
    /// An out-of-range or non-numeric port argument falls back to the
    /// default port; an unparsable cache-size argument falls back to
    /// its documented default. Both log a warning rather than aborting,
    /// matching the base proxy's fallback-over-abort rule for every
    /// numeric knob it exposes.
    pub fn from_args() -> Self {
        Self::from_parsed(Args::parse())
    }

    fn from_parsed(args: Args) -> Self {
        let port = args
            .port
            .as_deref()
            .map(resolve_port)
            .unwrap_or(DEFAULT_PORT);

        let max_cache_size = args
            .max_cache_size
            .as_deref()
            .map(|raw| resolve_u64(raw, "max-cache-size", CacheConfig::DEFAULT_MAX_TOTAL_SIZE))
            .unwrap_or(CacheConfig::DEFAULT_MAX_TOTAL_SIZE);

        let max_element_size = args
            .max_element_size
            .as_deref()
            .map(|raw| resolve_u64(raw, "max-element-size", CacheConfig::DEFAULT_MAX_ELEMENT_SIZE))
            .unwrap_or(CacheConfig::DEFAULT_MAX_ELEMENT_SIZE);

        ProxyConfig {
            port,
            cache: CacheConfig::new(max_cache_size, max_element_size),
            cache_enabled: !args.no_cache,
            log_level: args.log_level,
        }
    }
}

fn resolve_port(raw: &str) -> u16 {
    match raw.parse::<u32>() {
        Ok(p) if (1..=65535).contains(&p) => p as u16,
        _ => {
            tracing::warn!(raw, "invalid port argument, falling back to {DEFAULT_PORT}");
            DEFAULT_PORT
        }
    }
}

fn resolve_u64(raw: &str, flag: &str, default: u64) -> u64 {
    match raw.parse::<u64>() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(raw, flag, "invalid numeric argument, falling back to {default}");
            default
        }
    }
}
