//! Binary entry point: resolve configuration, initialize logging, and
//! run the accept loop until terminated.

use std::process::ExitCode;
use std::sync::Arc;

use cache_proxy::{acceptor, Cache, ProxyConfig};

fn main() -> ExitCode {
    let config = ProxyConfig::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .init();

    tracing::info!(
        port = config.port,
        cache_enabled = config.cache_enabled,
        max_cache_size = config.cache.max_total_size(),
        max_element_size = config.cache.max_element_size(),
        "starting proxy"
    );

    let cache = config.cache_enabled.then(|| Arc::new(Cache::new(config.cache)));

    if let Err(e) = ctrlc::set_handler(|| {
        tracing::info!("caught SIGINT, shutting down");
        std::process::exit(0);
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }

    match acceptor::run(config.port, cache) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "proxy terminated");
            ExitCode::FAILURE
        }
    }
}
