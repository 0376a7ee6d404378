//! Tracing setup
//!
//! The subscriber is installed before configuration is loaded so that config
//! warnings are not lost. Its level filter is reloadable: once the TOML and
//! `KTV_*` settings are known, the configured level replaces the bootstrap
//! one, unless `RUST_LOG` was given.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Level used until configuration is loaded
pub const BOOTSTRAP_LEVEL: &str = "info";

/// Handle for swapping the active level filter
pub type LevelHandle = reload::Handle<EnvFilter, Registry>;

/// `RUST_LOG` when set, otherwise [`BOOTSTRAP_LEVEL`]
pub fn bootstrap_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_LEVEL))
}

/// Reloadable filter layer sitting directly on the registry
pub fn reloadable_filter(initial: EnvFilter) -> (reload::Layer<EnvFilter, Registry>, LevelHandle) {
    reload::Layer::new(initial)
}

/// Install the global subscriber; logs go to stderr
pub fn init_tracing() -> LevelHandle {
    let (filter, handle) = reloadable_filter(bootstrap_filter());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// Switch to the configured level
///
/// Returns false, leaving the filter alone, when `env_override` is set
/// (`RUST_LOG` takes precedence over configuration).
pub fn apply_configured_level(handle: &LevelHandle, level: &str, env_override: bool) -> Result<bool> {
    if env_override {
        return Ok(false);
    }
    handle.reload(EnvFilter::new(level))?;
    Ok(true)
}
