//! Tracing subscriber bootstrap for binaries and tests.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber filtered by `RUST_LOG`,
/// falling back to `default_level` when the variable is unset or invalid.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(default_level: &str, json: bool) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.is_ok()
}
