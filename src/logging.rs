//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

/// Builds the filter applied to log output.
///
/// An explicit `filter` wins, then `RUST_LOG`, then `info`. Unparseable
/// directives fall back to the default.
#[must_use]
pub fn env_filter(filter: Option<&str>) -> EnvFilter {
    filter
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs a global fmt subscriber.
///
/// Returns `false` when a global subscriber was already set; the existing
/// one is kept.
#[must_use]
pub fn init_tracing(filter: Option<&str>) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter(filter))
        .with(fmt::layer().with_target(true).with_level(true))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("tracing subscriber installed");
    }
    installed
}
