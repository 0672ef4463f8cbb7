//! Opt-in tracing subscriber for applications embedding the provider layer.
//!
//! The library itself only emits `tracing` events; installing a subscriber is the
//! application's call. [`init`] is a convenience for binaries and test harnesses.

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `AI_LIB_LOG`, then `RUST_LOG`, then `info`.
///
/// Safe to call more than once; later calls are no-ops when a global subscriber exists.
pub fn init() {
    let filter = std::env::var("AI_LIB_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
