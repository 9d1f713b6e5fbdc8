//! Logging setup
//!
//! The library only emits `tracing` events. Binaries and tests that want them
//! printed call [`init_logging`]; hosts that already install a subscriber can
//! skip it.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already set.
pub fn init_logging() -> bool {
    init_logging_with("info")
}

/// Like [`init_logging`] with a different fallback directive, e.g.
/// `"oxide_ftp=debug"`.
pub fn init_logging_with(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
