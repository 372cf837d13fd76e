//! Tracing setup for binaries and tests embedding the store.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the host. [`init`] is a convenience for hosts that have none.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the filter passed to [`init`].
pub const LOG_ENV: &str = "SNIPVAULT_LOG";

/// Install a formatting subscriber filtered by `SNIPVAULT_LOG`, falling back
/// to `default_filter` (e.g. `"snipvault=info"`).
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
