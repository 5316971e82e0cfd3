//! Tracing subscriber setup for the `pagefeed` binary.
//!
//! Library code only emits events; installing a subscriber is the binary's
//! job.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::PagerError;

/// Filter used when `RUST_LOG` is not set. Covers every `pagefeed*` target.
pub const DEFAULT_FILTER: &str = "pagefeed=info";

/// Install a fmt subscriber writing to stderr.
///
/// `RUST_LOG` wins over `default_filter`. Stdout is left to page output.
pub fn init_tracing(default_filter: &str) -> Result<(), PagerError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| PagerError::Telemetry(e.to_string()))?;

    tracing::debug!(default_filter, "Tracing initialized");
    Ok(())
}
