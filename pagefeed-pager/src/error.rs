//! Error types for the pager binary.

use pagefeed_client::{ClientError, ConfigError};

#[derive(Debug, thiserror::Error)]
pub enum PagerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("Failed to init tracing subscriber: {0}")]
    Telemetry(String),
}
