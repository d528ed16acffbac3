//! Error types for globe-vis.

use thiserror::Error;

/// Result type for globe-vis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can stop the globe application.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Globe texture could not be loaded
    #[error("Asset error: {0}")]
    Asset(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
