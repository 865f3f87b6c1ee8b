//! API server errors.

use crate::config::ConfigError;

/// Errors that stop the server from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Binding or serving the listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
