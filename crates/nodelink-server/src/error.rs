//! Top-level errors for the server runtime binary.

use thiserror::Error;

/// Errors that can abort the server runtime.
#[derive(Error, Debug)]
pub enum ServerRuntimeError {
    /// The runtime configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(String),

    /// The client-facing listener could not be bound.
    #[error("listener error: {0}")]
    Listener(#[source] std::io::Error),

    /// The configuration document store could not be opened.
    #[error("config store error: {0}")]
    ConfigStore(#[from] nodelink_config::ConfigError),
}
