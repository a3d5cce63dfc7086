//! Top-level errors for the slave runtime binary.

use thiserror::Error;

/// Errors that can abort the slave runtime.
#[derive(Error, Debug)]
pub enum SlaveRuntimeError {
    /// The runtime configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(String),

    /// The selected transport could not be opened.
    #[error("transport error: {0}")]
    Transport(#[source] std::io::Error),

    /// The schema directory could not be loaded.
    #[error("schema store error: {0}")]
    Schema(#[from] nodelink_proto::SchemaError),
}
