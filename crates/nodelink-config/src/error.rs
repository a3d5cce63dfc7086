//! Errors raised while loading or saving configuration documents.

use thiserror::Error;

/// Errors from the configuration document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document existed but could not be read from disk.
    #[error("failed to read document {name}: {reason}")]
    ReadFail {
        /// Document name (filename under the content directory).
        name: String,
        /// Underlying I/O failure, formatted.
        reason: String,
    },

    /// The document's bytes were not valid JSON, or did not match the
    /// shape the caller deserialized into.
    #[error("failed to parse document {name}: {reason}")]
    ParseFail {
        /// Document name.
        name: String,
        /// Underlying parse failure, formatted.
        reason: String,
    },

    /// The document could not be serialized or written atomically.
    #[error("failed to write document {name}: {reason}")]
    WriteFail {
        /// Document name.
        name: String,
        /// Underlying I/O or serialization failure, formatted.
        reason: String,
    },
}
