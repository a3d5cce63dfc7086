//! Error types for file transfer and dispatch.

use thiserror::Error;

/// Errors from the file receiver state machine.
///
/// All of these are recorded in [`crate::file_receiver::FileSession::last_error`]
/// rather than unwinding the caller; the receiver always returns to `Idle`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileTransferError {
    /// CHUNK or END received while no transfer is active.
    #[error("no active file transfer session")]
    NoActiveSession,

    /// CHUNK or END's `file_id` did not match the active session.
    #[error("file_id mismatch: active session is {active}, message was for {received}")]
    FileIdMismatch {
        /// `file_id` of the currently active session.
        active: u32,
        /// `file_id` carried by the rejected message.
        received: u32,
    },

    /// CHUNK write would extend past the declared total size.
    #[error("write of {len} bytes at offset {offset} exceeds total size {total}")]
    OutOfRange {
        /// Offset the chunk was to be written at.
        offset: u32,
        /// Length of the chunk's data.
        len: u32,
        /// Declared total file size.
        total: u32,
    },

    /// Destination file could not be opened or preallocated.
    #[error("failed to open destination file {path}: {reason}")]
    OpenFail {
        /// Destination path.
        path: String,
        /// Underlying I/O failure, formatted.
        reason: String,
    },

    /// A write to the destination file failed.
    #[error("write failed: {reason}")]
    WriteFail {
        /// Underlying I/O failure, formatted.
        reason: String,
    },

    /// END's computed digest did not match the expected digest from BEGIN.
    #[error("sha256 mismatch: expected {expected}, got {actual}")]
    ShaMismatch {
        /// Hex-encoded expected digest.
        expected: String,
        /// Hex-encoded computed digest.
        actual: String,
    },
}

/// Errors surfaced by the dispatcher when routing a decoded frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No schema definition registered for this command code.
    #[error("no schema definition for command {0:#06x}")]
    UnknownCommand(u16),

    /// Schema definition existed but no handler was registered for it.
    #[error("no handler registered for command {0:#06x} ({1})")]
    NoHandler(u16, String),

    /// Payload failed to decode against its schema.
    #[error("payload decode failed: {0}")]
    Schema(#[from] nodelink_proto::SchemaError),
}
