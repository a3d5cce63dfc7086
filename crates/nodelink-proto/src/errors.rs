//! Error types for frame packing/parsing and schema handling.

use thiserror::Error;

/// Errors raised while packing or decoding a single wire frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Preamble bytes did not match `"NL"`.
    #[error("bad preamble")]
    BadPreamble,

    /// Version byte did not match the frame's declared version.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version the frame was built with.
        expected: u8,
        /// Version found in the buffer.
        actual: u8,
    },

    /// Declared payload length exceeds the configured maximum.
    #[error("payload length {length} exceeds max {max}")]
    LengthTooLarge {
        /// Declared payload length.
        length: usize,
        /// Configured maximum payload length.
        max: usize,
    },

    /// CRC16 trailer did not match the computed checksum.
    #[error("crc mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcFail {
        /// CRC computed over the header tail and payload.
        expected: u16,
        /// CRC found in the buffer's trailer.
        actual: u16,
    },

    /// Buffer was too short to contain a full frame header.
    #[error("buffer too short for frame header")]
    BufferTooShort,
}

/// Errors raised while loading schema documents or encoding/decoding payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No command definition registered for this code.
    #[error("unknown command code {0:#06x}")]
    UnknownCommand(u16),

    /// Payload ran out of bytes before all fields were decoded.
    #[error("payload underflow decoding field `{field}` of command {cmd:#06x}")]
    Underflow {
        /// Command code being decoded.
        cmd: u16,
        /// Name of the field being read when the buffer ran out.
        field: String,
    },

    /// A `bytes_fixed` field was not exactly its declared length.
    #[error("bytes_fixed field `{field}` expected {expected} bytes, got {actual}")]
    FixedLengthMismatch {
        /// Name of the offending field.
        field: String,
        /// Declared fixed length.
        expected: usize,
        /// Actual length supplied for encoding.
        actual: usize,
    },

    /// A `str_u16len` field was not valid UTF-8.
    #[error("invalid utf-8 in field `{field}` of command {cmd:#06x}")]
    InvalidUtf8 {
        /// Command code being decoded.
        cmd: u16,
        /// Name of the offending field.
        field: String,
    },

    /// Schema document declared a field type outside the closed set.
    #[error("unknown field type `{0}` in schema document")]
    UnknownFieldType(String),

    /// Schema document could not be read from disk.
    #[error("failed to read schema document {path}: {reason}")]
    DocumentIo {
        /// Path of the offending document.
        path: String,
        /// Underlying I/O failure, formatted.
        reason: String,
    },

    /// Schema document was not valid JSON or did not match the expected shape.
    #[error("failed to parse schema document {path}: {reason}")]
    DocumentParse {
        /// Path of the offending document.
        path: String,
        /// Underlying parse failure, formatted.
        reason: String,
    },
}
