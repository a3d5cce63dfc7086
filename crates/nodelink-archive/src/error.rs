//! Errors raised while opening or reading a PXLD v3 archive.

use thiserror::Error;

/// Errors from opening, indexing, or random-accessing a PXLD v3 archive.
///
/// All of these are fatal for the operation that raised them; the reader
/// itself is never left in a half-constructed state (`open` either succeeds
/// completely or returns an error without producing a reader).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// File header's magic bytes did not read `"PXLD"`.
    #[error("bad magic bytes in archive header")]
    BadMagic,

    /// File header's major version was not 3.
    #[error("unsupported archive version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version found.
        major: u8,
        /// Minor version found.
        minor: u8,
    },

    /// A declared fixed size did not match its required value.
    #[error("{field} is {actual}, expected {expected}")]
    SizeMismatch {
        /// Name of the offending field.
        field: &'static str,
        /// Required value.
        expected: u32,
        /// Value found in the file.
        actual: u32,
    },

    /// A frame header or slave table could not be read at its indexed offset.
    #[error("frame index bounds violation at byte offset {offset}")]
    IndexBoundsViolation {
        /// Offset the reader attempted to read from.
        offset: u64,
    },

    /// A slave entry's `data_offset + data_length` exceeded `pixel_data_size`.
    #[error("slave {slave_id} data slice out of range: offset={data_offset}, len={data_length}, pixel_data_size={pixel_data_size}")]
    SliceOutOfRange {
        /// Offending slave's id.
        slave_id: u8,
        /// Declared data offset within the frame's pixel region.
        data_offset: u32,
        /// Declared data length.
        data_length: u32,
        /// Size of the frame's pixel region.
        pixel_data_size: u32,
    },

    /// A requested frame id was outside `[0, total_frames)`.
    #[error("frame id {frame_id} out of range (total_frames={total_frames})")]
    FrameIdOutOfRange {
        /// Requested frame id.
        frame_id: u32,
        /// Total frames in the archive.
        total_frames: u32,
    },

    /// A requested slave id was not present in a frame's slave table.
    #[error("slave id {slave_id} not found in frame {frame_id}")]
    SlaveNotFound {
        /// Requested slave id.
        slave_id: i32,
        /// Frame that was searched.
        frame_id: u32,
    },

    /// The whole-file CRC32 did not match the header's declared value.
    #[error("crc32 mismatch: header declares {expected:#010x}, computed {actual:#010x}")]
    CrcMismatch {
        /// Value declared in the file header.
        expected: u32,
        /// Value computed over the file.
        actual: u32,
    },

    /// An I/O failure occurred while reading the archive file.
    #[error("archive I/O error: {reason}")]
    Io {
        /// Underlying I/O failure, formatted.
        reason: String,
    },
}
