//! Whole-frame packing and one-shot decoding.
//!
//! The streaming demarcator (in `nodelink-core`) is responsible for
//! resynchronization across a growable buffer; this module only knows how
//! to pack a complete frame and decode one frame from the front of an
//! already-delimited buffer.

use crate::{
    errors::FrameError,
    header::{CURRENT_VERSION, FrameHeader},
};

/// CRC trailer size in bytes.
pub const CRC_LEN: usize = 2;

/// A decoded wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Protocol version the frame was built with.
    pub version: u8,
    /// Destination address (self, peer, or broadcast).
    pub address: u16,
    /// Command code.
    pub command: u16,
    /// Decoded payload bytes.
    pub payload: Vec<u8>,
}

/// Pack a frame: `command`, `payload`, destination `address`, and protocol
/// `version` (defaults to [`CURRENT_VERSION`] via [`pack`]).
///
/// Output length is exactly `FrameHeader::SIZE + payload.len() + CRC_LEN`.
#[must_use]
pub fn pack_with_version(command: u16, payload: &[u8], address: u16, version: u8) -> Vec<u8> {
    let header = FrameHeader::new(version, address, command, payload.len() as u16);
    let mut out = Vec::with_capacity(FrameHeader::SIZE + payload.len() + CRC_LEN);
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    let crc = crate::crc::crc16_ccitt(&out[2..]);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

/// Pack a frame using the current protocol version.
#[must_use]
pub fn pack(command: u16, payload: &[u8], address: u16) -> Vec<u8> {
    pack_with_version(command, payload, address, CURRENT_VERSION)
}

/// Decode one frame from the front of `bytes`, assuming the buffer starts
/// exactly at the preamble and contains at least one complete frame.
///
/// Returns the decoded [`Frame`] and the number of bytes consumed. This is a
/// building block for the streaming parser, not a substitute for it: callers
/// that receive arbitrary byte slices (with leading noise, fragmentation, or
/// corruption) should use `nodelink_core::StreamParser` instead.
///
/// # Errors
///
/// Returns [`FrameError::BufferTooShort`] if the buffer does not yet contain
/// a full frame, [`FrameError::BadPreamble`]/[`FrameError::VersionMismatch`]
/// if the header is malformed, [`FrameError::LengthTooLarge`] if the
/// declared payload exceeds `max_len`, or [`FrameError::CrcFail`] if the
/// trailer does not match.
pub fn decode_one(bytes: &[u8], max_len: usize) -> Result<(Frame, usize), FrameError> {
    let header = FrameHeader::parse(bytes)?;
    let len = header.payload_len() as usize;
    if len > max_len {
        return Err(FrameError::LengthTooLarge { length: len, max: max_len });
    }
    let frame_len = FrameHeader::SIZE + len + CRC_LEN;
    if bytes.len() < frame_len {
        return Err(FrameError::BufferTooShort);
    }
    let payload = bytes[FrameHeader::SIZE..FrameHeader::SIZE + len].to_vec();
    let crc_actual = u16::from_le_bytes([bytes[FrameHeader::SIZE + len], bytes[FrameHeader::SIZE + len + 1]]);
    let crc_expected = crate::crc::crc16_ccitt(&bytes[2..FrameHeader::SIZE + len]);
    if crc_actual != crc_expected {
        return Err(FrameError::CrcFail { expected: crc_expected, actual: crc_actual });
    }
    Ok((
        Frame { version: header.version(), address: header.address(), command: header.command(), payload },
        frame_len,
    ))
}
