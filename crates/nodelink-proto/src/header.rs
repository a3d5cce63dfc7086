//! Fixed 9-byte frame header with zero-copy parsing.
//!
//! `"NL" | version | address_u16_le | command_u16_le | payload_len_u16_le`.
//! All multi-byte fields are little-endian, matching the wire format in
//! use by the rest of the bus (unlike a big-endian network header, this
//! protocol's byte order was fixed by its original embedded implementation
//! and is preserved here).

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::FrameError;

/// Preamble bytes identifying the start of a frame: ASCII `"NL"`.
pub const PREAMBLE: [u8; 2] = [0x4E, 0x4C];

/// Current protocol version.
pub const CURRENT_VERSION: u8 = 3;

/// Address reserved for broadcast frames.
pub const ADDR_BROADCAST: u16 = 0xFFFF;

/// Default maximum accepted payload length.
pub const DEFAULT_MAX_LEN: usize = 4096;

/// Fixed 9-byte frame header (little-endian wire order).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    preamble: [u8; 2],
    version: u8,
    address: [u8; 2],
    command: [u8; 2],
    payload_len: [u8; 2],
}

impl FrameHeader {
    /// Size of the serialized header in bytes.
    pub const SIZE: usize = 9;

    /// Build a header for the given fields.
    #[must_use]
    pub fn new(version: u8, address: u16, command: u16, payload_len: u16) -> Self {
        Self {
            preamble: PREAMBLE,
            version,
            address: address.to_le_bytes(),
            command: command.to_le_bytes(),
            payload_len: payload_len.to_le_bytes(),
        }
    }

    /// Parse a header from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::BufferTooShort`] if fewer than [`Self::SIZE`]
    /// bytes are available, [`FrameError::BadPreamble`] if the preamble
    /// does not match, or [`FrameError::VersionMismatch`] if the version
    /// byte is not [`CURRENT_VERSION`].
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let header = Self::ref_from_prefix(bytes).map_err(|_| FrameError::BufferTooShort)?.0;
        if header.preamble != PREAMBLE {
            return Err(FrameError::BadPreamble);
        }
        if header.version != CURRENT_VERSION {
            return Err(FrameError::VersionMismatch {
                expected: CURRENT_VERSION,
                actual: header.version,
            });
        }
        Ok(*header)
    }

    /// Serialize the header to a fixed-size byte array.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(&self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Protocol version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Destination address (self, peer, or [`ADDR_BROADCAST`]).
    #[must_use]
    pub fn address(&self) -> u16 {
        u16::from_le_bytes(self.address)
    }

    /// Command code.
    #[must_use]
    pub fn command(&self) -> u16 {
        u16::from_le_bytes(self.command)
    }

    /// Declared payload length in bytes.
    #[must_use]
    pub fn payload_len(&self) -> u16 {
        u16::from_le_bytes(self.payload_len)
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("version", &self.version())
            .field("address", &format!("{:#06x}", self.address()))
            .field("command", &format!("{:#06x}", self.command()))
            .field("payload_len", &self.payload_len())
            .finish()
    }
}

impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_nine() {
        assert_eq!(std::mem::size_of::<FrameHeader>(), FrameHeader::SIZE);
    }

    #[test]
    fn round_trip() {
        let header = FrameHeader::new(CURRENT_VERSION, 0x0002, 0x0101, 7);
        let bytes = header.to_bytes();
        let parsed = FrameHeader::parse(&bytes).expect("valid header");
        assert_eq!(parsed, header);
        assert_eq!(parsed.address(), 0x0002);
        assert_eq!(parsed.command(), 0x0101);
        assert_eq!(parsed.payload_len(), 7);
    }

    #[test]
    fn rejects_bad_preamble() {
        let mut bytes = FrameHeader::new(CURRENT_VERSION, 0, 0, 0).to_bytes();
        bytes[0] = 0x00;
        assert_eq!(FrameHeader::parse(&bytes), Err(FrameError::BadPreamble));
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(FrameHeader::parse(&[0x4E, 0x4C, 3]), Err(FrameError::BufferTooShort));
    }
}
