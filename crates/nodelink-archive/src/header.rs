//! Fixed-layout PXLD v3 structures: file header, frame header, slave entry.
//!
//! All multi-byte fields are little-endian. Layout mirrors the archive's
//! original struct-unpack format exactly (including the reserved tail bytes
//! of each record), so these types can be cast directly over file bytes with
//! [`zerocopy`], the same way `nodelink_proto::header::FrameHeader` casts
//! over wire bytes.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::ArchiveError;

/// Magic bytes identifying a PXLD archive: ASCII `"PXLD"`.
pub const MAGIC: [u8; 4] = *b"PXLD";

/// Supported major version.
pub const MAJOR_VERSION: u8 = 3;

/// Required size of each frame header record.
pub const FRAME_HEADER_SIZE: u16 = 32;

/// Required size of each slave entry record.
pub const SLAVE_ENTRY_SIZE: u16 = 24;

/// Fixed 64-byte archive file header.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FileHeader {
    magic: [u8; 4],
    major: u8,
    minor: u8,
    fps: u8,
    total_slaves: [u8; 2],
    total_frames: [u8; 4],
    total_pixels: [u8; 4],
    frame_header_size: [u8; 2],
    slave_entry_size: [u8; 2],
    udp_port: [u8; 2],
    file_crc32: [u8; 4],
    checksum_type: u8,
    reserved: [u8; 36],
}

impl FileHeader {
    /// Size of the serialized header in bytes.
    pub const SIZE: usize = 64;

    /// Parse and validate a file header from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::BadMagic`] if the magic bytes do not read
    /// `"PXLD"`, [`ArchiveError::UnsupportedVersion`] if the major version
    /// is not [`MAJOR_VERSION`], or [`ArchiveError::SizeMismatch`] if the
    /// declared frame-header or slave-entry size is wrong for v3.
    pub fn parse(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let header =
            *Self::ref_from_prefix(bytes).map_err(|_| ArchiveError::IndexBoundsViolation { offset: 0 })?.0;
        if header.magic != MAGIC {
            return Err(ArchiveError::BadMagic);
        }
        if header.major != MAJOR_VERSION {
            return Err(ArchiveError::UnsupportedVersion { major: header.major, minor: header.minor });
        }
        if header.frame_header_size() != FRAME_HEADER_SIZE {
            return Err(ArchiveError::SizeMismatch {
                field: "frame_header_size",
                expected: u32::from(FRAME_HEADER_SIZE),
                actual: u32::from(header.frame_header_size()),
            });
        }
        if header.slave_entry_size() != SLAVE_ENTRY_SIZE {
            return Err(ArchiveError::SizeMismatch {
                field: "slave_entry_size",
                expected: u32::from(SLAVE_ENTRY_SIZE),
                actual: u32::from(header.slave_entry_size()),
            });
        }
        Ok(header)
    }

    /// Frames per second the archive was authored for.
    #[must_use]
    pub fn fps(&self) -> u8 {
        self.fps
    }

    /// Number of distinct slaves referenced across the archive.
    #[must_use]
    pub fn total_slaves(&self) -> u16 {
        u16::from_le_bytes(self.total_slaves)
    }

    /// Number of frames in the archive.
    #[must_use]
    pub fn total_frames(&self) -> u32 {
        u32::from_le_bytes(self.total_frames)
    }

    /// Total pixel count across all slaves, as declared by the author.
    #[must_use]
    pub fn total_pixels(&self) -> u32 {
        u32::from_le_bytes(self.total_pixels)
    }

    /// Declared frame-header record size; must equal [`FRAME_HEADER_SIZE`].
    #[must_use]
    pub fn frame_header_size(&self) -> u16 {
        u16::from_le_bytes(self.frame_header_size)
    }

    /// Declared slave-entry record size; must equal [`SLAVE_ENTRY_SIZE`].
    #[must_use]
    pub fn slave_entry_size(&self) -> u16 {
        u16::from_le_bytes(self.slave_entry_size)
    }

    /// UDP port the archive was originally streamed over (advisory).
    #[must_use]
    pub fn udp_port(&self) -> u16 {
        u16::from_le_bytes(self.udp_port)
    }

    /// Declared whole-file CRC32.
    #[must_use]
    pub fn file_crc32(&self) -> u32 {
        u32::from_le_bytes(self.file_crc32)
    }

    /// Checksum mode; `0` disables CRC32 verification.
    #[must_use]
    pub fn checksum_type(&self) -> u8 {
        self.checksum_type
    }
}

/// Fixed 32-byte per-frame header record.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    frame_id: [u8; 4],
    reserved0: [u8; 4],
    slave_table_size: [u8; 4],
    pixel_data_size: [u8; 4],
    reserved1: [u8; 16],
}

impl FrameHeader {
    /// Size of the serialized frame header in bytes.
    pub const SIZE: usize = 32;

    /// Parse a frame header from the front of `bytes`.
    pub(crate) fn parse(bytes: &[u8], offset: u64) -> Result<Self, ArchiveError> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _)| *header)
            .map_err(|_| ArchiveError::IndexBoundsViolation { offset })
    }

    /// Frame id as stored in the archive (should equal the frame's index).
    #[must_use]
    pub fn frame_id(&self) -> u32 {
        u32::from_le_bytes(self.frame_id)
    }

    /// Byte length of the slave-entry table following this header.
    #[must_use]
    pub fn slave_table_size(&self) -> u32 {
        u32::from_le_bytes(self.slave_table_size)
    }

    /// Byte length of the packed pixel payload following the slave table.
    #[must_use]
    pub fn pixel_data_size(&self) -> u32 {
        u32::from_le_bytes(self.pixel_data_size)
    }
}

/// Fixed 24-byte per-slave entry within a frame's slave table.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SlaveEntry {
    slave_id: u8,
    flags: u8,
    channel_start: [u8; 2],
    channel_count: [u8; 2],
    pixel_count: [u8; 2],
    data_offset: [u8; 4],
    data_length: [u8; 4],
    reserved: [u8; 8],
}

impl SlaveEntry {
    /// Size of the serialized slave entry in bytes.
    pub const SIZE: usize = 24;

    /// Parse a slave entry from the front of `bytes`.
    pub(crate) fn parse(bytes: &[u8], offset: u64) -> Result<Self, ArchiveError> {
        Self::ref_from_prefix(bytes)
            .map(|(entry, _)| *entry)
            .map_err(|_| ArchiveError::IndexBoundsViolation { offset })
    }

    /// Identifier of the slave this entry describes.
    #[must_use]
    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    /// Per-slave flag bits (opaque to this reader).
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// First channel index this slave owns on its bus.
    #[must_use]
    pub fn channel_start(&self) -> u16 {
        u16::from_le_bytes(self.channel_start)
    }

    /// Number of channels this slave owns.
    #[must_use]
    pub fn channel_count(&self) -> u16 {
        u16::from_le_bytes(self.channel_count)
    }

    /// Number of pixels this slave drives (expected data length is `× 4`).
    #[must_use]
    pub fn pixel_count(&self) -> u16 {
        u16::from_le_bytes(self.pixel_count)
    }

    /// Byte offset of this slave's data within the frame's pixel region.
    #[must_use]
    pub fn data_offset(&self) -> u32 {
        u32::from_le_bytes(self.data_offset)
    }

    /// Byte length of this slave's data within the frame's pixel region.
    #[must_use]
    pub fn data_length(&self) -> u32 {
        u32::from_le_bytes(self.data_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_header_size_is_64() {
        assert_eq!(std::mem::size_of::<FileHeader>(), FileHeader::SIZE);
    }

    #[test]
    fn frame_header_size_is_32() {
        assert_eq!(std::mem::size_of::<FrameHeader>(), FrameHeader::SIZE);
    }

    #[test]
    fn slave_entry_size_is_24() {
        assert_eq!(std::mem::size_of::<SlaveEntry>(), SlaveEntry::SIZE);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = [0u8; FileHeader::SIZE];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert_eq!(FileHeader::parse(&bytes), Err(ArchiveError::BadMagic));
    }

    #[test]
    fn rejects_unsupported_major_version() {
        let mut bytes = [0u8; FileHeader::SIZE];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4] = 2;
        assert_eq!(FileHeader::parse(&bytes), Err(ArchiveError::UnsupportedVersion { major: 2, minor: 0 }));
    }
}
