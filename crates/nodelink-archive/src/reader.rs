//! Random-access PXLD v3 archive reader.
//!
//! Opening walks every frame header once to build a dense offset index;
//! after that the reader is immutable and safe to share across concurrent
//! readers (each call reopens or seeks its own file handle, so no internal
//! mutability is required).

use std::{
    fs,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use crate::{
    crc32::crc32,
    error::ArchiveError,
    header::{FileHeader, FrameHeader, SlaveEntry},
};

/// An opened, indexed PXLD v3 archive.
///
/// Construction (`open`) validates the file header and walks every frame
/// header to build [`Self::frame_offsets`]; after that, reads are O(1)
/// seek-and-parse operations with no further validation pass over the file.
pub struct PxldReader {
    path: PathBuf,
    header: FileHeader,
    frame_offsets: Vec<u64>,
}

impl PxldReader {
    /// Open `path`, validate its header, optionally verify the whole-file
    /// CRC32 (when the header's `checksum_type` is nonzero), and build the
    /// frame-offset index.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::BadMagic`], [`ArchiveError::UnsupportedVersion`],
    /// or [`ArchiveError::SizeMismatch`] if the header is invalid;
    /// [`ArchiveError::CrcMismatch`] if checksum verification fails;
    /// [`ArchiveError::IndexBoundsViolation`] if a frame header cannot be
    /// read at its expected offset; or [`ArchiveError::SizeMismatch`] if a
    /// frame's declared slave-table size does not equal
    /// `total_slaves × SLAVE_ENTRY_SIZE`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|e| ArchiveError::Io { reason: e.to_string() })?;

        if bytes.len() < FileHeader::SIZE {
            return Err(ArchiveError::IndexBoundsViolation { offset: 0 });
        }
        let header = FileHeader::parse(&bytes)?;

        if header.checksum_type() != 0 {
            let expected = header.file_crc32();
            let actual = crc32(&bytes);
            if actual != expected {
                return Err(ArchiveError::CrcMismatch { expected, actual });
            }
        }

        let frame_offsets = build_frame_offsets(&bytes, &header)?;

        tracing::info!(
            path = %path.display(),
            total_frames = header.total_frames(),
            total_slaves = header.total_slaves(),
            fps = header.fps(),
            "opened PXLD v3 archive"
        );

        Ok(Self { path, header, frame_offsets })
    }

    /// The archive's file header.
    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Number of frames in the archive.
    #[must_use]
    pub fn total_frames(&self) -> u32 {
        self.header.total_frames()
    }

    /// The source file path this reader was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the slave entries for `frame_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::FrameIdOutOfRange`] if `frame_id` is outside
    /// the archive, or [`ArchiveError::SliceOutOfRange`] if any entry's
    /// declared data range exceeds the frame's pixel region.
    pub fn slave_entries(&self, frame_id: u32) -> Result<Vec<SlaveEntry>, ArchiveError> {
        let (_frame_header, entries, _pixel_data) = self.read_frame(frame_id)?;
        Ok(entries)
    }

    /// Read the RGBW bytes for `slave_id` at `frame_id`.
    ///
    /// `slave_id == -1` returns the concatenation of every slave's bytes in
    /// ascending slave_id order (the "all slaves" mode used by a combined
    /// preview).
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::FrameIdOutOfRange`] if `frame_id` is out of
    /// range, [`ArchiveError::SlaveNotFound`] if `slave_id` is not present
    /// in the frame's slave table, or [`ArchiveError::SliceOutOfRange`] if a
    /// slave's declared data range exceeds the frame's pixel region.
    pub fn slave_rgbw(&self, frame_id: u32, slave_id: i32) -> Result<Vec<u8>, ArchiveError> {
        let (frame_header, mut entries, pixel_data) = self.read_frame(frame_id)?;

        if slave_id == -1 {
            entries.sort_by_key(SlaveEntry::slave_id);
            let mut out = Vec::new();
            for entry in &entries {
                out.extend_from_slice(slice_for(entry, &pixel_data, &frame_header)?);
            }
            return Ok(out);
        }

        let target = u8::try_from(slave_id).ok();
        let entry = entries
            .iter()
            .find(|e| target == Some(e.slave_id()))
            .ok_or(ArchiveError::SlaveNotFound { slave_id, frame_id })?;
        Ok(slice_for(entry, &pixel_data, &frame_header)?.to_vec())
    }

    fn read_frame(&self, frame_id: u32) -> Result<(FrameHeader, Vec<SlaveEntry>, Vec<u8>), ArchiveError> {
        let total_frames = self.header.total_frames();
        if frame_id >= total_frames {
            return Err(ArchiveError::FrameIdOutOfRange { frame_id, total_frames });
        }
        let offset = self.frame_offsets[frame_id as usize];

        let mut file = fs::File::open(&self.path).map_err(|e| ArchiveError::Io { reason: e.to_string() })?;
        file.seek(SeekFrom::Start(offset)).map_err(|e| ArchiveError::Io { reason: e.to_string() })?;

        let mut header_buf = [0u8; FrameHeader::SIZE];
        file.read_exact(&mut header_buf).map_err(|_| ArchiveError::IndexBoundsViolation { offset })?;
        let frame_header = FrameHeader::parse(&header_buf, offset)?;

        let table_size = frame_header.slave_table_size() as usize;
        let mut table_buf = vec![0u8; table_size];
        file.read_exact(&mut table_buf)
            .map_err(|_| ArchiveError::IndexBoundsViolation { offset: offset + FrameHeader::SIZE as u64 })?;

        let entries = parse_slave_table(&table_buf, offset + FrameHeader::SIZE as u64)?;

        let pixel_size = frame_header.pixel_data_size() as usize;
        let mut pixel_buf = vec![0u8; pixel_size];
        file.read_exact(&mut pixel_buf).map_err(|_| ArchiveError::IndexBoundsViolation {
            offset: offset + FrameHeader::SIZE as u64 + table_size as u64,
        })?;

        for entry in &entries {
            validate_bounds(entry, frame_header.pixel_data_size())?;
        }

        Ok((frame_header, entries, pixel_buf))
    }
}

fn slice_for<'a>(entry: &SlaveEntry, pixel_data: &'a [u8], frame_header: &FrameHeader) -> Result<&'a [u8], ArchiveError> {
    validate_bounds(entry, frame_header.pixel_data_size())?;
    let start = entry.data_offset() as usize;
    let end = start + entry.data_length() as usize;
    let raw = &pixel_data[start..end];
    let expected_len = usize::from(entry.pixel_count()) * 4;
    if raw.len() != expected_len {
        tracing::warn!(
            slave_id = entry.slave_id(),
            expected_len,
            actual_len = raw.len(),
            "slave rgbw data length mismatch"
        );
    }
    Ok(raw)
}

fn validate_bounds(entry: &SlaveEntry, pixel_data_size: u32) -> Result<(), ArchiveError> {
    if entry.data_offset() + entry.data_length() > pixel_data_size {
        return Err(ArchiveError::SliceOutOfRange {
            slave_id: entry.slave_id(),
            data_offset: entry.data_offset(),
            data_length: entry.data_length(),
            pixel_data_size,
        });
    }
    Ok(())
}

fn parse_slave_table(table: &[u8], base_offset: u64) -> Result<Vec<SlaveEntry>, ArchiveError> {
    let count = table.len() / SlaveEntry::SIZE;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * SlaveEntry::SIZE;
        let entry = SlaveEntry::parse(&table[start..], base_offset + start as u64)?;
        out.push(entry);
    }
    Ok(out)
}

fn build_frame_offsets(bytes: &[u8], header: &FileHeader) -> Result<Vec<u64>, ArchiveError> {
    let mut offsets = Vec::with_capacity(header.total_frames() as usize);
    let mut cur = FileHeader::SIZE as u64;
    let expected_table_size = u32::from(header.total_slaves()) * u32::from(crate::header::SLAVE_ENTRY_SIZE);

    for _ in 0..header.total_frames() {
        offsets.push(cur);

        let idx = cur as usize;
        if idx + FrameHeader::SIZE > bytes.len() {
            return Err(ArchiveError::IndexBoundsViolation { offset: cur });
        }
        let frame_header = FrameHeader::parse(&bytes[idx..], cur)?;

        if frame_header.slave_table_size() != expected_table_size {
            return Err(ArchiveError::SizeMismatch {
                field: "slave_table_size",
                expected: expected_table_size,
                actual: frame_header.slave_table_size(),
            });
        }

        cur += FrameHeader::SIZE as u64 + u64::from(frame_header.slave_table_size()) + u64::from(frame_header.pixel_data_size());
    }

    Ok(offsets)
}
