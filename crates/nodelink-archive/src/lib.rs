//! PXLD v3 binary archive reader.
//!
//! Opens a fixed-header, frame-indexed pixel archive and provides O(1)
//! random access to any frame's per-slave RGBW bytes. The reader is a value
//! type after [`reader::PxldReader::open`]: its offset index never mutates,
//! so sharing a reader across concurrent playback sessions needs no
//! synchronization beyond whatever the underlying file handle requires.

pub mod crc32;
pub mod error;
pub mod header;
pub mod reader;

pub use crc32::crc32 as crc32_checksum;
pub use error::ArchiveError;
pub use header::{FRAME_HEADER_SIZE, FileHeader, MAGIC, MAJOR_VERSION, SLAVE_ENTRY_SIZE, SlaveEntry};
pub use reader::PxldReader;
