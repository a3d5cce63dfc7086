//! Wire frame codec and schema-driven payload codec for the `nodelink` bus.
//!
//! This crate owns the pure, allocation-light building blocks shared by both
//! the embedded slave runtime and the server: the `"NL"`-preamble frame
//! format (pack + one-shot decode), its CRC16-CCITT-FALSE checksum, and the
//! declarative schema store that turns a command code plus raw payload bytes
//! into named, typed field values.
//!
//! Stateful stream demarcation across a growable, possibly-fragmented buffer
//! lives in `nodelink-core`, which builds on [`frame::decode_one`] and
//! [`header::FrameHeader`].

pub mod commands;
pub mod crc;
pub mod errors;
pub mod frame;
pub mod header;
pub mod schema;

pub use crc::{crc16_ccitt, crc16_ccitt_with_init};
pub use errors::{FrameError, SchemaError};
pub use frame::{Frame, pack, pack_with_version};
pub use header::{ADDR_BROADCAST, CURRENT_VERSION, DEFAULT_MAX_LEN, FrameHeader};
pub use schema::{CommandDef, DecodedPayload, FieldDef, FieldType, FieldValue, SchemaStore};
