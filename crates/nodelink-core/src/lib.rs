//! Slave-side stream parsing, file transfer, dispatch, and orchestration.
//!
//! This crate turns raw, possibly-fragmented bytes from a TCP, UDP, or
//! serial transport into decoded commands and file-transfer progress,
//! without performing any I/O of its own beyond the file receiver's
//! filesystem writes. [`driver::SlaveDriver`] is the single entry point most
//! callers want; [`stream_parser`], [`file_receiver`], and [`dispatcher`] are
//! exposed individually for callers assembling a custom pipeline.

pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod file_receiver;
pub mod stream_parser;

pub use dispatcher::{Dispatcher, Handler};
pub use driver::{FileStage, SlaveAction, SlaveDriver, decode_standalone_frame};
pub use error::{DispatchError, FileTransferError};
pub use file_receiver::{BeginRequest, ChunkRequest, FileReceiver};
pub use stream_parser::{DecodedFrame, StreamParser};
