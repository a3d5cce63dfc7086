//! Sans-IO slave orchestrator.
//!
//! Wires the stream parser, a [`Dispatcher`] registered with a handler per
//! standard command, and the file receiver into a single action-returning
//! driver: the caller feeds raw bytes in and pulls `SlaveAction`s out, then
//! performs the actual transport I/O itself. No part of this module touches
//! a socket or serial port directly (the file receiver does open/seek/write,
//! but that is the one I/O seam this layer is granted).

use nodelink_proto::{DecodedPayload, FieldValue, Frame, FrameError, SchemaError, SchemaStore, commands, frame::decode_one};

use crate::{
    dispatcher::Dispatcher,
    error::{DispatchError, FileTransferError},
    file_receiver::{BeginRequest, ChunkRequest, FileReceiver},
    stream_parser::StreamParser,
};

/// Outcome of feeding one round of bytes to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlaveAction {
    /// Send a reply frame back over the same transport the bytes arrived on.
    SendFrame {
        /// Command code of the reply.
        command: u16,
        /// Destination address to stamp on the reply (mirrors the sender).
        address: u16,
        /// Encoded payload bytes.
        payload: Vec<u8>,
    },

    /// A frame was decoded but its command has no registered schema.
    UnknownCommand {
        /// The unrecognized command code.
        command: u16,
    },

    /// A frame's payload failed schema decoding.
    SchemaRejected {
        /// Command code whose payload was rejected.
        command: u16,
        /// Underlying schema error.
        error: SchemaError,
    },

    /// A file-transfer message was handled; carries the outcome for
    /// observability (the receiver itself already performed the I/O).
    FileTransfer {
        /// Which stage produced this outcome.
        stage: FileStage,
        /// `Ok(())` on success, or the file-transfer error.
        result: Result<(), FileTransferError>,
    },

    /// `FS_TREE_GET` was decoded; the caller must walk the filesystem and
    /// reply with `FS_TREE_RSP`. Left to the caller because directory
    /// traversal is I/O the driver does not otherwise perform.
    FsTreeRequest {
        /// Destination address to stamp on the `FS_TREE_RSP` reply.
        address: u16,
        /// Root path to walk.
        path: std::path::PathBuf,
        /// Maximum recursion depth.
        max_depth: u16,
        /// Whether to include file sizes in the rendered tree.
        include_size: bool,
    },

    /// `FS_SNAP_GET` was decoded; the caller must walk the filesystem and
    /// write the rendered tree to `out_path`.
    FsSnapRequest {
        /// Root path to walk.
        path: std::path::PathBuf,
        /// Destination file for the rendered tree.
        out_path: std::path::PathBuf,
        /// Maximum recursion depth.
        max_depth: u16,
        /// Whether to include file sizes in the rendered tree.
        include_size: bool,
    },
}

/// Which file-transfer message a [`SlaveAction::FileTransfer`] corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    /// `FILE_BEGIN`.
    Begin,
    /// `FILE_CHUNK`.
    Chunk,
    /// `FILE_END`.
    End,
}

/// Orchestrates a single slave's byte stream into decoded commands and
/// file-transfer state transitions, without performing any transport I/O
/// itself.
///
/// The caller owns a transport loop: read bytes, call [`Self::feed`], send
/// whatever [`SlaveAction::SendFrame`]s come back, repeat.
pub struct SlaveDriver {
    parser: StreamParser,
    dispatcher: Dispatcher<DriverState>,
    state: DriverState,
}

/// Mutable context a dispatched handler operates on: the file receiver it
/// may advance, the current frame's destination address (for replies that
/// have no `dst_addr` field of their own, e.g. PING/ECHO), and the actions
/// accumulated while handling the current frame.
struct DriverState {
    file_receiver: FileReceiver,
    current_address: u16,
    actions: Vec<SlaveAction>,
}

impl SlaveDriver {
    /// Build a driver bound to `self_addr`, using `schema_store` to decode
    /// payloads and accepting frames addressed to `self_addr` or broadcast.
    /// `max_len` bounds the payload length the stream parser will accept
    /// before treating a frame header as corrupt.
    #[must_use]
    pub fn new(self_addr: u16, schema_store: SchemaStore, max_len: usize) -> Self {
        Self {
            parser: StreamParser::new(max_len, Some(self_addr)),
            dispatcher: build_dispatcher(schema_store),
            state: DriverState { file_receiver: FileReceiver::new(self_addr), current_address: self_addr, actions: Vec::new() },
        }
    }

    /// Append freshly-received bytes to the internal buffer and process
    /// every frame that can currently be decoded, returning the resulting
    /// actions in arrival order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SlaveAction> {
        self.parser.feed(bytes);
        let mut actions = Vec::new();
        while let Some(decoded) = self.parser.pop_one() {
            actions.extend(self.handle_frame(decoded.command, decoded.address, &decoded.payload));
        }
        actions
    }

    /// Number of bytes the stream parser has discarded while resynchronizing.
    #[must_use]
    pub fn dropped_bytes(&self) -> u64 {
        self.parser.drop_bytes()
    }

    /// Whether a file transfer is currently in progress.
    #[must_use]
    pub fn file_transfer_active(&self) -> bool {
        self.state.file_receiver.is_active()
    }

    fn handle_frame(&mut self, command: u16, address: u16, payload: &[u8]) -> Vec<SlaveAction> {
        self.state.current_address = address;
        self.state.actions.clear();

        match self.dispatcher.dispatch(command, payload, &mut self.state) {
            Ok(()) => {},
            Err(DispatchError::UnknownCommand(command)) => {
                tracing::debug!(command = format!("{command:#06x}"), "driver: unknown command");
                self.state.actions.push(SlaveAction::UnknownCommand { command });
            },
            Err(DispatchError::Schema(error)) => {
                tracing::debug!(command = format!("{command:#06x}"), %error, "driver: schema rejected payload");
                self.state.actions.push(SlaveAction::SchemaRejected { command, error });
            },
            Err(DispatchError::NoHandler(command, name)) => {
                tracing::debug!(command = format!("{command:#06x}"), %name, "driver: decoded command has no handler");
            },
        }

        std::mem::take(&mut self.state.actions)
    }
}

/// Build the dispatcher routing every standard command to its handler.
/// Deployment-specific commands loaded into `schema_store` decode
/// successfully but fall through to [`DispatchError::NoHandler`], silently
/// producing no action, since only the standard set has defined behavior.
fn build_dispatcher(schema_store: SchemaStore) -> Dispatcher<DriverState> {
    let mut dispatcher = Dispatcher::new(schema_store);

    dispatcher.on(
        commands::PING,
        Box::new(|ctx: &mut DriverState, _decoded| {
            ctx.actions.push(SlaveAction::SendFrame { command: commands::PONG, address: ctx.current_address, payload: Vec::new() });
        }),
    );

    dispatcher.on(
        commands::ECHO,
        Box::new(|ctx: &mut DriverState, decoded| {
            let data = decoded.get("data").and_then(FieldValue::as_bytes).map(<[u8]>::to_vec).unwrap_or_default();
            ctx.actions.push(SlaveAction::SendFrame { command: commands::ECHO, address: ctx.current_address, payload: data });
        }),
    );

    dispatcher.on(
        commands::FILE_BEGIN,
        Box::new(|ctx: &mut DriverState, decoded| {
            let dst_addr = field_u16(decoded, "dst_addr");
            let req = BeginRequest {
                file_id: field_u32(decoded, "file_id"),
                total_size: field_u32(decoded, "total_size"),
                chunk_size: field_u16(decoded, "chunk_size"),
                sha256: field_sha256(decoded, "sha256"),
                path: field_path(decoded, "path"),
            };
            let result = ctx.file_receiver.begin(dst_addr, req);
            ctx.actions.push(SlaveAction::FileTransfer { stage: FileStage::Begin, result });
        }),
    );

    dispatcher.on(
        commands::FILE_CHUNK,
        Box::new(|ctx: &mut DriverState, decoded| {
            let dst_addr = field_u16(decoded, "dst_addr");
            let req = ChunkRequest {
                file_id: field_u32(decoded, "file_id"),
                offset: field_u32(decoded, "offset"),
                data: decoded.get("data").and_then(FieldValue::as_bytes).map(<[u8]>::to_vec).unwrap_or_default(),
            };
            let result = ctx.file_receiver.chunk(dst_addr, req);
            ctx.actions.push(SlaveAction::FileTransfer { stage: FileStage::Chunk, result });
        }),
    );

    dispatcher.on(
        commands::FILE_END,
        Box::new(|ctx: &mut DriverState, decoded| {
            let dst_addr = field_u16(decoded, "dst_addr");
            let file_id = field_u32(decoded, "file_id");
            let result = ctx.file_receiver.end(dst_addr, file_id);
            ctx.actions.push(SlaveAction::FileTransfer { stage: FileStage::End, result });
        }),
    );

    dispatcher.on(
        commands::FS_TREE_GET,
        Box::new(|ctx: &mut DriverState, decoded| {
            ctx.actions.push(SlaveAction::FsTreeRequest {
                address: ctx.current_address,
                path: field_path(decoded, "path"),
                max_depth: field_u16(decoded, "max_depth"),
                include_size: field_u16(decoded, "include_size") != 0,
            });
        }),
    );

    dispatcher.on(
        commands::FS_SNAP_GET,
        Box::new(|ctx: &mut DriverState, decoded| {
            ctx.actions.push(SlaveAction::FsSnapRequest {
                path: field_path(decoded, "path"),
                out_path: field_path(decoded, "out_path"),
                max_depth: field_u16(decoded, "max_depth"),
                include_size: field_u16(decoded, "include_size") != 0,
            });
        }),
    );

    dispatcher
}

/// Decode a frame's raw bytes without consuming them through a stream
/// parser; used by transports that already demarcate whole frames (e.g. a
/// UDP datagram is one frame per packet).
///
/// # Errors
///
/// Returns [`FrameError`] if the buffer does not contain a single valid
/// frame by itself.
pub fn decode_standalone_frame(bytes: &[u8], max_len: usize) -> Result<Frame, FrameError> {
    let (frame, _consumed) = decode_one(bytes, max_len)?;
    Ok(frame)
}

fn field_u16(decoded: &DecodedPayload, name: &str) -> u16 {
    decoded.get(name).and_then(FieldValue::as_u32).unwrap_or_default() as u16
}

fn field_u32(decoded: &DecodedPayload, name: &str) -> u32 {
    decoded.get(name).and_then(FieldValue::as_u32).unwrap_or_default()
}

fn field_sha256(decoded: &DecodedPayload, name: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    if let Some(bytes) = decoded.get(name).and_then(FieldValue::as_bytes) {
        let n = bytes.len().min(32);
        out[..n].copy_from_slice(&bytes[..n]);
    }
    out
}

fn field_path(decoded: &DecodedPayload, name: &str) -> std::path::PathBuf {
    decoded.get(name).and_then(FieldValue::as_str).map(std::path::PathBuf::from).unwrap_or_default()
}
