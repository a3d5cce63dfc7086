//! Chunked file-transfer receiver: BEGIN/CHUNK/END over preallocated storage.
//!
//! Ported from the embedded runtime's `FileRx`: a single-session receiver
//! that preallocates its destination file (sparse-extend, falling back to
//! zero-fill), accepts offset-addressed writes, and verifies the finished
//! file's SHA-256 digest against the one declared at BEGIN.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use crate::error::FileTransferError;

const ZERO_FILL_BLOCK: usize = 512;
const DIGEST_READ_BUF: usize = 2048;

/// Parameters for starting a new file-transfer session.
#[derive(Debug, Clone)]
pub struct BeginRequest {
    /// Identifier correlating CHUNK/END messages with this transfer.
    pub file_id: u32,
    /// Declared total size of the destination file.
    pub total_size: u32,
    /// Advisory chunk size the sender intends to use.
    pub chunk_size: u16,
    /// Expected SHA-256 digest of the completed file.
    pub sha256: [u8; 32],
    /// Destination filesystem path.
    pub path: PathBuf,
}

/// One chunk of file data at a given offset.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    /// Transfer this chunk belongs to.
    pub file_id: u32,
    /// Byte offset within the destination file.
    pub offset: u32,
    /// Chunk data.
    pub data: Vec<u8>,
}

#[derive(Debug)]
enum State {
    Idle,
    Active { file_id: u32, total: u32, chunk_size: u16, sha_expect: [u8; 32], path: PathBuf, handle: File, written: u64 },
}

/// Single-session file receiver state machine.
///
/// Invariant: at most one active session at a time. A new BEGIN implicitly
/// resets any in-flight session.
#[derive(Debug)]
pub struct FileReceiver {
    self_addr: u16,
    state: State,
    last_error: Option<FileTransferError>,
}

impl FileReceiver {
    /// Construct a receiver bound to `self_addr`; messages addressed to
    /// neither `self_addr` nor broadcast are silently ignored rather than
    /// rejected.
    #[must_use]
    pub fn new(self_addr: u16) -> Self {
        Self { self_addr, state: State::Idle, last_error: None }
    }

    /// Whether a transfer is currently in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    /// The most recent error recorded by this receiver, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&FileTransferError> {
        self.last_error.as_ref()
    }

    /// Whether `dst_addr` is this receiver's own address or broadcast.
    fn address_matches(&self, dst_addr: u16) -> bool {
        dst_addr == self.self_addr || dst_addr == nodelink_proto::ADDR_BROADCAST
    }

    /// Handle a BEGIN message, opening and preallocating the destination
    /// file. Resets any prior session first (implicit reset on re-BEGIN).
    ///
    /// A message whose `dst_addr` is neither this receiver's address nor
    /// broadcast is silently ignored: no state changes, nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`FileTransferError::OpenFail`] if the destination cannot be
    /// preallocated or opened for random-access writes.
    pub fn begin(&mut self, dst_addr: u16, req: BeginRequest) -> Result<(), FileTransferError> {
        if !self.address_matches(dst_addr) {
            return Ok(());
        }
        self.last_error = None;
        self.state = State::Idle;

        if let Err(source) = preallocate(&req.path, req.total_size as u64) {
            let err = FileTransferError::OpenFail { path: req.path.display().to_string(), reason: source.to_string() };
            self.last_error = Some(err.clone());
            return Err(err);
        }

        let handle = match OpenOptions::new().read(true).write(true).open(&req.path) {
            Ok(h) => h,
            Err(source) => {
                let err =
                    FileTransferError::OpenFail { path: req.path.display().to_string(), reason: source.to_string() };
                self.last_error = Some(err.clone());
                return Err(err);
            },
        };

        tracing::info!(file_id = req.file_id, total_size = req.total_size, path = %req.path.display(), "file transfer begin");
        self.state = State::Active {
            file_id: req.file_id,
            total: req.total_size,
            chunk_size: req.chunk_size,
            sha_expect: req.sha256,
            path: req.path,
            handle,
            written: 0,
        };
        Ok(())
    }

    /// Handle a CHUNK message, writing `req.data` at `req.offset`.
    ///
    /// Writing the same offset twice is idempotent: the file's contents at
    /// that range are simply overwritten with the same bytes.
    ///
    /// A message whose `dst_addr` is neither this receiver's address nor
    /// broadcast is silently ignored: no state changes, nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`FileTransferError::NoActiveSession`],
    /// [`FileTransferError::FileIdMismatch`],
    /// [`FileTransferError::OutOfRange`], or [`FileTransferError::WriteFail`].
    pub fn chunk(&mut self, dst_addr: u16, req: ChunkRequest) -> Result<(), FileTransferError> {
        if !self.address_matches(dst_addr) {
            return Ok(());
        }
        let State::Active { file_id, total, handle, written, .. } = &mut self.state else {
            let err = FileTransferError::NoActiveSession;
            self.last_error = Some(err.clone());
            return Err(err);
        };
        if req.file_id != *file_id {
            let err = FileTransferError::FileIdMismatch { active: *file_id, received: req.file_id };
            self.last_error = Some(err.clone());
            return Err(err);
        }
        let end = req.offset as u64 + req.data.len() as u64;
        if end > u64::from(*total) {
            let err = FileTransferError::OutOfRange { offset: req.offset, len: req.data.len() as u32, total: *total };
            self.last_error = Some(err.clone());
            return Err(err);
        }
        let write_result = (|| -> std::io::Result<()> {
            handle.seek(SeekFrom::Start(u64::from(req.offset)))?;
            handle.write_all(&req.data)?;
            Ok(())
        })();
        match write_result {
            Ok(()) => {
                *written += req.data.len() as u64;
                Ok(())
            },
            Err(source) => {
                let err = FileTransferError::WriteFail { reason: source.to_string() };
                self.last_error = Some(err.clone());
                Err(err)
            },
        }
    }

    /// Handle an END message: closes the file, verifies its digest, and
    /// returns to `Idle` regardless of outcome.
    ///
    /// A message whose `dst_addr` is neither this receiver's address nor
    /// broadcast is silently ignored: no state changes, nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`FileTransferError::NoActiveSession`],
    /// [`FileTransferError::FileIdMismatch`], or
    /// [`FileTransferError::ShaMismatch`] if verification fails.
    pub fn end(&mut self, dst_addr: u16, file_id: u32) -> Result<(), FileTransferError> {
        if !self.address_matches(dst_addr) {
            return Ok(());
        }
        let State::Active { file_id: active_id, sha_expect, path, .. } =
            std::mem::replace(&mut self.state, State::Idle)
        else {
            let err = FileTransferError::NoActiveSession;
            self.last_error = Some(err.clone());
            return Err(err);
        };
        if file_id != active_id {
            let err = FileTransferError::FileIdMismatch { active: active_id, received: file_id };
            self.last_error = Some(err.clone());
            return Err(err);
        }

        let digest = match sha256_digest_file(&path) {
            Ok(d) => d,
            Err(source) => {
                let err = FileTransferError::OpenFail { path: path.display().to_string(), reason: source.to_string() };
                self.last_error = Some(err.clone());
                return Err(err);
            },
        };

        if digest != sha_expect {
            let err = FileTransferError::ShaMismatch { expected: hex_encode(&sha_expect), actual: hex_encode(&digest) };
            self.last_error = Some(err.clone());
            tracing::warn!(file_id, "file transfer end: sha256 mismatch");
            return Err(err);
        }

        tracing::info!(file_id, "file transfer end: verified");
        self.last_error = None;
        Ok(())
    }
}

fn preallocate(path: &Path, total: u64) -> std::io::Result<()> {
    match preallocate_sparse(path, total) {
        Ok(()) => Ok(()),
        Err(_) => preallocate_zero_fill(path, total),
    }
}

fn preallocate_sparse(path: &Path, total: u64) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    if total > 0 {
        file.seek(SeekFrom::Start(total - 1))?;
        file.write_all(&[0u8])?;
    }
    Ok(())
}

fn preallocate_zero_fill(path: &Path, total: u64) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    let zero = [0u8; ZERO_FILL_BLOCK];
    let mut remaining = total;
    while remaining > 0 {
        let n = remaining.min(ZERO_FILL_BLOCK as u64) as usize;
        file.write_all(&zero[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

fn sha256_digest_file(path: &Path) -> std::io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; DIGEST_READ_BUF];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use sha2::{Digest, Sha256};
    use tempfile::tempdir;

    use super::*;

    fn digest_of(data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    #[test]
    fn successful_transfer_reconstructs_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rx.bin");
        let source: Vec<u8> = (0..131_072u32).map(|i| (i % 251) as u8).collect();
        let digest = digest_of(&source);

        let mut rx = FileReceiver::new(1);
        rx.begin(1, BeginRequest { file_id: 7, total_size: source.len() as u32, chunk_size: 1024, sha256: digest, path: path.clone() })
            .expect("begin");

        for (i, block) in source.chunks(1024).enumerate() {
            rx.chunk(1, ChunkRequest { file_id: 7, offset: (i * 1024) as u32, data: block.to_vec() }).expect("chunk");
        }

        rx.end(1, 7).expect("end verifies digest");
        assert!(!rx.is_active());

        let written = std::fs::read(&path).expect("read back");
        assert_eq!(written, source);
    }

    #[test]
    fn digest_mismatch_leaves_file_but_fails_end() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rx.bin");
        let source = vec![0xABu8; 4096];
        let digest = digest_of(&source);

        let mut rx = FileReceiver::new(1);
        rx.begin(1, BeginRequest { file_id: 1, total_size: 4096, chunk_size: 512, sha256: digest, path: path.clone() })
            .expect("begin");

        let mut corrupted = source.clone();
        corrupted[10] ^= 0xFF;
        rx.chunk(1, ChunkRequest { file_id: 1, offset: 0, data: corrupted }).expect("chunk");

        let err = rx.end(1, 1).unwrap_err();
        assert!(matches!(err, FileTransferError::ShaMismatch { .. }));
        assert!(!rx.is_active());
        assert!(path.exists());
    }

    #[test]
    fn replaying_same_chunk_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rx.bin");
        let source = vec![0x42u8; 100];
        let digest = digest_of(&source);

        let mut rx = FileReceiver::new(1);
        rx.begin(1, BeginRequest { file_id: 1, total_size: 100, chunk_size: 100, sha256: digest, path: path.clone() })
            .expect("begin");
        rx.chunk(1, ChunkRequest { file_id: 1, offset: 0, data: source.clone() }).expect("first write");
        rx.chunk(1, ChunkRequest { file_id: 1, offset: 0, data: source.clone() }).expect("replayed write");
        rx.end(1, 1).expect("digest matches");
    }

    #[test]
    fn chunk_without_active_session_is_error() {
        let mut rx = FileReceiver::new(1);
        let err = rx.chunk(1, ChunkRequest { file_id: 1, offset: 0, data: vec![1] }).unwrap_err();
        assert_eq!(err, FileTransferError::NoActiveSession);
    }

    #[test]
    fn mismatched_destination_is_silently_ignored() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rx.bin");
        let mut rx = FileReceiver::new(1);

        rx.begin(9, BeginRequest { file_id: 1, total_size: 10, chunk_size: 10, sha256: [0u8; 32], path }).expect("ignored, not an error");
        assert!(!rx.is_active());
        assert!(rx.last_error().is_none());

        rx.chunk(9, ChunkRequest { file_id: 1, offset: 0, data: vec![1] }).expect("ignored, not an error");
        assert!(rx.last_error().is_none());

        rx.end(9, 1).expect("ignored, not an error");
        assert!(rx.last_error().is_none());
    }

    #[test]
    fn mismatched_file_id_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rx.bin");
        let mut rx = FileReceiver::new(1);
        rx.begin(1, BeginRequest { file_id: 1, total_size: 10, chunk_size: 10, sha256: [0u8; 32], path }).expect("begin");
        let err = rx.chunk(1, ChunkRequest { file_id: 2, offset: 0, data: vec![1] }).unwrap_err();
        assert_eq!(err, FileTransferError::FileIdMismatch { active: 1, received: 2 });
    }

    #[test]
    fn out_of_range_write_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rx.bin");
        let mut rx = FileReceiver::new(1);
        rx.begin(1, BeginRequest { file_id: 1, total_size: 10, chunk_size: 10, sha256: [0u8; 32], path }).expect("begin");
        let err = rx.chunk(1, ChunkRequest { file_id: 1, offset: 5, data: vec![0u8; 10] }).unwrap_err();
        assert_eq!(err, FileTransferError::OutOfRange { offset: 5, len: 10, total: 10 });
    }
}
