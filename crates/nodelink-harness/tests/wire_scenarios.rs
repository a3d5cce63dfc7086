//! Wire-level end-to-end scenarios driving a full [`SlaveDriver`] with raw
//! bytes the way a transport loop would, rather than exercising the stream
//! parser or file receiver in isolation.

use nodelink_core::{FileStage, SlaveAction, SlaveDriver};
use nodelink_proto::{DEFAULT_MAX_LEN, commands, pack};
use sha2::{Digest, Sha256};

fn driver() -> SlaveDriver {
    SlaveDriver::new(2, commands::standard_schema_store(), DEFAULT_MAX_LEN)
}

/// Scenario 1: echo round-trip fed in five fragments of varying size.
#[test]
fn echo_round_trip_across_fragments() {
    let mut driver = driver();
    let packed = pack(commands::ECHO, b"\x02\x00hello", 2);

    let chunk_sizes = [1usize, 2, 5, 3, usize::MAX];
    let mut offset = 0;
    let mut actions = Vec::new();
    for &size in &chunk_sizes {
        let end = (offset + size).min(packed.len());
        actions.extend(driver.feed(&packed[offset..end]));
        offset = end;
        if offset >= packed.len() {
            break;
        }
    }

    assert_eq!(actions.len(), 1);
    match &actions[0] {
        SlaveAction::SendFrame { command, payload, .. } => {
            assert_eq!(*command, commands::ECHO);
            assert_eq!(payload.as_slice(), b"\x02\x00hello");
        }
        other => panic!("expected SendFrame, got {other:?}"),
    }
    assert_eq!(driver.dropped_bytes(), 0);
}

/// Scenario 2: noise and a corrupted frame surrounding two valid pings,
/// fed through the full driver (stream parser + dispatcher) at once.
#[test]
fn corrupted_middle_frame_is_absorbed() {
    let mut driver = driver();

    let ping_a = pack(commands::PING, b"", 2);
    let mut corrupted = pack(commands::PING, b"x", 2);
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xFF;
    let ping_broadcast = pack(commands::PING, b"broadcast_ping", nodelink_proto::ADDR_BROADCAST);

    let mut stream = vec![0xAAu8; 10];
    stream.extend_from_slice(&ping_a);
    stream.extend_from_slice(&corrupted);
    stream.extend_from_slice(&ping_broadcast);

    let actions = driver.feed(&stream);

    let replies: Vec<_> = actions
        .iter()
        .filter(|a| matches!(a, SlaveAction::SendFrame { command, .. } if *command == commands::PONG))
        .collect();
    assert_eq!(replies.len(), 2, "expected a PONG for each valid PING: {actions:?}");
    assert!(driver.dropped_bytes() >= 11);
}

fn begin_payload(file_id: u32, total_size: u32, chunk_size: u16, sha256: &[u8; 32], path: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&2u16.to_le_bytes()); // dst_addr
    payload.extend_from_slice(&file_id.to_le_bytes());
    payload.extend_from_slice(&total_size.to_le_bytes());
    payload.extend_from_slice(&chunk_size.to_le_bytes());
    payload.extend_from_slice(sha256);
    let path_bytes = path.as_bytes();
    payload.extend_from_slice(&(path_bytes.len() as u16).to_le_bytes());
    payload.extend_from_slice(path_bytes);
    payload
}

fn chunk_payload(file_id: u32, offset: u32, data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&2u16.to_le_bytes()); // dst_addr
    payload.extend_from_slice(&file_id.to_le_bytes());
    payload.extend_from_slice(&offset.to_le_bytes());
    payload.extend_from_slice(data);
    payload
}

fn end_payload(file_id: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&2u16.to_le_bytes()); // dst_addr
    payload.extend_from_slice(&file_id.to_le_bytes());
    payload
}

/// Scenario 3: a full BEGIN/CHUNK.../END transfer over the wire, verified
/// byte-for-byte against the source.
#[test]
fn file_transfer_success_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("rx.bin");

    let source: Vec<u8> = (0..131_072usize).map(|i| (i % 256) as u8).collect();
    let digest: [u8; 32] = Sha256::digest(&source).into();
    let chunk_size = 1024usize;

    let mut driver = driver();

    let begin = pack(commands::FILE_BEGIN, &begin_payload(7, source.len() as u32, chunk_size as u16, &digest, &dest.to_string_lossy()), 2);
    let actions = driver.feed(&begin);
    assert!(matches!(actions.as_slice(), [SlaveAction::FileTransfer { stage: FileStage::Begin, result: Ok(()) }]));

    for (index, window) in source.chunks(chunk_size).enumerate() {
        let offset = (index * chunk_size) as u32;
        let chunk = pack(commands::FILE_CHUNK, &chunk_payload(7, offset, window), 2);
        let actions = driver.feed(&chunk);
        assert!(
            matches!(actions.as_slice(), [SlaveAction::FileTransfer { stage: FileStage::Chunk, result: Ok(()) }]),
            "chunk {index} rejected: {actions:?}"
        );
    }

    let end = pack(commands::FILE_END, &end_payload(7), 2);
    let actions = driver.feed(&end);
    assert!(matches!(actions.as_slice(), [SlaveAction::FileTransfer { stage: FileStage::End, result: Ok(()) }]), "{actions:?}");
    assert!(!driver.file_transfer_active());

    let written = std::fs::read(&dest).expect("read destination");
    assert_eq!(written.len(), 131_072);
    assert_eq!(written, source);
}

/// Scenario 4: flipping one byte in a chunk leaves the digest check failing
/// at END, while the partially-written file remains on disk.
#[test]
fn file_transfer_digest_mismatch_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("rx.bin");

    let mut source: Vec<u8> = (0..131_072usize).map(|i| (i % 256) as u8).collect();
    let digest: [u8; 32] = Sha256::digest(&source).into();
    source[12_345] ^= 0xFF; // corrupt one byte after computing the expected digest

    let chunk_size = 1024usize;
    let mut driver = driver();

    let begin = pack(commands::FILE_BEGIN, &begin_payload(9, source.len() as u32, chunk_size as u16, &digest, &dest.to_string_lossy()), 2);
    driver.feed(&begin);

    for (index, window) in source.chunks(chunk_size).enumerate() {
        let offset = (index * chunk_size) as u32;
        let chunk = pack(commands::FILE_CHUNK, &chunk_payload(9, offset, window), 2);
        driver.feed(&chunk);
    }

    let end = pack(commands::FILE_END, &end_payload(9), 2);
    let actions = driver.feed(&end);
    match actions.as_slice() {
        [SlaveAction::FileTransfer { stage: FileStage::End, result: Err(error) }] => {
            assert!(error.to_string().to_lowercase().contains("sha") || error.to_string().to_lowercase().contains("digest"), "{error}");
        }
        other => panic!("expected a digest mismatch error, got {other:?}"),
    }
    assert!(dest.exists(), "partially-written file must be left in place");
}
