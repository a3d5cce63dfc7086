//! Playback end-to-end scenarios driving a full
//! [`nodelink_playback::SessionAdapter`] over its JSON message vocabulary,
//! the way a client connection would, rather than calling
//! `PlaybackSession` directly.

use std::sync::Arc;
use std::time::Duration;

use nodelink_archive::PxldReader;
use nodelink_playback::{BroadcastHub, OutboundEvent, SessionAdapter};

fn write_synthetic_archive(path: &std::path::Path) {
    let total_slaves: u16 = 2;
    let total_frames: u32 = 3;
    let pixel_counts = [10u16, 7u16];
    let fps: u8 = 40;

    let mut out = Vec::new();
    out.extend_from_slice(b"PXLD");
    out.push(3); // major
    out.push(0); // minor
    out.push(fps);
    out.extend_from_slice(&total_slaves.to_le_bytes());
    out.extend_from_slice(&total_frames.to_le_bytes());
    let total_pixels = u32::from(pixel_counts[0]) + u32::from(pixel_counts[1]);
    out.extend_from_slice(&total_pixels.to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes()); // frame_header_size
    out.extend_from_slice(&24u16.to_le_bytes()); // slave_entry_size
    out.extend_from_slice(&0u16.to_le_bytes()); // udp_port
    out.extend_from_slice(&0u32.to_le_bytes()); // file_crc32 placeholder
    out.push(0); // checksum_type disabled
    out.extend_from_slice(&[0u8; 36]); // reserved
    assert_eq!(out.len(), 64);

    for frame_id in 0..total_frames {
        let slave_table_size = u32::from(total_slaves) * 24;
        let slave_bytes: Vec<Vec<u8>> = pixel_counts
            .iter()
            .enumerate()
            .map(|(slave_idx, &pixel_count)| {
                (0..pixel_count).flat_map(|pixel| [frame_id as u8, slave_idx as u8, (pixel & 0xff) as u8, 0xff]).collect()
            })
            .collect();
        let pixel_data_size: u32 = slave_bytes.iter().map(|b| b.len() as u32).sum();

        out.extend_from_slice(&frame_id.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&slave_table_size.to_le_bytes());
        out.extend_from_slice(&pixel_data_size.to_le_bytes());
        out.extend_from_slice(&[0u8; 16]);

        let mut running_offset = 0u32;
        for (slave_idx, &pixel_count) in pixel_counts.iter().enumerate() {
            out.push(slave_idx as u8); // slave_id
            out.push(0); // flags
            out.extend_from_slice(&0u16.to_le_bytes()); // channel_start
            out.extend_from_slice(&0u16.to_le_bytes()); // channel_count
            out.extend_from_slice(&pixel_count.to_le_bytes());
            out.extend_from_slice(&running_offset.to_le_bytes()); // data_offset
            let data_length = u32::from(pixel_count) * 4;
            out.extend_from_slice(&data_length.to_le_bytes());
            out.extend_from_slice(&[0u8; 8]);
            running_offset += data_length;
        }

        for bytes in &slave_bytes {
            out.extend_from_slice(bytes);
        }
    }

    std::fs::write(path, &out).expect("write synthetic archive");
}

/// Scenario 5: random-access frame/slave lengths match the archive's
/// declared pixel counts, read directly through the archive reader.
#[test]
fn pxld_decode_reports_expected_lengths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("show.pxld");
    write_synthetic_archive(&path);

    let reader = PxldReader::open(&path).expect("open archive");
    assert_eq!(reader.total_frames(), 3);

    assert_eq!(reader.slave_rgbw(0, 0).expect("slave 0").len(), 40);
    assert_eq!(reader.slave_rgbw(0, 1).expect("slave 1").len(), 28);
    assert_eq!(reader.slave_rgbw(0, -1).expect("all slaves").len(), 68);
}

/// Scenario 6: after `pause`, no further `frame_data_all` arrives, and the
/// `paused` event reports a frame no earlier than what was last observed.
#[tokio::test]
async fn playback_pause_is_prompt() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_synthetic_archive(&dir.path().join("show.pxld"));

    let hub = Arc::new(BroadcastHub::new());
    let mut adapter = SessionAdapter::new(dir.path(), &hub, "room", false);

    assert_eq!(adapter.recv().await, OutboundEvent::Connection { message: "connected".to_owned() });

    adapter.handle_text(r#"{"type":"playback_init","filename":"show.pxld"}"#).await;
    match adapter.recv().await {
        OutboundEvent::Ready { total_frames, .. } => assert_eq!(total_frames, 3),
        other => panic!("expected Ready, got {other:?}"),
    }

    adapter.handle_text(r#"{"type":"playback_play","frame":0}"#).await;
    match adapter.recv().await {
        OutboundEvent::Started { frame, .. } => assert_eq!(frame, 0),
        other => panic!("expected Started, got {other:?}"),
    }

    let mut last_frame = None;
    for _ in 0..3 {
        match adapter.recv().await {
            OutboundEvent::FrameDataAll { frame, .. } => last_frame = Some(frame),
            other => panic!("expected FrameDataAll, got {other:?}"),
        }
    }
    let last_frame = last_frame.expect("observed at least one frame");

    adapter.handle_text(r#"{"type":"playback_pause"}"#).await;
    match adapter.recv().await {
        OutboundEvent::Paused { frame } => assert!(frame <= last_frame + 1, "paused frame {frame} too far past {last_frame}"),
        other => panic!("expected Paused, got {other:?}"),
    }

    // Archive runs at 40fps (25ms period); waiting well past one period
    // with nothing further to receive confirms emission actually stopped.
    let nothing_further = tokio::time::timeout(Duration::from_millis(100), adapter.recv()).await;
    assert!(nothing_further.is_err(), "no event should arrive after pause is acknowledged");

    adapter.close().await;
}
