//! Quantified random-access invariant: for every frame and every slave
//! present at frame 0, `slave_rgbw` returns exactly `pixel_count * 4` bytes,
//! and the `-1` ("all slaves") mode returns their concatenation in
//! ascending slave_id order.

use nodelink_archive::PxldReader;
use proptest::prelude::*;

fn build_archive(total_slaves: u16, total_frames: u32, pixel_counts: &[u16], fps: u8) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"PXLD");
    out.push(3); // major
    out.push(0); // minor
    out.push(fps);
    out.extend_from_slice(&total_slaves.to_le_bytes());
    out.extend_from_slice(&total_frames.to_le_bytes());
    let total_pixels: u32 = pixel_counts.iter().map(|&p| u32::from(p)).sum();
    out.extend_from_slice(&total_pixels.to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.push(0); // checksum disabled
    out.extend_from_slice(&[0u8; 36]);
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
            out.push(slave_idx as u8);
            out.push(0);
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&pixel_count.to_le_bytes());
            out.extend_from_slice(&running_offset.to_le_bytes());
            let data_length = u32::from(pixel_count) * 4;
            out.extend_from_slice(&data_length.to_le_bytes());
            out.extend_from_slice(&[0u8; 8]);
            running_offset += data_length;
        }

        for bytes in &slave_bytes {
            out.extend_from_slice(bytes);
        }
    }

    out
}

proptest! {
    #[test]
    fn slave_rgbw_length_matches_pixel_count(
        pixel_counts in prop::collection::vec(1u16..64, 1..6),
        total_frames in 1u32..4,
        fps in 1u8..120,
    ) {
        let total_slaves = pixel_counts.len() as u16;
        let bytes = build_archive(total_slaves, total_frames, &pixel_counts, fps);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("archive.pxld");
        std::fs::write(&path, &bytes).expect("write archive");

        let reader = PxldReader::open(&path).expect("open archive");

        for frame_id in 0..total_frames {
            let mut total_len = 0usize;
            for (slave_id, &pixel_count) in pixel_counts.iter().enumerate() {
                let got = reader.slave_rgbw(frame_id, slave_id as i32).expect("per-slave read");
                prop_assert_eq!(got.len(), usize::from(pixel_count) * 4);
                total_len += got.len();
            }
            let all = reader.slave_rgbw(frame_id, -1).expect("all-slaves read");
            prop_assert_eq!(all.len(), total_len);
        }
    }
}
