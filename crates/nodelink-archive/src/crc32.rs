//! Zlib-style CRC32 (reflected, polynomial `0xEDB88320`, initial/final XOR `0xFFFFFFFF`).
//!
//! Hand-rolled rather than pulled from a checksum crate, matching the wire
//! CRC16 in `nodelink-proto`: the archive's integrity check is a small,
//! stable piece of math that does not need a dependency.

use std::sync::OnceLock;

const POLY: u32 = 0xEDB8_8320;

fn table() -> &'static [u32; 256] {
    static TABLE: OnceLock<[u32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    })
}

/// Compute the zlib-style CRC32 of `data`.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    let table = table();
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        let idx = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ table[idx];
    }
    crc ^ 0xFFFF_FFFF
}
