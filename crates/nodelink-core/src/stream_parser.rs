//! Incremental, resynchronizing frame demarcator.
//!
//! Ported from the embedded runtime's `StreamParser`: accepts arbitrary byte
//! slices (any fragmentation, any coalescing) and yields only well-formed,
//! checksum-valid frames, absorbing everything else into a drop counter. The
//! parser never blocks and never errors terminally — corruption just costs
//! bytes, not availability.

use bytes::{Bytes, BytesMut};
use nodelink_proto::header::{ADDR_BROADCAST, CURRENT_VERSION, FrameHeader, PREAMBLE};

/// One frame successfully demarcated from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Protocol version the frame declared.
    pub version: u8,
    /// Destination address.
    pub address: u16,
    /// Command code.
    pub command: u16,
    /// Decoded payload bytes.
    pub payload: Bytes,
}

/// Stateful, resynchronizing frame demarcator.
#[derive(Debug)]
pub struct StreamParser {
    buf: BytesMut,
    max_len: usize,
    accept_addr: Option<u16>,
    drop_bytes: u64,
}

impl StreamParser {
    /// Build a parser with the given max payload length and an optional
    /// address filter (only that address or broadcast are yielded).
    #[must_use]
    pub fn new(max_len: usize, accept_addr: Option<u16>) -> Self {
        Self { buf: BytesMut::new(), max_len, accept_addr, drop_bytes: 0 }
    }

    /// Append bytes to the rolling buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Total bytes absorbed as noise or corruption since construction.
    #[must_use]
    pub fn drop_bytes(&self) -> u64 {
        self.drop_bytes
    }

    /// Number of bytes currently buffered awaiting more data.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Drain and decode every complete, valid frame currently buffered.
    ///
    /// Equivalent to repeatedly calling [`Self::pop_one`] until it returns
    /// `None`.
    pub fn pop(&mut self) -> Vec<DecodedFrame> {
        let mut out = Vec::new();
        while let Some(frame) = self.pop_one() {
            out.push(frame);
        }
        out
    }

    /// Attempt to decode one frame from the front of the buffer.
    ///
    /// Returns `None` when no complete frame is currently available (either
    /// the buffer is exhausted, or only a partial frame remains, awaiting
    /// more bytes). Internally may drop corrupt or unaddressed data and
    /// retry before returning a decoded frame.
    pub fn pop_one(&mut self) -> Option<DecodedFrame> {
        loop {
            if !self.resync_to_preamble() {
                return None;
            }
            if self.buf.len() < FrameHeader::SIZE {
                return None;
            }

            let preamble_ok = self.buf[0..2] == PREAMBLE;
            let version = self.buf[2];
            let address = u16::from_le_bytes([self.buf[3], self.buf[4]]);
            let command = u16::from_le_bytes([self.buf[5], self.buf[6]]);
            let len = u16::from_le_bytes([self.buf[7], self.buf[8]]) as usize;

            if !preamble_ok || version != CURRENT_VERSION || len > self.max_len {
                tracing::debug!(version, len, "stream parser dropping byte: bad header");
                self.drop_one();
                continue;
            }

            let frame_len = FrameHeader::SIZE + len + 2;
            if self.buf.len() < frame_len {
                return None;
            }

            let payload_start = FrameHeader::SIZE;
            let payload_end = payload_start + len;
            let payload = &self.buf[payload_start..payload_end];
            let crc_received = u16::from_le_bytes([self.buf[payload_end], self.buf[payload_end + 1]]);
            let crc_calculated = nodelink_proto::crc16_ccitt(&self.buf[2..payload_end]);

            if crc_received != crc_calculated {
                tracing::debug!(expected = crc_calculated, actual = crc_received, "stream parser dropping byte: crc fail");
                self.drop_one();
                continue;
            }

            let payload = Bytes::copy_from_slice(payload);
            self.buf.advance_front(frame_len);

            if !self.address_ok(address) {
                continue;
            }

            return Some(DecodedFrame { version, address, command, payload });
        }
    }

    /// Find the next preamble occurrence and discard everything before it.
    ///
    /// Returns `false` if no preamble is present (all but the last byte is
    /// dropped, since the last byte might be the start of a split preamble).
    fn resync_to_preamble(&mut self) -> bool {
        if self.buf.len() < 2 {
            return false;
        }
        match find_subslice(&self.buf, &PREAMBLE) {
            Some(0) => true,
            Some(idx) => {
                self.drop_bytes += idx as u64;
                self.buf.advance_front(idx);
                true
            },
            None => {
                let keep_last = 1usize;
                if self.buf.len() > keep_last {
                    self.drop_bytes += (self.buf.len() - keep_last) as u64;
                    let tail_start = self.buf.len() - keep_last;
                    self.buf.advance_front(tail_start);
                }
                false
            },
        }
    }

    fn drop_one(&mut self) {
        self.drop_bytes += 1;
        self.buf.advance_front(1);
    }

    fn address_ok(&self, address: u16) -> bool {
        match self.accept_addr {
            None => true,
            Some(accept) => address == accept || address == ADDR_BROADCAST,
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

trait AdvanceFront {
    fn advance_front(&mut self, n: usize);
}

impl AdvanceFront for BytesMut {
    fn advance_front(&mut self, n: usize) {
        let _ = self.split_to(n.min(self.len()));
    }
}

#[cfg(test)]
mod tests {
    use nodelink_proto::pack;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn echo_round_trip_across_fragments() {
        let packed = pack(0x0101, b"hello", 0x0002);
        let mut parser = StreamParser::new(4096, None);
        let chunk_sizes = [1usize, 2, 5, 3, usize::MAX];
        let mut offset = 0;
        for &size in &chunk_sizes {
            let end = (offset + size).min(packed.len());
            parser.feed(&packed[offset..end]);
            offset = end;
            if offset >= packed.len() {
                break;
            }
        }
        let frames = parser.pop();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), b"hello");
        assert_eq!(parser.drop_bytes(), 0);
    }

    #[test]
    fn resynchronizes_past_noise_and_corruption() {
        let ping_a = pack(0x0001, b"", 2);
        let mut corrupted = pack(0x0001, b"x", 2);
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        let ping_broadcast = pack(0x0001, b"broadcast_ping", ADDR_BROADCAST);

        let mut stream = vec![0xAAu8; 10];
        stream.extend_from_slice(&ping_a);
        stream.extend_from_slice(&corrupted);
        stream.extend_from_slice(&ping_broadcast);

        let mut parser = StreamParser::new(4096, Some(2));
        parser.feed(&stream);
        let frames = parser.pop();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload.as_ref(), b"");
        assert_eq!(frames[1].payload.as_ref(), b"broadcast_ping");
        assert!(parser.drop_bytes() >= 11);
    }

    #[test]
    fn address_filter_drops_mismatched_without_yielding() {
        let for_other = pack(0x0001, b"", 5);
        let for_us = pack(0x0001, b"", 2);
        let mut parser = StreamParser::new(4096, Some(2));
        parser.feed(&for_other);
        parser.feed(&for_us);
        let frames = parser.pop();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].address, 2);
    }

    proptest! {
        #[test]
        fn fragmentation_invariance(
            command: u16,
            address: u16,
            payload in prop::collection::vec(any::<u8>(), 0..256),
            cut in 0usize..512,
        ) {
            let packed = pack(command, &payload, address);
            let cut = cut.min(packed.len());
            let mut parser = StreamParser::new(4096, None);
            parser.feed(&packed[..cut]);
            prop_assert!(parser.pop().is_empty());
            parser.feed(&packed[cut..]);
            let frames = parser.pop();
            prop_assert_eq!(frames.len(), 1);
            prop_assert_eq!(frames[0].address, address);
            prop_assert_eq!(frames[0].command, command);
            prop_assert_eq!(frames[0].payload.as_ref(), payload.as_slice());
        }
    }
}
