//! Inbound playback commands and outbound session events.
//!
//! Ported from the light-control backend's WebSocket message vocabulary
//! (`playback_init`, `playback_play`, …). Field names and the `type`
//! discriminator are kept so existing clients need no changes.

use serde::{Deserialize, Serialize};

fn default_slave_id() -> i32 {
    -1
}

/// A command parsed from a session's incoming text message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Open an archive and move the session to `Ready`.
    #[serde(rename = "playback_init")]
    Init {
        /// Archive filename, resolved under the server's content directory.
        filename: String,
        /// Slave to target; `-1` means every slave.
        #[serde(default = "default_slave_id")]
        slave_id: i32,
    },
    /// Start (or resume) the pacing task.
    #[serde(rename = "playback_play")]
    Play {
        /// Frame to start from; omitted continues from the current frame.
        #[serde(default)]
        frame: Option<u32>,
        /// Slave to target for this run; omitted keeps the session's current target.
        #[serde(default)]
        slave_id: Option<i32>,
    },
    /// Halt the pacing task without resetting position.
    #[serde(rename = "playback_pause")]
    Pause,
    /// Halt the pacing task and reset position to frame 0.
    #[serde(rename = "playback_stop")]
    Stop,
    /// Jump to a frame and emit it once.
    #[serde(rename = "playback_seek")]
    Seek {
        /// Target frame.
        frame: u32,
        /// Slave to target; omitted keeps the session's current target.
        #[serde(default)]
        slave_id: Option<i32>,
    },
    /// Emit one frame without changing playback state.
    #[serde(rename = "playback_get_frame")]
    GetFrame {
        /// Requested frame.
        frame: u32,
        /// Slave to target; omitted keeps the session's current target.
        #[serde(default)]
        slave_id: Option<i32>,
    },
    /// Liveness probe, answered with `pong`.
    #[serde(rename = "ping")]
    Ping,
    /// Diagnostic round-trip, answered with `test_response`.
    #[serde(rename = "test_message")]
    TestMessage {
        /// Arbitrary text echoed back in the response.
        #[serde(default)]
        message: String,
    },
}

impl InboundMessage {
    /// Whether this message steers playback state. The monitor role drops
    /// these silently; read-only or diagnostic requests are still honored.
    #[must_use]
    pub fn is_control(&self) -> bool {
        !matches!(self, Self::GetFrame { .. } | Self::Ping | Self::TestMessage { .. })
    }
}

/// One slave's frame payload within a `frame_data_all` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlaveFrame {
    /// Slave id.
    pub slave_id: u8,
    /// Base64-encoded RGBW bytes.
    pub rgbw_b64: String,
    /// Pixel count recorded for this slave in the archive.
    pub pixel_count: u16,
}

/// An event emitted by a playback session, destined for its broadcast group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    /// Acknowledges a new connection joining a group.
    #[serde(rename = "connection")]
    Connection {
        /// Human-readable acknowledgment text.
        message: String,
    },
    /// Acknowledges `init`.
    #[serde(rename = "ready")]
    Ready {
        /// Archive filename.
        filename: String,
        /// Bound slave target.
        slave_id: i32,
        /// Total frame count.
        total_frames: u32,
        /// Archive frame rate.
        fps: u8,
        /// Total slave count recorded in the archive header.
        total_slaves: u16,
        /// Slave ids observed at frame 0.
        slave_ids: Vec<u8>,
    },
    /// Acknowledges `play`.
    #[serde(rename = "started")]
    Started {
        /// Frame the pacing task started from.
        frame: u32,
        /// Archive frame rate.
        fps: u8,
    },
    /// Acknowledges `pause`.
    #[serde(rename = "paused")]
    Paused {
        /// Frame the session was on when paused.
        frame: u32,
    },
    /// Acknowledges `stop`.
    #[serde(rename = "stopped")]
    Stopped,
    /// One slave's frame data.
    #[serde(rename = "frame_data")]
    FrameData {
        /// Frame id.
        frame: u32,
        /// Slave id.
        slave_id: u8,
        /// Base64-encoded RGBW bytes.
        rgbw_b64: String,
        /// Pixel count recorded for this slave.
        pixel_count: u16,
    },
    /// Every slave's frame data, sorted by ascending slave id.
    #[serde(rename = "frame_data_all")]
    FrameDataAll {
        /// Frame id.
        frame: u32,
        /// Per-slave payloads.
        slaves: Vec<SlaveFrame>,
        /// Number of slaves present in this frame.
        total_slaves: usize,
    },
    /// A non-fatal error; the session remains usable.
    #[serde(rename = "error")]
    Error {
        /// Human-readable failure description.
        message: String,
    },
    /// Answers `ping`.
    #[serde(rename = "pong")]
    Pong,
    /// Answers `test_message`.
    #[serde(rename = "test_response")]
    TestResponse {
        /// The request's `message`, echoed back.
        original: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_init_with_default_slave_id() {
        let message: InboundMessage =
            serde_json::from_str(r#"{"type":"playback_init","filename":"show.pxld"}"#).expect("parse");
        assert_eq!(message, InboundMessage::Init { filename: "show.pxld".to_owned(), slave_id: -1 });
    }

    #[test]
    fn parses_play_with_explicit_frame() {
        let message: InboundMessage =
            serde_json::from_str(r#"{"type":"playback_play","frame":12}"#).expect("parse");
        assert_eq!(message, InboundMessage::Play { frame: Some(12), slave_id: None });
    }

    #[test]
    fn get_frame_and_diagnostics_are_not_control() {
        let message = InboundMessage::GetFrame { frame: 0, slave_id: None };
        assert!(!message.is_control());
        assert!(!InboundMessage::Ping.is_control());
        assert!(!InboundMessage::TestMessage { message: String::new() }.is_control());
        assert!(InboundMessage::Pause.is_control());
        assert!(InboundMessage::Seek { frame: 0, slave_id: None }.is_control());
    }

    #[test]
    fn outbound_event_serializes_with_type_tag() {
        let event = OutboundEvent::Stopped;
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json, serde_json::json!({"type": "stopped"}));
    }
}
