//! Server-side PXLD playback sessions: a state machine driving a pacing
//! task over a [`nodelink_archive`] reader, fanned out to clients through
//! named broadcast groups.

pub mod adapter;
pub mod engine;
pub mod error;
pub mod hub;
pub mod messages;

pub use adapter::SessionAdapter;
pub use engine::{EventSink, PlaybackSession, State};
pub use error::PlaybackError;
pub use hub::{BroadcastEndpoint, BroadcastHub};
pub use messages::{InboundMessage, OutboundEvent, SlaveFrame};
