//! Glue between a transport connection and a playback session.
//!
//! Parses incoming text messages into [`InboundMessage`]s, drives a
//! [`PlaybackSession`], and publishes its events to a [`BroadcastHub`]
//! group. A `monitor` adapter receives every event broadcast to its group
//! but has its control messages (`play`/`pause`/`stop`/`seek`/`init`)
//! silently dropped; `get_frame` still executes so an observer can request
//! a specific frame without being able to steer shared playback.

use std::{path::PathBuf, sync::Arc};

use crate::{
    engine::{EventSink, PlaybackSession},
    hub::{BroadcastEndpoint, BroadcastHub},
    messages::{InboundMessage, OutboundEvent},
};

/// One connection's adapter between transport text frames and a playback
/// session attached to a broadcast group.
pub struct SessionAdapter {
    session: PlaybackSession,
    endpoint: Option<BroadcastEndpoint>,
    sink: EventSink,
    monitor: bool,
}

impl SessionAdapter {
    /// Attach to `group` on `hub` and create a fresh playback session
    /// rooted at `base_dir`. `monitor` sessions may observe but not command.
    pub fn new(base_dir: impl Into<PathBuf>, hub: &Arc<BroadcastHub>, group: impl Into<String>, monitor: bool) -> Self {
        let group = group.into();
        let endpoint = hub.attach(group.clone());

        let hub_for_sink = Arc::clone(hub);
        let sink: EventSink = Arc::new(move |event| hub_for_sink.broadcast(&group, event));

        let session = PlaybackSession::new(base_dir, Arc::clone(&sink));
        (sink)(OutboundEvent::Connection { message: "connected".to_owned() });

        Self { session, endpoint: Some(endpoint), sink, monitor }
    }

    /// Wait for the next event broadcast to this adapter's group.
    ///
    /// # Panics
    ///
    /// Panics if called after [`Self::close`].
    pub async fn recv(&self) -> OutboundEvent {
        self.endpoint.as_ref().expect("adapter used after close").recv().await
    }

    /// Parse and dispatch one incoming text message.
    pub async fn handle_text(&mut self, text: &str) {
        let message: InboundMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(error) => {
                (self.sink)(OutboundEvent::Error { message: format!("invalid message: {error}") });
                return;
            }
        };
        self.dispatch(message).await;
    }

    async fn dispatch(&mut self, message: InboundMessage) {
        if self.monitor && message.is_control() {
            tracing::debug!("monitor session dropped control message");
            return;
        }

        let result = match message {
            InboundMessage::Init { filename, slave_id } => self.session.init(&filename, slave_id).await,
            InboundMessage::Play { frame, slave_id: _ } => self.session.play(frame).await,
            InboundMessage::Pause => {
                self.session.pause().await;
                Ok(())
            }
            InboundMessage::Stop => {
                self.session.stop().await;
                Ok(())
            }
            InboundMessage::Seek { frame, slave_id } => self.session.seek(frame, slave_id).await,
            InboundMessage::GetFrame { frame, slave_id } => self.session.get_frame(frame, slave_id).await,
            InboundMessage::Ping => {
                (self.sink)(OutboundEvent::Pong);
                Ok(())
            }
            InboundMessage::TestMessage { message } => {
                (self.sink)(OutboundEvent::TestResponse { original: message });
                Ok(())
            }
        };

        if let Err(error) = result {
            (self.sink)(OutboundEvent::Error { message: error.to_string() });
        }
    }

    /// Stop the playback session and detach from the broadcast hub.
    pub async fn close(&mut self) {
        self.session.stop().await;
        if let Some(endpoint) = self.endpoint.take() {
            endpoint.detach();
        }
    }
}
