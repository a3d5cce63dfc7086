//! Per-connection handling: an optional leading `session_hello` picks a
//! broadcast group and role, then the connection alternates between reading
//! client messages and writing broadcast events until the socket closes.
//!
//! The wire handshake itself is out of scope for this system (it is treated
//! as an already-opened bidirectional message channel); `session_hello` is
//! this workspace's own minimal routing convention layered on top, not a
//! protocol the spec defines. A connection that skips it is simply attached
//! to the `default` room as a non-monitor session.

use std::{path::PathBuf, sync::Arc};

use nodelink_playback::{BroadcastHub, SessionAdapter};
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};

const DEFAULT_ROOM: &str = "default";

#[derive(Debug, Deserialize)]
struct SessionHello {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "default_room")]
    room: String,
    #[serde(default)]
    monitor: bool,
}

fn default_room() -> String {
    DEFAULT_ROOM.to_owned()
}

/// Drive one client connection end to end.
pub async fn handle_connection(stream: TcpStream, hub: Arc<BroadcastHub>, archive_dir: PathBuf) {
    let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| "unknown".to_owned());
    let span = tracing::info_span!("session", peer = %peer);
    let _enter = span.enter();
    tracing::info!("connection accepted");

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let first_line = match lines.next_line().await {
        Ok(Some(line)) => line,
        Ok(None) => {
            tracing::debug!("connection closed before any message");
            return;
        }
        Err(error) => {
            tracing::warn!(%error, "read error before any message");
            return;
        }
    };

    let (room, monitor, replay_first_line) = match serde_json::from_str::<SessionHello>(&first_line) {
        Ok(hello) if hello.kind == "session_hello" => (hello.room, hello.monitor, None),
        _ => (default_room(), false, Some(first_line)),
    };

    let mut adapter = SessionAdapter::new(archive_dir, &hub, room, monitor);

    if let Some(line) = replay_first_line {
        adapter.handle_text(&line).await;
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => adapter.handle_text(&text).await,
                    Ok(None) => {
                        tracing::debug!("connection closed by peer");
                        break;
                    }
                    Err(error) => {
                        tracing::warn!(%error, "read error");
                        break;
                    }
                }
            }
            event = adapter.recv() => {
                let Ok(mut payload) = serde_json::to_vec(&event) else { continue };
                payload.push(b'\n');
                if let Err(error) = write_half.write_all(&payload).await {
                    tracing::warn!(%error, "write error");
                    break;
                }
            }
        }
    }

    adapter.close().await;
    tracing::info!("connection closed");
}
