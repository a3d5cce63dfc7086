//! Transport-specific event loops.
//!
//! Each loop owns one transport (a single TCP connection, a UDP socket, or a
//! serial port), feeds bytes into a [`SlaveDriver`], and executes the
//! resulting actions: write reply frames back over the same transport, or
//! perform the filesystem walk an `FS_TREE_GET`/`FS_SNAP_GET` action
//! requests. This is the Sans-IO driver's one I/O executor; the driver
//! itself never touches a socket.

use nodelink_core::{FileStage, SlaveAction, SlaveDriver};
use nodelink_proto::{commands, pack};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio_serial::SerialPortBuilderExt;

use crate::{error::SlaveRuntimeError, fs_tree::render_tree};

/// Accept one TCP connection at a time and drive each to completion before
/// accepting the next, matching the spec's single-threaded, one-connection
/// cooperative model for the slave side.
pub async fn run_tcp(bind: &str, mut driver: SlaveDriver) -> Result<(), SlaveRuntimeError> {
    let listener = TcpListener::bind(bind).await.map_err(SlaveRuntimeError::Transport)?;
    tracing::info!(bind, "slave: listening on tcp");

    loop {
        let (stream, peer) = listener.accept().await.map_err(SlaveRuntimeError::Transport)?;
        tracing::info!(%peer, "slave: tcp connection accepted");
        let (mut reader, mut writer) = stream.into_split();
        run_stream_loop(&mut reader, &mut writer, &mut driver).await;
    }
}

/// Drive a serial port's byte stream the same way as a TCP connection.
pub async fn run_serial(device: &str, baud_rate: u32, mut driver: SlaveDriver) -> Result<(), SlaveRuntimeError> {
    let port = tokio_serial::new(device, baud_rate).open_native_async().map_err(|e| {
        SlaveRuntimeError::Transport(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    })?;
    tracing::info!(device, baud_rate, "slave: serial port opened");

    let (mut reader, mut writer) = tokio::io::split(port);
    run_stream_loop(&mut reader, &mut writer, &mut driver).await;
    Ok(())
}

async fn run_stream_loop(
    reader: &mut (impl AsyncRead + Unpin),
    writer: &mut (impl AsyncWrite + Unpin),
    driver: &mut SlaveDriver,
) {
    let mut buf = [0u8; 4096];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::info!("slave: connection closed by peer");
                break;
            }
            Ok(n) => n,
            Err(error) => {
                tracing::warn!(%error, "slave: read error");
                break;
            }
        };

        let actions = driver.feed(&buf[..n]);
        for action in actions {
            if let Some(reply) = execute_action(action) {
                if let Err(error) = writer.write_all(&reply).await {
                    tracing::warn!(%error, "slave: write error");
                    return;
                }
            }
        }
    }
}

/// Receive datagrams and feed each one to the driver independently; replies
/// are sent back to the originating address.
pub async fn run_udp(bind: &str, mut driver: SlaveDriver) -> Result<(), SlaveRuntimeError> {
    let socket = UdpSocket::bind(bind).await.map_err(SlaveRuntimeError::Transport)?;
    tracing::info!(bind, "slave: listening on udp");

    let mut buf = [0u8; 4096];
    loop {
        let (n, peer) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(error) => {
                tracing::warn!(%error, "slave: udp recv error");
                continue;
            }
        };

        let actions = driver.feed(&buf[..n]);
        for action in actions {
            if let Some(reply) = execute_action(action) {
                if let Err(error) = socket.send_to(&reply, peer).await {
                    tracing::warn!(%error, "slave: udp send error");
                }
            }
        }
    }
}

/// Turn a driver action into outbound frame bytes, performing whatever
/// synchronous I/O the action itself requires (filesystem walks).
fn execute_action(action: SlaveAction) -> Option<Vec<u8>> {
    match action {
        SlaveAction::SendFrame { command, address, payload } => Some(pack(command, &payload, address)),

        SlaveAction::UnknownCommand { command } => {
            tracing::debug!(command = format!("{command:#06x}"), "slave: unknown command");
            None
        }

        SlaveAction::SchemaRejected { command, error } => {
            tracing::debug!(command = format!("{command:#06x}"), %error, "slave: schema rejected payload");
            None
        }

        SlaveAction::FileTransfer { stage, result } => {
            if let Err(error) = &result {
                tracing::warn!(?stage, %error, "slave: file transfer error");
            } else {
                tracing::info!(?stage, "slave: file transfer stage completed");
            }
            None
        }

        SlaveAction::FsTreeRequest { address, path, max_depth, include_size } => {
            let tree = render_tree(&path, max_depth, include_size);
            let mut payload = Vec::new();
            let path_str = path.display().to_string();
            payload.extend_from_slice(&(path_str.len() as u16).to_le_bytes());
            payload.extend_from_slice(path_str.as_bytes());
            payload.extend_from_slice(&(tree.len() as u16).to_le_bytes());
            payload.extend_from_slice(tree.as_bytes());
            Some(pack(commands::FS_TREE_RSP, &payload, address))
        }

        SlaveAction::FsSnapRequest { path, out_path, max_depth, include_size } => {
            let tree = render_tree(&path, max_depth, include_size);
            if let Err(error) = std::fs::write(&out_path, tree) {
                tracing::warn!(path = %out_path.display(), %error, "slave: snapshot write failed");
            } else {
                tracing::info!(path = %out_path.display(), "slave: snapshot written");
            }
            None
        }
    }
}
