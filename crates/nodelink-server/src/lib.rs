//! Server runtime: accepts client-facing connections over newline-delimited
//! JSON and wires each one to its own [`nodelink_playback::SessionAdapter`],
//! all sharing a single process-wide broadcast hub and configuration store.

pub mod config;
pub mod connection;
pub mod error;

use std::sync::Arc;

use nodelink_playback::BroadcastHub;
use tokio::net::TcpListener;

pub use config::RuntimeConfig;
pub use error::ServerRuntimeError;

/// Load the command schema store: built-in definitions, then any
/// deployment-specific documents under `schema_dir`.
///
/// The server does not decode wire frames itself, but the schema store is
/// process-wide state per the same startup contract the slave binary
/// follows, and a malformed schema directory should fail fast here rather
/// than surface confusingly once a session is already running.
pub fn build_schema_store(schema_dir: Option<&std::path::Path>) -> Result<nodelink_proto::SchemaStore, nodelink_proto::SchemaError> {
    let mut store = nodelink_proto::commands::standard_schema_store();
    if let Some(dir) = schema_dir {
        store.load_dir(dir)?;
    }
    Ok(store)
}

/// Bind the client-facing listener and accept connections until the process
/// is terminated. Each connection is handled on its own task.
pub async fn run(config: RuntimeConfig) -> Result<(), ServerRuntimeError> {
    let schema_store = build_schema_store(config.schema_dir.as_deref())
        .map_err(|error| ServerRuntimeError::Config(error.to_string()))?;
    tracing::info!(commands = schema_store.len(), "schema store loaded");

    let _config_store = nodelink_config::ConfigStore::open(config.config_dir.clone())?;
    tracing::info!(dir = %config.config_dir.display(), "config store opened");

    let hub = Arc::new(BroadcastHub::new());

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .map_err(ServerRuntimeError::Listener)?;
    tracing::info!(addr = %config.bind_address, "listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!(%error, "accept failed");
                continue;
            }
        };
        tracing::debug!(%peer, "accepted connection");

        let hub = Arc::clone(&hub);
        let archive_dir = config.archive_dir.clone();
        tokio::spawn(async move {
            connection::handle_connection(stream, hub, archive_dir).await;
        });
    }
}
