//! Embedded slave runtime: owns a transport (TCP, UDP, or serial), feeds
//! its bytes to [`nodelink_core::SlaveDriver`], and executes the resulting
//! actions.

pub mod config;
pub mod error;
pub mod fs_tree;
pub mod transport;

pub use config::{RuntimeConfig, TransportKind};
pub use error::SlaveRuntimeError;

use nodelink_core::SlaveDriver;
use nodelink_proto::commands;

/// Build a [`SlaveDriver`] from a runtime configuration, loading any
/// deployment-specific schema documents over the standard command set.
///
/// # Errors
///
/// Returns [`SlaveRuntimeError::Schema`] if `config.schema_dir` is set but
/// cannot be loaded.
pub fn build_driver(config: &RuntimeConfig) -> Result<SlaveDriver, SlaveRuntimeError> {
    let mut store = commands::standard_schema_store();
    if let Some(dir) = &config.schema_dir {
        store.load_dir(dir)?;
    }
    Ok(SlaveDriver::new(config.self_addr, store, config.max_payload_len))
}

/// Run the configured transport's event loop. Does not return on success;
/// each transport loop runs until its transport fails.
///
/// # Errors
///
/// Returns [`SlaveRuntimeError::Transport`] if the transport cannot be
/// opened.
pub async fn run(config: RuntimeConfig) -> Result<(), SlaveRuntimeError> {
    let driver = build_driver(&config)?;

    match config.transport {
        TransportKind::Tcp { bind } => transport::run_tcp(&bind, driver).await,
        TransportKind::Udp { bind } => transport::run_udp(&bind, driver).await,
        TransportKind::Serial { device, baud_rate } => transport::run_serial(&device, baud_rate, driver).await,
    }
}
