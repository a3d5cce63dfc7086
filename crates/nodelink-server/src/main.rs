//! Nodelink server binary.
//!
//! # Usage
//!
//! ```bash
//! nodelink-server --bind 0.0.0.0:8765 --archive-dir ./archives
//! ```

use std::path::PathBuf;

use clap::Parser;
use nodelink_server::RuntimeConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Nodelink playback server
#[derive(Parser, Debug)]
#[command(name = "nodelink-server")]
#[command(about = "Client-facing playback session server")]
#[command(version)]
struct Args {
    /// Path to a TOML runtime configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind the client-facing listener to
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory PXLD archives are resolved against
    #[arg(long)]
    archive_dir: Option<PathBuf>,

    /// Directory the configuration document store reads/writes
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Directory of deployment-specific schema documents
    #[arg(long)]
    schema_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = RuntimeConfig::load(args.config.as_deref()).map_err(nodelink_server::ServerRuntimeError::Config)?;

    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(dir) = args.archive_dir {
        config.archive_dir = dir;
    }
    if let Some(dir) = args.config_dir {
        config.config_dir = dir;
    }
    if let Some(dir) = args.schema_dir {
        config.schema_dir = Some(dir);
    }
    config.log_filter = args.log_level;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("nodelink server starting");

    nodelink_server::run(config).await?;

    Ok(())
}
