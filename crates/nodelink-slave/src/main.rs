//! Embedded slave runtime binary.
//!
//! # Usage
//!
//! ```bash
//! nodelink-slave --transport tcp --bind 0.0.0.0:7100 --self-addr 1
//! nodelink-slave --transport serial --device /dev/ttyUSB0 --baud-rate 115200
//! ```

use clap::Parser;
use nodelink_slave::{RuntimeConfig, TransportKind};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Embedded slave runtime: stream parser, dispatcher, and file receiver
/// bound to a TCP, UDP, or serial transport.
#[derive(Parser, Debug)]
#[command(name = "nodelink-slave")]
#[command(about = "nodelink embedded slave runtime")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Transport kind: tcp, udp, or serial.
    #[arg(long)]
    transport: Option<String>,

    /// Bind address for tcp/udp transports.
    #[arg(long)]
    bind: Option<String>,

    /// Serial device path (serial transport only).
    #[arg(long)]
    device: Option<String>,

    /// Serial baud rate (serial transport only).
    #[arg(long)]
    baud_rate: Option<u32>,

    /// This slave's bus address.
    #[arg(long)]
    self_addr: Option<u16>,

    /// Directory of deployment-specific schema documents.
    #[arg(long)]
    schema_dir: Option<std::path::PathBuf>,

    /// Log filter directive (e.g. `info`, `debug`, `nodelink_core=trace`).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = RuntimeConfig::load(args.config.as_deref())?;

    if let Some(level) = &args.log_level {
        config.log_filter = level.clone();
    }
    if let Some(addr) = args.self_addr {
        config.self_addr = addr;
    }
    if let Some(dir) = args.schema_dir {
        config.schema_dir = Some(dir);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    apply_transport_override(&mut config, &args);
    tracing::info!(self_addr = config.self_addr, "nodelink-slave starting");

    nodelink_slave::run(config).await?;
    Ok(())
}

fn apply_transport_override(config: &mut RuntimeConfig, args: &Args) {
    match args.transport.as_deref() {
        Some("tcp") => {
            config.transport =
                TransportKind::Tcp { bind: args.bind.clone().unwrap_or_else(|| "0.0.0.0:7100".to_owned()) };
        }
        Some("udp") => {
            config.transport =
                TransportKind::Udp { bind: args.bind.clone().unwrap_or_else(|| "0.0.0.0:7100".to_owned()) };
        }
        Some("serial") => {
            if let Some(device) = &args.device {
                config.transport =
                    TransportKind::Serial { device: device.clone(), baud_rate: args.baud_rate.unwrap_or(115_200) };
            }
        }
        Some(other) => tracing::warn!(transport = other, "unrecognized --transport, keeping configured default"),
        None => {}
    }
}
