//! Layered runtime configuration: compiled-in defaults, an optional TOML
//! file, then `NODELINK_`-prefixed environment variables, in increasing
//! precedence. CLI flags (parsed in `main.rs`) take highest precedence and
//! are applied on top of the result of [`RuntimeConfig::load`].

use std::path::PathBuf;

use serde::Deserialize;

/// Which transport the slave binary should open.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum TransportKind {
    /// Listen for a single inbound TCP connection.
    Tcp {
        /// Address to bind.
        bind: String,
    },
    /// Exchange UDP datagrams with any sender.
    Udp {
        /// Address to bind.
        bind: String,
    },
    /// Read/write a serial device.
    Serial {
        /// Device path, e.g. `/dev/ttyUSB0`.
        device: String,
        /// Baud rate.
        baud_rate: u32,
    },
}

impl Default for TransportKind {
    fn default() -> Self {
        Self::Tcp { bind: "0.0.0.0:7100".to_owned() }
    }
}

/// A file-backed subset of [`RuntimeConfig`]; every field is optional so a
/// partial TOML file only overrides what it names.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    self_addr: Option<u16>,
    max_payload_len: Option<usize>,
    schema_dir: Option<PathBuf>,
    log_filter: Option<String>,
    transport: Option<TransportKind>,
}

/// Assembled slave runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// This slave's bus address.
    pub self_addr: u16,
    /// Maximum accepted payload length.
    pub max_payload_len: usize,
    /// Directory of deployment-specific schema documents, if any.
    pub schema_dir: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_filter: String,
    /// Selected transport.
    pub transport: TransportKind,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            self_addr: 1,
            max_payload_len: nodelink_proto::DEFAULT_MAX_LEN,
            schema_dir: None,
            log_filter: "info".to_owned(),
            transport: TransportKind::default(),
        }
    }
}

impl RuntimeConfig {
    /// Build a configuration from compiled-in defaults, overridden by
    /// `config_path` (if it exists) and then by `NODELINK_*` environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns an error string if `config_path` exists but cannot be parsed.
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if path.exists() {
                let text = std::fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
                let file: FileConfig = toml::from_str(&text).map_err(|e| format!("parsing {}: {e}", path.display()))?;
                config.apply_file(file);
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.self_addr {
            self.self_addr = v;
        }
        if let Some(v) = file.max_payload_len {
            self.max_payload_len = v;
        }
        if let Some(v) = file.schema_dir {
            self.schema_dir = Some(v);
        }
        if let Some(v) = file.log_filter {
            self.log_filter = v;
        }
        if let Some(v) = file.transport {
            self.transport = v;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("NODELINK_SELF_ADDR") {
            if let Ok(parsed) = v.parse() {
                self.self_addr = parsed;
            }
        }
        if let Ok(v) = std::env::var("NODELINK_SCHEMA_DIR") {
            self.schema_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("NODELINK_LOG") {
            self.log_filter = v;
        }
    }
}
