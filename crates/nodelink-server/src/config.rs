//! Layered runtime configuration, mirroring `nodelink-slave`'s precedence:
//! compiled-in defaults, an optional TOML file, then `NODELINK_`-prefixed
//! environment variables. CLI flags (`main.rs`) apply on top of the result.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_address: Option<String>,
    archive_dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
    schema_dir: Option<PathBuf>,
    log_filter: Option<String>,
}

/// Assembled server runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Client-facing listener address.
    pub bind_address: String,
    /// Directory PXLD archives are resolved against.
    pub archive_dir: PathBuf,
    /// Directory the configuration document store reads/writes.
    pub config_dir: PathBuf,
    /// Directory of deployment-specific schema documents, loaded at startup.
    pub schema_dir: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8765".to_owned(),
            archive_dir: PathBuf::from("./archives"),
            config_dir: PathBuf::from("./config"),
            schema_dir: None,
            log_filter: "info".to_owned(),
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
        if let Some(v) = file.bind_address {
            self.bind_address = v;
        }
        if let Some(v) = file.archive_dir {
            self.archive_dir = v;
        }
        if let Some(v) = file.config_dir {
            self.config_dir = v;
        }
        if let Some(v) = file.schema_dir {
            self.schema_dir = Some(v);
        }
        if let Some(v) = file.log_filter {
            self.log_filter = v;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("NODELINK_BIND_ADDR") {
            self.bind_address = v;
        }
        if let Ok(v) = std::env::var("NODELINK_ARCHIVE_DIR") {
            self.archive_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NODELINK_CONFIG_DIR") {
            self.config_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NODELINK_SCHEMA_DIR") {
            self.schema_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("NODELINK_LOG") {
            self.log_filter = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_any_override() {
        let config = RuntimeConfig::load(None).expect("load");
        assert_eq!(config.bind_address, "0.0.0.0:8765");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "bind_address = \"127.0.0.1:9000\"\n").expect("write");

        let config = RuntimeConfig::load(Some(&path)).expect("load");
        assert_eq!(config.bind_address, "127.0.0.1:9000");
    }
}
