//! Small JSON documents, loaded with a caller-supplied default and saved
//! atomically.
//!
//! Ported from the light-control backend's `config_store` module: a flat
//! directory of named JSON files (`slaves.json`, `layout.json`,
//! `mapping_slave_<id>.json`, …), read on demand and rewritten wholesale on
//! save. The original's `save_json` wrote its target path directly; this
//! store instead writes a sibling temp file and renames it into place, so a
//! crash mid-write never leaves a half-written document behind.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};

use crate::error::ConfigError;

/// A directory of named JSON documents, read with a default and written
/// atomically.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Bind a store to `dir`, creating it (and any missing parents) if
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WriteFail`] if `dir` cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| ConfigError::WriteFail { name: dir.display().to_string(), reason: e.to_string() })?;
        Ok(Self { dir })
    }

    /// Load `name` as JSON, returning `default` if the document does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFail`] if the document exists but cannot
    /// be read, or [`ConfigError::ParseFail`] if its contents are not valid
    /// JSON or do not match `T`'s shape.
    pub fn load<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T, ConfigError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(default);
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| ConfigError::ReadFail { name: name.to_owned(), reason: e.to_string() })?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseFail { name: name.to_owned(), reason: e.to_string() })
    }

    /// Serialize `value` and write it to `name`, replacing any prior
    /// contents atomically (write to a sibling temp file, then rename).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WriteFail`] if serialization or either file
    /// operation fails.
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<(), ConfigError> {
        let path = self.path_for(name);
        let serialized = serde_json::to_string_pretty(value)
            .map_err(|e| ConfigError::WriteFail { name: name.to_owned(), reason: e.to_string() })?;

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, serialized)
            .map_err(|e| ConfigError::WriteFail { name: name.to_owned(), reason: e.to_string() })?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| ConfigError::WriteFail { name: name.to_owned(), reason: e.to_string() })?;

        tracing::debug!(name, path = %path.display(), "config document saved");
        Ok(())
    }

    /// Whether `name` currently exists in this store.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// The directory this store is bound to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Doc {
        value: u32,
    }

    #[test]
    fn load_returns_default_when_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::open(dir.path()).expect("open");
        let doc: Doc = store.load("missing.json", Doc { value: 7 }).expect("default");
        assert_eq!(doc, Doc { value: 7 });
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::open(dir.path()).expect("open");
        store.save("doc.json", &Doc { value: 42 }).expect("save");
        let doc: Doc = store.load("doc.json", Doc { value: 0 }).expect("load");
        assert_eq!(doc, Doc { value: 42 });
    }

    #[test]
    fn save_overwrites_prior_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::open(dir.path()).expect("open");
        store.save("doc.json", &json!({"a": 1})).expect("save");
        store.save("doc.json", &json!({"a": 2})).expect("save");
        let value: serde_json::Value = store.load("doc.json", json!(null)).expect("load");
        assert_eq!(value, json!({"a": 2}));
    }

    #[test]
    fn no_leftover_temp_file_after_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::open(dir.path()).expect("open");
        store.save("doc.json", &Doc { value: 1 }).expect("save");
        assert!(!dir.path().join("doc.tmp").exists());
    }
}
