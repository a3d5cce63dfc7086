//! Atomic JSON document store for per-slave configuration and layout
//! mappings.
//!
//! [`ConfigStore`] owns a flat directory of small JSON documents
//! (`slaves.json`, `layout.json`, `mapping_slave_<id>.json`). Reads return a
//! caller-supplied default on absence; writes are atomic (write-temp +
//! rename). [`mapping`] builds on it to synthesize default pixel layouts.

pub mod error;
pub mod mapping;
pub mod store;

pub use error::ConfigError;
pub use mapping::{MapEntry, SlaveMapping, default_mapping, get_or_create_mapping, mapping_filename};
pub use store::ConfigStore;
