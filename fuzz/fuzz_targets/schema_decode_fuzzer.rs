//! Fuzz target for schema-driven payload decoding.
//!
//! Feeds arbitrary, possibly truncated byte slices to every registered
//! command's decoder. Must never panic, only return a structured
//! `SchemaError` for malformed or short input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nodelink_proto::{commands, schema::decode_payload};

fuzz_target!(|data: &[u8]| {
    let store = commands::standard_schema_store();
    for code in [
        commands::PING,
        commands::ECHO,
        commands::FS_TREE_GET,
        commands::FS_TREE_RSP,
        commands::FS_SNAP_GET,
        commands::FILE_BEGIN,
        commands::FILE_CHUNK,
        commands::FILE_END,
    ] {
        if let Some(def) = store.get(code) {
            let _ = decode_payload(&def, data);
        }
    }
});
