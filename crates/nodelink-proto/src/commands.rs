//! Standard, reserved command codes and their payload schemas.
//!
//! These are always available regardless of what a deployment's schema
//! documents add, since every slave must answer `PING` and participate in
//! file transfer.

use crate::schema::{CommandDef, FieldDef, FieldType, SchemaStore};

/// Liveness probe; no payload.
pub const PING: u16 = 0x0001;
/// Liveness response; no payload.
pub const PONG: u16 = 0x0002;
/// Echoes its payload back verbatim.
pub const ECHO: u16 = 0x0101;
/// Request a directory tree listing.
pub const FS_TREE_GET: u16 = 0x1205;
/// Directory tree listing response.
pub const FS_TREE_RSP: u16 = 0x1206;
/// Request a directory tree snapshot written to a file.
pub const FS_SNAP_GET: u16 = 0x1213;
/// Begin a chunked file transfer.
pub const FILE_BEGIN: u16 = 0x2001;
/// One chunk of an in-progress file transfer.
pub const FILE_CHUNK: u16 = 0x2002;
/// End a file transfer and trigger digest verification.
pub const FILE_END: u16 = 0x2003;

fn field(name: &str, field_type: FieldType) -> FieldDef {
    FieldDef { name: name.to_owned(), field_type }
}

/// The full list of standard command definitions.
#[must_use]
pub fn standard_commands() -> Vec<CommandDef> {
    vec![
        CommandDef { code: PING, name: "PING".to_owned(), fields: vec![] },
        CommandDef { code: PONG, name: "PONG".to_owned(), fields: vec![] },
        CommandDef { code: ECHO, name: "ECHO".to_owned(), fields: vec![field("data", FieldType::BytesRest)] },
        CommandDef {
            code: FS_TREE_GET,
            name: "FS_TREE_GET".to_owned(),
            fields: vec![
                field("path", FieldType::StrU16Len),
                field("max_depth", FieldType::U16),
                field("include_size", FieldType::U8),
            ],
        },
        CommandDef {
            code: FS_TREE_RSP,
            name: "FS_TREE_RSP".to_owned(),
            fields: vec![field("path", FieldType::StrU16Len), field("tree", FieldType::StrU16Len)],
        },
        CommandDef {
            code: FS_SNAP_GET,
            name: "FS_SNAP_GET".to_owned(),
            fields: vec![
                field("path", FieldType::StrU16Len),
                field("out_path", FieldType::StrU16Len),
                field("max_depth", FieldType::U16),
                field("include_size", FieldType::U8),
            ],
        },
        CommandDef {
            code: FILE_BEGIN,
            name: "FILE_BEGIN".to_owned(),
            fields: vec![
                field("dst_addr", FieldType::U16),
                field("file_id", FieldType::U32),
                field("total_size", FieldType::U32),
                field("chunk_size", FieldType::U16),
                field("sha256", FieldType::BytesFixed(32)),
                field("path", FieldType::StrU16Len),
            ],
        },
        CommandDef {
            code: FILE_CHUNK,
            name: "FILE_CHUNK".to_owned(),
            fields: vec![
                field("dst_addr", FieldType::U16),
                field("file_id", FieldType::U32),
                field("offset", FieldType::U32),
                field("data", FieldType::BytesRest),
            ],
        },
        CommandDef {
            code: FILE_END,
            name: "FILE_END".to_owned(),
            fields: vec![field("dst_addr", FieldType::U16), field("file_id", FieldType::U32)],
        },
    ]
}

/// Build a [`SchemaStore`] pre-populated with the standard commands.
///
/// Deployment-specific schema documents loaded afterwards via
/// [`SchemaStore::load_dir`] may override any of these by command code.
#[must_use]
pub fn standard_schema_store() -> SchemaStore {
    let mut store = SchemaStore::new();
    for def in standard_commands() {
        store.insert(def);
    }
    store
}
