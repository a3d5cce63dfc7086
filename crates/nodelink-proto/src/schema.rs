//! Schema-driven payload codec.
//!
//! Command definitions are data, not classes: a single encode/decode walks
//! an ordered field list loaded from external JSON documents. Adding a new
//! command is a configuration change, never a code change.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;

use crate::errors::SchemaError;

/// A field type drawn from the closed set the wire protocol supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Single unsigned byte.
    U8,
    /// Little-endian 16-bit unsigned integer.
    U16,
    /// Little-endian 32-bit unsigned integer.
    U32,
    /// Little-endian 16-bit signed integer.
    I16,
    /// Little-endian 32-bit signed integer.
    I32,
    /// `u16` UTF-8 byte length prefix followed by the string bytes.
    StrU16Len,
    /// Exactly `n` raw bytes.
    BytesFixed(usize),
    /// All remaining bytes in the payload.
    BytesRest,
}

impl FieldType {
    fn parse(raw: &str, len: Option<usize>) -> Result<Self, SchemaError> {
        match raw {
            "u8" => Ok(Self::U8),
            "u16" => Ok(Self::U16),
            "u32" => Ok(Self::U32),
            "i16" => Ok(Self::I16),
            "i32" => Ok(Self::I32),
            "str_u16len" => Ok(Self::StrU16Len),
            "bytes_fixed" => Ok(Self::BytesFixed(len.ok_or_else(|| {
                SchemaError::UnknownFieldType("bytes_fixed without len".to_owned())
            })?)),
            "bytes_rest" => Ok(Self::BytesRest),
            other => Err(SchemaError::UnknownFieldType(other.to_owned())),
        }
    }
}

/// One field in a command's ordered payload layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name, used as the key in decoded payload maps.
    pub name: String,
    /// Field's wire type.
    pub field_type: FieldType,
}

/// A command's code, human name, and ordered payload layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDef {
    /// Numeric command code.
    pub code: u16,
    /// Human-readable command name.
    pub name: String,
    /// Ordered list of payload fields.
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    cmds: Vec<RawCommand>,
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    cmd: String,
    name: String,
    #[serde(default)]
    payload: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    len: Option<usize>,
}

/// Parse a command code string in either decimal or `0x`-prefixed hex form.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownFieldType`] if the string cannot be parsed
/// as an integer in either form.
pub fn cmd_str_to_int(raw: &str) -> Result<u16, SchemaError> {
    let trimmed = raw.trim().to_lowercase();
    let parsed = if let Some(hex) = trimmed.strip_prefix("0x") {
        u16::from_str_radix(hex, 16)
    } else {
        trimmed.parse::<u16>()
    };
    parsed.map_err(|_| SchemaError::UnknownFieldType(format!("invalid command code `{raw}`")))
}

/// Registry of command definitions keyed by command code, loaded from a
/// directory of JSON documents.
#[derive(Debug, Default, Clone)]
pub struct SchemaStore {
    commands: HashMap<u16, Arc<CommandDef>>,
}

impl SchemaStore {
    /// Empty store with no commands registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` document in `dir`, in sorted filename order.
    ///
    /// Later documents override earlier ones for duplicate command codes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DocumentIo`] if the directory or a document
    /// cannot be read, or [`SchemaError::DocumentParse`]/
    /// [`SchemaError::UnknownFieldType`] if a document is malformed.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<(), SchemaError> {
        let dir = dir.as_ref();
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| SchemaError::DocumentIo { path: dir.display().to_string(), reason: e.to_string() })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        entries.sort();
        for path in entries {
            self.load_file(&path)?;
        }
        Ok(())
    }

    /// Load a single JSON schema document, merging its commands into this
    /// store.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DocumentIo`] if the file cannot be read, or
    /// [`SchemaError::DocumentParse`]/[`SchemaError::UnknownFieldType`] if
    /// its contents are malformed.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), SchemaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| SchemaError::DocumentIo { path: path.display().to_string(), reason: e.to_string() })?;
        if contents.trim().is_empty() {
            return Ok(());
        }
        let doc: RawDocument = serde_json::from_str(&contents)
            .map_err(|e| SchemaError::DocumentParse { path: path.display().to_string(), reason: e.to_string() })?;
        for raw in doc.cmds {
            let code = cmd_str_to_int(&raw.cmd)?;
            let fields = raw
                .payload
                .into_iter()
                .map(|f| {
                    FieldType::parse(&f.field_type, f.len).map(|field_type| FieldDef { name: f.name, field_type })
                })
                .collect::<Result<Vec<_>, _>>()?;
            self.commands.insert(code, Arc::new(CommandDef { code, name: raw.name, fields }));
        }
        Ok(())
    }

    /// Look up a command definition by code.
    #[must_use]
    pub fn get(&self, code: u16) -> Option<Arc<CommandDef>> {
        self.commands.get(&code).cloned()
    }

    /// Register a command definition directly (used by the standard command
    /// table and by tests that do not load from disk).
    pub fn insert(&mut self, def: CommandDef) {
        self.commands.insert(def.code, Arc::new(def));
    }

    /// Number of distinct command codes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the store has no registered commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A decoded scalar or byte-string payload field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Decoded `u8`.
    U8(u8),
    /// Decoded `u16`.
    U16(u16),
    /// Decoded `u32`.
    U32(u32),
    /// Decoded `i16`.
    I16(i16),
    /// Decoded `i32`.
    I32(i32),
    /// Decoded length-prefixed string.
    Str(String),
    /// Decoded fixed-length byte string.
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// View this value as `u32`, widening any narrower unsigned integer.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Self::U8(v) => Some(u32::from(v)),
            Self::U16(v) => Some(u32::from(v)),
            Self::U32(v) => Some(v),
            _ => None,
        }
    }

    /// View this value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// View this value as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// A decoded payload: the command it belongs to plus named field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    /// Command code this payload was decoded against.
    pub code: u16,
    /// Ordered `(name, value)` pairs, in schema field order.
    pub fields: Vec<(String, FieldValue)>,
}

impl DecodedPayload {
    /// Look up a decoded field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

struct BufferReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufferReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read(&mut self, n: usize, cmd: u16, field: &str) -> Result<&'a [u8], SchemaError> {
        if self.pos + n > self.data.len() {
            return Err(SchemaError::Underflow { cmd, field: field.to_owned() });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }
}

/// Decode `payload` according to `def`'s ordered field list.
///
/// # Errors
///
/// Returns [`SchemaError::Underflow`] if the payload is shorter than the
/// schema requires, or [`SchemaError::InvalidUtf8`] if a `str_u16len` field
/// is not valid UTF-8.
pub fn decode_payload(def: &CommandDef, payload: &[u8]) -> Result<DecodedPayload, SchemaError> {
    let mut reader = BufferReader::new(payload);
    let mut fields = Vec::with_capacity(def.fields.len());
    for field in &def.fields {
        let value = match &field.field_type {
            FieldType::U8 => FieldValue::U8(reader.read(1, def.code, &field.name)?[0]),
            FieldType::U16 => {
                let b = reader.read(2, def.code, &field.name)?;
                FieldValue::U16(u16::from_le_bytes([b[0], b[1]]))
            },
            FieldType::U32 => {
                let b = reader.read(4, def.code, &field.name)?;
                FieldValue::U32(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            },
            FieldType::I16 => {
                let b = reader.read(2, def.code, &field.name)?;
                FieldValue::I16(i16::from_le_bytes([b[0], b[1]]))
            },
            FieldType::I32 => {
                let b = reader.read(4, def.code, &field.name)?;
                FieldValue::I32(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            },
            FieldType::StrU16Len => {
                let len_bytes = reader.read(2, def.code, &field.name)?;
                let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
                let raw = reader.read(len, def.code, &field.name)?;
                let s = std::str::from_utf8(raw)
                    .map_err(|_| SchemaError::InvalidUtf8 { cmd: def.code, field: field.name.clone() })?;
                FieldValue::Str(s.to_owned())
            },
            FieldType::BytesFixed(n) => FieldValue::Bytes(reader.read(*n, def.code, &field.name)?.to_vec()),
            FieldType::BytesRest => FieldValue::Bytes(reader.take_rest().to_vec()),
        };
        fields.push((field.name.clone(), value));
    }
    Ok(DecodedPayload { code: def.code, fields })
}

/// Encode `values` into a payload byte buffer according to `def`'s ordered
/// field list. Missing values encode as the zero value for scalars, empty
/// bytes for byte fields, and empty string for `str_u16len`.
///
/// # Errors
///
/// Returns [`SchemaError::FixedLengthMismatch`] if a supplied `bytes_fixed`
/// value is not exactly the declared length.
pub fn encode_payload(def: &CommandDef, values: &[(String, FieldValue)]) -> Result<Vec<u8>, SchemaError> {
    let mut out = Vec::new();
    let lookup = |name: &str| values.iter().find(|(n, _)| n == name).map(|(_, v)| v);
    for field in &def.fields {
        let value = lookup(&field.name);
        match &field.field_type {
            FieldType::U8 => out.push(value.and_then(FieldValue::as_u32).unwrap_or(0) as u8),
            FieldType::U16 => out.extend_from_slice(&(value.and_then(FieldValue::as_u32).unwrap_or(0) as u16).to_le_bytes()),
            FieldType::U32 => out.extend_from_slice(&value.and_then(FieldValue::as_u32).unwrap_or(0).to_le_bytes()),
            FieldType::I16 => {
                let v = match value {
                    Some(FieldValue::I16(v)) => *v,
                    _ => 0,
                };
                out.extend_from_slice(&v.to_le_bytes());
            },
            FieldType::I32 => {
                let v = match value {
                    Some(FieldValue::I32(v)) => *v,
                    _ => 0,
                };
                out.extend_from_slice(&v.to_le_bytes());
            },
            FieldType::StrU16Len => {
                let s = value.and_then(FieldValue::as_str).unwrap_or("");
                out.extend_from_slice(&(s.len() as u16).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            },
            FieldType::BytesFixed(n) => {
                let b = value.and_then(FieldValue::as_bytes).unwrap_or(&[]);
                if b.len() != *n {
                    return Err(SchemaError::FixedLengthMismatch {
                        field: field.name.clone(),
                        expected: *n,
                        actual: b.len(),
                    });
                }
                out.extend_from_slice(b);
            },
            FieldType::BytesRest => out.extend_from_slice(value.and_then(FieldValue::as_bytes).unwrap_or(&[])),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_def() -> CommandDef {
        CommandDef {
            code: 0x0101,
            name: "ECHO".to_owned(),
            fields: vec![FieldDef { name: "data".to_owned(), field_type: FieldType::BytesRest }],
        }
    }

    #[test]
    fn decode_then_encode_round_trips() {
        let def = echo_def();
        let decoded = decode_payload(&def, b"hello").expect("decodes");
        assert_eq!(decoded.get("data").and_then(FieldValue::as_bytes), Some(b"hello".as_slice()));
        let encoded = encode_payload(&def, &decoded.fields).expect("encodes");
        assert_eq!(encoded, b"hello");
    }

    #[test]
    fn underflow_on_short_fixed_field() {
        let def = CommandDef {
            code: 0x2001,
            name: "FILE_BEGIN".to_owned(),
            fields: vec![FieldDef { name: "sha256".to_owned(), field_type: FieldType::BytesFixed(32) }],
        };
        let err = decode_payload(&def, &[0u8; 10]).unwrap_err();
        assert_eq!(err, SchemaError::Underflow { cmd: 0x2001, field: "sha256".to_owned() });
    }

    #[test]
    fn cmd_str_parses_hex_and_decimal() {
        assert_eq!(cmd_str_to_int("0x1205").unwrap(), 0x1205);
        assert_eq!(cmd_str_to_int("257").unwrap(), 257);
    }

    #[test]
    fn unknown_field_type_rejected_at_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"cmds":[{"cmd":"0x0001","name":"X","payload":[{"name":"f","type":"nonsense"}]}]}"#)
            .expect("write");
        let mut store = SchemaStore::new();
        assert!(matches!(store.load_file(&path), Err(SchemaError::UnknownFieldType(_))));
    }

    #[test]
    fn later_document_overrides_earlier_by_sorted_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("a_base.json"),
            r#"{"cmds":[{"cmd":"0x0001","name":"OLD","payload":[]}]}"#,
        )
        .expect("write");
        std::fs::write(
            dir.path().join("b_override.json"),
            r#"{"cmds":[{"cmd":"0x0001","name":"NEW","payload":[]}]}"#,
        )
        .expect("write");
        let mut store = SchemaStore::new();
        store.load_dir(dir.path()).expect("loads");
        assert_eq!(store.get(0x0001).expect("present").name, "NEW");
    }
}
