//! The schema-less record model.
//!
//! A decoded protobuf message is represented as an ordered [`RecordSequence`]
//! of [`Record`]s, one per wire-format field, in the order they appeared on
//! the wire. Group nesting is stored inline: a group is a `GroupStart`
//! record, followed by the nested records, followed by a matching `GroupEnd`.
//!
//! The payload of each record is a tagged union ([`Value`]) so the concrete
//! type carried by a record is always known from its variant, never from a
//! runtime downcast.

use crate::error::Error;
use crate::wire::WireType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of payload a record carries.
///
/// This is the [`Value`] discriminant without the payload itself, used
/// wherever only the shape of a record matters (text representations,
/// fuzz candidate generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Variable-length integer payload
    Varint,
    /// 32-bit fixed-width payload
    Fixed32,
    /// 64-bit fixed-width payload
    Fixed64,
    /// Length-delimited payload classified as printable text
    #[serde(rename = "string")]
    Str,
    /// Length-delimited payload classified as raw bytes
    Bytes,
    /// Group start marker (no payload)
    GroupStart,
    /// Group end marker (no payload)
    GroupEnd,
}

impl RecordKind {
    /// Returns the lowercase name used in textual representations
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Varint => "varint",
            RecordKind::Fixed32 => "fixed32",
            RecordKind::Fixed64 => "fixed64",
            RecordKind::Str => "string",
            RecordKind::Bytes => "bytes",
            RecordKind::GroupStart => "group_start",
            RecordKind::GroupEnd => "group_end",
        }
    }

    /// Returns true for the group delimiter kinds, which carry no payload
    pub fn is_group_marker(&self) -> bool {
        matches!(self, RecordKind::GroupStart | RecordKind::GroupEnd)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record payload.
///
/// One variant per wire shape the decoder can produce. `Str` vs `Bytes` is
/// a display heuristic over length-delimited payloads and does not affect
/// re-encoding: both emit the same length-prefixed wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Unsigned 64-bit integer from a varint field
    Varint(u64),
    /// 32-bit integer from a fixed32 field
    Fixed32(u32),
    /// 64-bit integer from a fixed64 field
    Fixed64(u64),
    /// Printable text from a length-delimited field
    Str(String),
    /// Raw bytes from a length-delimited field
    Bytes(Vec<u8>),
    /// Group start marker
    GroupStart,
    /// Group end marker
    GroupEnd,
}

impl Value {
    /// Returns the kind discriminant for this payload
    pub fn kind(&self) -> RecordKind {
        match self {
            Value::Varint(_) => RecordKind::Varint,
            Value::Fixed32(_) => RecordKind::Fixed32,
            Value::Fixed64(_) => RecordKind::Fixed64,
            Value::Str(_) => RecordKind::Str,
            Value::Bytes(_) => RecordKind::Bytes,
            Value::GroupStart => RecordKind::GroupStart,
            Value::GroupEnd => RecordKind::GroupEnd,
        }
    }

    /// Returns the wire type this payload re-encodes as
    pub fn wire_type(&self) -> WireType {
        match self {
            Value::Varint(_) => WireType::Varint,
            Value::Fixed32(_) => WireType::I32,
            Value::Fixed64(_) => WireType::I64,
            Value::Str(_) | Value::Bytes(_) => WireType::Len,
            Value::GroupStart => WireType::StartGroup,
            Value::GroupEnd => WireType::EndGroup,
        }
    }
}

/// A single wire-format field occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The field number from the tag
    pub field_number: u32,
    /// The decoded payload
    pub value: Value,
}

impl Record {
    /// Creates a new record
    pub fn new(field_number: u32, value: Value) -> Self {
        Self {
            field_number,
            value,
        }
    }

    /// Returns the kind discriminant of this record's payload
    pub fn kind(&self) -> RecordKind {
        self.value.kind()
    }
}

/// An ordered sequence of records with a sticky decode error slot.
///
/// Produced by one of the `from_*` constructors or built empty and pushed
/// into. The first decode failure is captured in `last_error` and never
/// auto-cleared; records parsed before the failure are retained.
///
/// # Example
///
/// ```
/// use rawpb_core::RecordSequence;
///
/// // field 1, varint, value 150
/// let seq = RecordSequence::from_bytes(&[0x08, 0x96, 0x01]);
/// assert!(seq.error().is_none());
/// assert_eq!(seq.len(), 1);
/// assert_eq!(seq.to_bytes(), vec![0x08, 0x96, 0x01]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordSequence {
    records: Vec<Record>,
    last_error: Option<Error>,
}

impl RecordSequence {
    /// Creates an empty sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequence from pre-built records
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records,
            last_error: None,
        }
    }

    /// Appends a record to the sequence
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Returns the records in wire order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns mutable access to the records, for in-place editing
    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Returns the number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the sequence holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns every record with the given field number, in wire order.
    ///
    /// This is a flat scan over the inline list, so records inside groups
    /// are visited too.
    pub fn find(&self, field_number: u32) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| r.field_number == field_number)
            .collect()
    }

    /// Returns the sticky decode error, if any
    pub fn error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Records a decode error. The slot is sticky: only the first error
    /// per sequence is kept.
    pub(crate) fn set_error(&mut self, err: Error) {
        if self.last_error.is_none() {
            self.last_error = Some(err);
        }
    }

    /// Decodes a sequence from raw wire bytes.
    ///
    /// Never fails outright: a malformed buffer yields a sequence whose
    /// [`error`](Self::error) is set and whose records are whatever was
    /// parsed before the failure.
    pub fn from_bytes(data: &[u8]) -> Self {
        crate::wire::decode(data)
    }

    /// Decodes a sequence from a hex string
    pub fn from_hex(hex: &str) -> Self {
        crate::text::from_hex(hex)
    }

    /// Restores a sequence from its JSON representation
    pub fn from_json(text: &str) -> Self {
        crate::text::from_json(text)
    }

    /// Restores a sequence from its YAML representation
    pub fn from_yaml(text: &str) -> Self {
        crate::text::from_yaml(text)
    }

    /// Re-encodes the sequence to wire bytes.
    ///
    /// Encoding is a pure projection and cannot fail on a well-formed
    /// sequence.
    pub fn to_bytes(&self) -> Vec<u8> {
        crate::wire::encode(self)
    }

    /// Re-encodes the sequence and renders the bytes as lowercase hex
    pub fn to_hex(&self) -> String {
        crate::text::to_hex(self)
    }

    /// Serializes the sequence to JSON (GroupEnd records omitted)
    pub fn to_json(&self) -> crate::error::Result<String> {
        crate::text::to_json(self)
    }

    /// Serializes the sequence to YAML (GroupEnd records omitted)
    pub fn to_yaml(&self) -> crate::error::Result<String> {
        crate::text::to_yaml(self)
    }
}
