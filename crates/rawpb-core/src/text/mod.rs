//! Textual representations of a [`RecordSequence`].
//!
//! Four surfaces, all layered on the wire codec:
//!
//! - **JSON** and **YAML**: an editable record list. GroupEnd records are
//!   omitted on export (they are reconstructable) and synthesized on import
//!   by discharging the still-open GroupStarts, in reverse open order, at
//!   the end of the pass. This append-at-end policy is deliberately simple:
//!   a group that ends before the last record will absorb the records that
//!   followed it on re-import.
//! - **Hex**: the wire bytes as a hex string, for copy-pasting dumps.
//! - **Pretty** (the sequence's `Display` impl): one line per top-level
//!   record, groups rendered as brackets with comma-joined contents.
//!
//! Value payloads cross JSON and YAML through a generic `serde_json::Value`
//! node, because the concrete integer width is only known once the record's
//! `kind` is known; numbers that arrive as floats are re-narrowed to the
//! kind's width.

mod radix;

use crate::error::{Error, Result};
use crate::record::{Record, RecordKind, RecordSequence, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Node;
use std::fmt;

pub(crate) use radix::{hex_decode, hex_encode};

/// One record as it appears in JSON/YAML
#[derive(Debug, Serialize, Deserialize)]
struct RecordRepr {
    field: u32,
    kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Node>,
}

/// Serializes a sequence to JSON, omitting GroupEnd records
pub(crate) fn to_json(seq: &RecordSequence) -> Result<String> {
    serde_json::to_string(&to_reprs(seq)).map_err(|e| Error::text_format("JSON", e))
}

/// Serializes a sequence to YAML, omitting GroupEnd records
pub(crate) fn to_yaml(seq: &RecordSequence) -> Result<String> {
    serde_yaml::to_string(&to_reprs(seq)).map_err(|e| Error::text_format("YAML", e))
}

/// Restores a sequence from JSON. Parse failures are captured on the
/// returned sequence, not raised.
pub(crate) fn from_json(text: &str) -> RecordSequence {
    capture(
        serde_json::from_str::<Vec<RecordRepr>>(text)
            .map_err(|e| Error::text_format("JSON", e))
            .and_then(|reprs| from_reprs(reprs, "JSON")),
    )
}

/// Restores a sequence from YAML. Parse failures are captured on the
/// returned sequence, not raised.
pub(crate) fn from_yaml(text: &str) -> RecordSequence {
    capture(
        serde_yaml::from_str::<Vec<RecordRepr>>(text)
            .map_err(|e| Error::text_format("YAML", e))
            .and_then(|reprs| from_reprs(reprs, "YAML")),
    )
}

/// Renders a sequence's wire bytes as lowercase hex
pub(crate) fn to_hex(seq: &RecordSequence) -> String {
    hex_encode(&crate::wire::encode(seq))
}

/// Decodes a sequence from a hex string. Hex errors are captured on the
/// returned sequence, not raised.
pub(crate) fn from_hex(hex: &str) -> RecordSequence {
    match hex_decode(hex) {
        Ok(bytes) => crate::wire::decode(&bytes),
        Err(e) => capture(Err(e)),
    }
}

fn capture(result: Result<RecordSequence>) -> RecordSequence {
    result.unwrap_or_else(|e| {
        let mut seq = RecordSequence::new();
        seq.set_error(e);
        seq
    })
}

fn to_reprs(seq: &RecordSequence) -> Vec<RecordRepr> {
    seq.records()
        .iter()
        .filter(|r| r.kind() != RecordKind::GroupEnd)
        .map(|r| RecordRepr {
            field: r.field_number,
            kind: r.kind(),
            value: match &r.value {
                Value::Varint(v) | Value::Fixed64(v) => Some(Node::from(*v)),
                Value::Fixed32(v) => Some(Node::from(*v)),
                Value::Str(s) => Some(Node::from(s.as_str())),
                Value::Bytes(b) => Some(Node::from(radix::base64_encode(b))),
                Value::GroupStart | Value::GroupEnd => None,
            },
        })
        .collect()
}

fn from_reprs(reprs: Vec<RecordRepr>, format: &'static str) -> Result<RecordSequence> {
    let mut records = Vec::with_capacity(reprs.len());
    // Field numbers of groups opened but not explicitly closed, in open order
    let mut open_groups: Vec<u32> = Vec::new();

    for repr in reprs {
        let record = restore_record(repr, format)?;
        match record.value {
            Value::GroupStart => open_groups.push(record.field_number),
            // Explicit end entries close the most recently opened group
            Value::GroupEnd => {
                open_groups.pop();
            }
            _ => {}
        }
        records.push(record);
    }

    // Discharge the open-group stack: one synthesized GroupEnd per
    // GroupStart, appended in reverse open order.
    for field in open_groups.into_iter().rev() {
        records.push(Record::new(field, Value::GroupEnd));
    }

    Ok(RecordSequence::with_records(records))
}

fn restore_record(repr: RecordRepr, format: &'static str) -> Result<Record> {
    let RecordRepr { field, kind, value } = repr;

    let value = match kind {
        RecordKind::Varint => Value::Varint(restore_u64(field, &value, format)?),
        RecordKind::Fixed64 => Value::Fixed64(restore_u64(field, &value, format)?),
        RecordKind::Fixed32 => Value::Fixed32(restore_u64(field, &value, format)? as u32),
        RecordKind::Str => Value::Str(restore_str(field, &value, format)?.to_string()),
        RecordKind::Bytes => Value::Bytes(radix::base64_decode(restore_str(
            field, &value, format,
        )?)?),
        RecordKind::GroupStart => Value::GroupStart,
        RecordKind::GroupEnd => Value::GroupEnd,
    };

    Ok(Record::new(field, value))
}

/// Re-narrows a numeric node to u64, accepting integers or floats
fn restore_u64(field: u32, node: &Option<Node>, format: &'static str) -> Result<u64> {
    node.as_ref()
        .and_then(|n| n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)))
        .ok_or_else(|| {
            Error::text_format(
                format,
                format!("record for field {field} is missing a numeric value"),
            )
        })
}

fn restore_str<'a>(
    field: u32,
    node: &'a Option<Node>,
    format: &'static str,
) -> Result<&'a str> {
    node.as_ref().and_then(|n| n.as_str()).ok_or_else(|| {
        Error::text_format(
            format,
            format!("record for field {field} is missing a string value"),
        )
    })
}

impl fmt::Display for RecordSequence {
    /// One line per top-level record; group contents are comma-joined
    /// between bracket tokens.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0usize;
        let mut first_in_group = true;

        for record in self.records() {
            match &record.value {
                Value::GroupStart => {
                    write_separator(f, depth, first_in_group)?;
                    write!(f, "{}: {{", record.field_number)?;
                    depth += 1;
                    first_in_group = true;
                }
                Value::GroupEnd => {
                    write!(f, " }}")?;
                    depth = depth.saturating_sub(1);
                    first_in_group = false;
                    if depth == 0 {
                        writeln!(f)?;
                    }
                }
                value => {
                    write_separator(f, depth, first_in_group)?;
                    write!(f, "{}: ", record.field_number)?;
                    write_payload(f, value)?;
                    first_in_group = false;
                    if depth == 0 {
                        writeln!(f)?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn write_separator(f: &mut fmt::Formatter<'_>, depth: usize, first: bool) -> fmt::Result {
    if depth > 0 {
        f.write_str(if first { " " } else { ", " })?;
    }
    Ok(())
}

fn write_payload(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Varint(v) => write!(f, "varint({v})"),
        Value::Fixed32(v) => write!(f, "fixed32({v})"),
        Value::Fixed64(v) => write!(f, "fixed64({v})"),
        Value::Str(s) => write!(f, "string({s:?})"),
        Value::Bytes(b) => write!(f, "bytes({})", hex_encode(b)),
        Value::GroupStart | Value::GroupEnd => Ok(()),
    }
}
