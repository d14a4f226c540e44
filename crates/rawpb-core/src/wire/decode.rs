//! Schema-less wire decoding: bytes to [`RecordSequence`].
//!
//! The decoder walks the buffer tag by tag without consulting any schema.
//! Group nesting is tracked with an explicit stack of open-group field
//! numbers rather than recursion, so attacker-controlled nesting depth
//! cannot overflow the call stack.
//!
//! The first malformed tag, length, or truncated payload stops the walk;
//! the error is captured sticky on the sequence and every record decoded
//! up to that point is kept.

use crate::error::{Error, Result};
use crate::record::{Record, RecordSequence, Value};
use crate::wire::{decode_varint, split_tag, WireType, MAX_FIELD_NUMBER};
use tracing::{debug, trace};

/// Decodes raw wire bytes into a record sequence.
///
/// Never fails outright; see the module docs for error capture semantics.
pub fn decode(data: &[u8]) -> RecordSequence {
    let mut seq = RecordSequence::new();
    // Field numbers of currently open groups, innermost last
    let mut open_groups: Vec<u32> = Vec::new();
    let mut pos = 0;

    debug!("decoding {} bytes", data.len());

    while pos < data.len() {
        match decode_record(data, pos) {
            Ok((record, consumed)) => {
                trace!(
                    "record at offset {}: field {} {}",
                    pos,
                    record.field_number,
                    record.kind()
                );

                match record.value {
                    Value::GroupStart => open_groups.push(record.field_number),
                    Value::GroupEnd => match open_groups.pop() {
                        Some(open) if open == record.field_number => {}
                        Some(open) => {
                            seq.set_error(Error::malformed_wire(
                                pos,
                                format!(
                                    "end-group tag for field {} does not close open group {}",
                                    record.field_number, open
                                ),
                            ));
                            return seq;
                        }
                        None => {
                            seq.set_error(Error::malformed_wire(
                                pos,
                                format!(
                                    "end-group tag for field {} with no open group",
                                    record.field_number
                                ),
                            ));
                            return seq;
                        }
                    },
                    _ => {}
                }

                seq.push(record);
                pos += consumed;
            }
            Err(e) => {
                debug!("decode stopped at offset {}: {}", pos, e);
                seq.set_error(e);
                return seq;
            }
        }
    }

    if let Some(open) = open_groups.last() {
        seq.set_error(Error::malformed_wire(
            data.len(),
            format!("input ended with group {} still open", open),
        ));
    }

    seq
}

/// Decodes a single record starting at `pos`.
///
/// Returns the record and the total bytes consumed (tag plus payload).
fn decode_record(data: &[u8], pos: usize) -> Result<(Record, usize)> {
    let (tag, tag_len) =
        decode_varint(&data[pos..]).map_err(|_| Error::varint_decode(pos))?;
    let (field_number, wire_bits) = split_tag(tag);

    let wire_type = WireType::try_from(wire_bits)
        .map_err(|_| Error::unsupported_wire_type(wire_bits, pos))?;

    if field_number == 0 || field_number > MAX_FIELD_NUMBER {
        return Err(Error::InvalidFieldNumber {
            number: field_number,
            max: MAX_FIELD_NUMBER,
        });
    }

    let payload_start = pos + tag_len;
    let remaining = &data[payload_start..];

    let (value, payload_len) = match wire_type {
        WireType::Varint => {
            let (v, len) = decode_varint(remaining)
                .map_err(|_| Error::malformed_wire(payload_start, "truncated varint payload"))?;
            (Value::Varint(v), len)
        }
        WireType::I32 => {
            let bytes: [u8; 4] = remaining
                .get(..4)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| {
                    Error::malformed_wire(payload_start, "not enough bytes for fixed32")
                })?;
            (Value::Fixed32(u32::from_le_bytes(bytes)), 4)
        }
        WireType::I64 => {
            let bytes: [u8; 8] = remaining
                .get(..8)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| {
                    Error::malformed_wire(payload_start, "not enough bytes for fixed64")
                })?;
            (Value::Fixed64(u64::from_le_bytes(bytes)), 8)
        }
        WireType::Len => {
            let (length, length_len) = decode_varint(remaining)
                .map_err(|_| Error::malformed_wire(payload_start, "truncated length prefix"))?;
            let length = usize::try_from(length).map_err(|_| {
                Error::malformed_wire(payload_start, "length prefix exceeds addressable size")
            })?;
            let end = length_len.checked_add(length).ok_or_else(|| {
                Error::malformed_wire(payload_start, "length prefix exceeds addressable size")
            })?;
            let payload = remaining.get(length_len..end).ok_or_else(|| {
                Error::malformed_wire(
                    payload_start,
                    format!(
                        "length prefix {} exceeds remaining buffer ({} bytes)",
                        length,
                        remaining.len().saturating_sub(length_len)
                    ),
                )
            })?;
            (classify_payload(payload), length_len + length)
        }
        WireType::StartGroup => (Value::GroupStart, 0),
        WireType::EndGroup => (Value::GroupEnd, 0),
    };

    Ok((Record::new(field_number, value), tag_len + payload_len))
}

/// Classifies a length-delimited payload as printable text or raw bytes.
///
/// A payload is text iff it is valid UTF-8 and every char is either
/// non-control or one of `\n` / `\r`. This is a display heuristic only;
/// both classifications re-encode identically.
fn classify_payload(payload: &[u8]) -> Value {
    match std::str::from_utf8(payload) {
        Ok(s) if s.chars().all(|c| !c.is_control() || c == '\n' || c == '\r') => {
            Value::Str(s.to_string())
        }
        _ => Value::Bytes(payload.to_vec()),
    }
}
