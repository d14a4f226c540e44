//! Wire encoding: [`RecordSequence`] back to bytes.
//!
//! Encoding is a pure projection over the record list. Every record knows
//! its wire type from its payload variant, so there is no failure path:
//! a well-formed sequence always re-encodes, and byte-for-byte identically
//! to the input it was decoded from.

use crate::record::{RecordSequence, Value};
use crate::wire::{encode_varint, make_tag};
use bytes::BufMut;

/// Re-encodes a record sequence to wire bytes.
pub fn encode(seq: &RecordSequence) -> Vec<u8> {
    let mut buf = Vec::with_capacity(seq.len() * 4);

    for record in seq.records() {
        encode_varint(make_tag(record.field_number, record.value.wire_type()), &mut buf);

        match &record.value {
            Value::Varint(v) => encode_varint(*v, &mut buf),
            Value::Fixed32(v) => buf.put_u32_le(*v),
            Value::Fixed64(v) => buf.put_u64_le(*v),
            Value::Str(s) => {
                encode_varint(s.len() as u64, &mut buf);
                buf.put_slice(s.as_bytes());
            }
            Value::Bytes(b) => {
                encode_varint(b.len() as u64, &mut buf);
                buf.put_slice(b);
            }
            // Group markers are tag-only
            Value::GroupStart | Value::GroupEnd => {}
        }
    }

    buf
}
