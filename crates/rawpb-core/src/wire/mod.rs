//! Protobuf wire-format primitives.
//!
//! This module implements the tag and varint layer shared by the decoder
//! and encoder, plus the schema-less decode/encode passes themselves.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 3: SGROUP (deprecated group start)
//! - 4: EGROUP (deprecated group end)
//! - 5: I32 (fixed32, sfixed32, float)
//!
//! No schema is consulted anywhere in this module: field numbers and wire
//! types are taken at face value from the byte stream.

mod decode;
mod encode;

use crate::error::{Error, Result};

pub use decode::decode;
pub use encode::encode;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    I32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::I32),
            _ => Err(Error::unsupported_wire_type(value, 0)),
        }
    }
}

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// Decode a varint from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= 10 {
            // Varints are at most 10 bytes for a 64-bit value
            return Err(Error::varint_decode(i));
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::varint_decode(data.len()))
}

/// Encode a value as a varint, appending to the buffer.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Compose a tag varint value from a field number and wire type.
pub fn make_tag(field_number: u32, wire_type: WireType) -> u64 {
    ((field_number as u64) << 3) | (wire_type as u64)
}

/// Split a tag varint value into its field number and wire-type bits.
///
/// The wire-type bits are returned raw; use [`WireType::try_from`] to
/// validate them.
pub fn split_tag(tag: u64) -> (u32, u8) {
    ((tag >> 3) as u32, (tag & 0x07) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_varint_single_byte() {
        let data = [0x08]; // Value 8
        let (value, len) = decode_varint(&data).unwrap();
        assert_eq!(value, 8);
        assert_eq!(len, 1);
    }

    #[test]
    fn test_decode_varint_multi_byte() {
        let data = [0xAC, 0x02]; // Value 300
        let (value, len) = decode_varint(&data).unwrap();
        assert_eq!(value, 300);
        assert_eq!(len, 2);
    }

    #[test]
    fn test_decode_varint_max() {
        // Maximum 64-bit varint (all 1s)
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let (value, len) = decode_varint(&data).unwrap();
        assert_eq!(value, u64::MAX);
        assert_eq!(len, 10);
    }

    #[test]
    fn test_decode_varint_overlong() {
        // 11 continuation bytes never terminate a valid varint
        let data = [0x80; 11];
        assert!(decode_varint(&data).is_err());
    }

    #[test]
    fn test_encode_varint_round_trip() {
        for value in [0u64, 1, 127, 128, 150, 300, 16_383, 16_384, u64::MAX] {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            let (decoded, len) = decode_varint(&buf).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(len, buf.len());
        }
    }

    #[test]
    fn test_wire_type_conversion() {
        assert_eq!(WireType::try_from(0).unwrap(), WireType::Varint);
        assert_eq!(WireType::try_from(1).unwrap(), WireType::I64);
        assert_eq!(WireType::try_from(2).unwrap(), WireType::Len);
        assert_eq!(WireType::try_from(3).unwrap(), WireType::StartGroup);
        assert_eq!(WireType::try_from(4).unwrap(), WireType::EndGroup);
        assert_eq!(WireType::try_from(5).unwrap(), WireType::I32);
        assert!(WireType::try_from(6).is_err());
        assert!(WireType::try_from(7).is_err());
    }

    #[test]
    fn test_tag_round_trip() {
        let tag = make_tag(1, WireType::Varint);
        assert_eq!(tag, 0x08);
        let (field, wt) = split_tag(tag);
        assert_eq!(field, 1);
        assert_eq!(wt, 0);

        let tag = make_tag(3, WireType::StartGroup);
        assert_eq!(tag, 0x1B);
        let (field, wt) = split_tag(tag);
        assert_eq!(field, 3);
        assert_eq!(wt, 3);
    }
}
