//! Error types for the rawpb-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.
//!
//! Decode errors are captured sticky on the [`RecordSequence`](crate::RecordSequence)
//! they were produced for, so partially recovered records stay inspectable.

use thiserror::Error;

/// Result type alias for rawpb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all rawpb operations
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Tag, length, or payload inconsistent with the remaining buffer
    #[error("malformed wire data at offset {offset}: {details}")]
    MalformedWire {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Unrecognized wire-type value in a tag
    #[error("unsupported wire type {value} at offset {offset}")]
    UnsupportedWireType {
        /// The unrecognized wire-type value (3 low bits of the tag)
        value: u8,
        /// Byte offset of the tag
        offset: usize,
    },

    /// Failed to decode varint
    #[error("failed to decode varint at offset {offset}: buffer too small or invalid encoding")]
    VarintDecode {
        /// Byte offset where the error occurred
        offset: usize,
    },

    /// Invalid field number in a tag
    #[error("invalid field number {number}: must be between 1 and {max}")]
    InvalidFieldNumber {
        /// The invalid field number
        number: u32,
        /// Maximum valid field number
        max: u32,
    },

    /// Failed to parse a textual representation (JSON, YAML, hex)
    #[error("failed to parse {format} input: {details}")]
    TextFormat {
        /// The textual format being parsed
        format: &'static str,
        /// Detailed description of the issue
        details: String,
    },

    /// A fuzz candidate token failed to parse as the required numeric type
    #[error("fuzz candidate '{token}' for field {field_number} is not a valid {expected}")]
    FuzzValue {
        /// The rejected candidate token
        token: String,
        /// Field number of the record being mutated
        field_number: u32,
        /// Expected numeric type
        expected: &'static str,
    },

    /// No record with the requested field number exists in the sequence
    #[error("no record with field number {number} in sequence")]
    NoSuchField {
        /// The requested field number
        number: u32,
    },
}

impl Error {
    /// Creates a new malformed-wire error
    pub fn malformed_wire(offset: usize, details: impl Into<String>) -> Self {
        Self::MalformedWire {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new unsupported wire-type error
    pub fn unsupported_wire_type(value: u8, offset: usize) -> Self {
        Self::UnsupportedWireType { value, offset }
    }

    /// Creates a new varint decode error
    pub fn varint_decode(offset: usize) -> Self {
        Self::VarintDecode { offset }
    }

    /// Creates a new text format error
    pub fn text_format(format: &'static str, details: impl std::fmt::Display) -> Self {
        Self::TextFormat {
            format,
            details: details.to_string(),
        }
    }

    /// Creates a new fuzz value error
    pub fn fuzz_value(token: impl Into<String>, field_number: u32, expected: &'static str) -> Self {
        Self::FuzzValue {
            token: token.into(),
            field_number,
            expected,
        }
    }

    /// Creates a new no-such-field error
    pub fn no_such_field(number: u32) -> Self {
        Self::NoSuchField { number }
    }

    /// Returns true if this error was produced while decoding wire data.
    ///
    /// Decode errors are captured on the sequence rather than raised, so
    /// callers can distinguish them from usage errors such as [`Error::NoSuchField`].
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedWire { .. }
                | Self::UnsupportedWireType { .. }
                | Self::VarintDecode { .. }
                | Self::InvalidFieldNumber { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::malformed_wire(7, "length prefix exceeds buffer");
        assert!(err.to_string().contains("offset 7"));
        assert!(err.to_string().contains("length prefix exceeds buffer"));

        let err = Error::unsupported_wire_type(6, 0);
        assert!(err.to_string().contains("wire type 6"));
    }

    #[test]
    fn test_is_decode_error() {
        assert!(Error::varint_decode(0).is_decode_error());
        assert!(Error::malformed_wire(0, "x").is_decode_error());
        assert!(!Error::no_such_field(9).is_decode_error());
        assert!(!Error::fuzz_value("abc", 1, "u64").is_decode_error());
    }
}
