//! # rawpb-core
//!
//! A library for decoding, editing, and mutating protobuf wire-format
//! messages without the originating `.proto` schema.
//!
//! This crate provides the core functionality for:
//! - Parsing arbitrary wire-format bytes into an ordered, editable record
//!   sequence (including deprecated group nesting)
//! - Re-encoding the sequence back to bytes, byte-for-byte
//! - JSON, YAML, hex, and human-readable views for inspection and editing
//! - Generating per-field mutated messages for security testing
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`record`]: The record model shared by every other module
//! - [`wire`]: Schema-less wire-format decoding and encoding
//! - [`text`]: JSON/YAML/hex/pretty representations
//! - [`fuzz`]: Per-record candidate substitution
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use rawpb_core::{RecordKind, RecordSequence, Value};
//!
//! // field 1, varint, value 150
//! let mut seq = RecordSequence::from_hex("089601");
//! assert!(seq.error().is_none());
//! assert_eq!(seq.records()[0].value, Value::Varint(150));
//!
//! // Round-trips exactly
//! assert_eq!(seq.to_hex(), "089601");
//!
//! // Probe a consumer with boundary values for every varint field
//! let mut generator = |_field: u32, kind: RecordKind, _value: &Value| match kind {
//!     RecordKind::Varint => vec!["0".to_string(), u64::MAX.to_string()],
//!     _ => Vec::new(),
//! };
//! let candidates = seq.fuzz_every_index(&mut generator).unwrap();
//! assert_eq!(candidates.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod fuzz;
pub mod record;
pub mod text;
pub mod wire;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use fuzz::CandidateGenerator;
pub use record::{Record, RecordKind, RecordSequence, Value};
pub use wire::{WireType, MAX_FIELD_NUMBER};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
