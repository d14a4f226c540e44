//! Per-record mutation of a decoded message.
//!
//! The fuzzing engine substitutes caller-supplied candidate tokens into one
//! record at a time and re-encodes the whole sequence once per candidate,
//! producing complete mutated messages suitable for probing a protobuf
//! consumer with malformed or boundary-value input.
//!
//! Mutation is scoped borrow-then-restore: a record's value is swapped out,
//! the sequence is encoded (which cannot fail), and the original value is
//! put back before the next candidate. A sequence is therefore safely
//! reusable across repeated fuzz calls.
//!
//! Numeric tokens are validated for a record before any of its candidates
//! are encoded; one bad token aborts the whole call and no partial
//! candidate list surfaces.

use crate::error::{Error, Result};
use crate::record::{RecordKind, RecordSequence, Value};
use crate::wire;
use std::mem;
use tracing::{debug, trace};

/// Produces candidate tokens for one record.
///
/// Implemented for any `FnMut(u32, RecordKind, &Value) -> Vec<String>`
/// closure, so ad-hoc generators need no named type:
///
/// ```
/// use rawpb_core::{RecordKind, RecordSequence, Value};
///
/// let mut seq = RecordSequence::from_bytes(&[0x08, 0x96, 0x01]);
/// let mut boundary = |_field: u32, kind: RecordKind, _value: &Value| match kind {
///     RecordKind::Varint => vec!["0".to_string(), u64::MAX.to_string()],
///     _ => Vec::new(),
/// };
/// let candidates = seq.fuzz_every_index(&mut boundary).unwrap();
/// assert_eq!(candidates.len(), 2);
/// ```
pub trait CandidateGenerator {
    /// Returns zero or more candidate tokens for the record.
    ///
    /// Tokens for numeric kinds must parse as base-10 integers; tokens for
    /// string and bytes kinds are substituted verbatim.
    fn candidates(&mut self, field_number: u32, kind: RecordKind, value: &Value) -> Vec<String>;
}

impl<F> CandidateGenerator for F
where
    F: FnMut(u32, RecordKind, &Value) -> Vec<String>,
{
    fn candidates(&mut self, field_number: u32, kind: RecordKind, value: &Value) -> Vec<String> {
        self(field_number, kind, value)
    }
}

impl RecordSequence {
    /// Generates candidate messages by mutating the record at `index`.
    ///
    /// Group markers carry no payload and always yield an empty list
    /// without consulting the generator. Each returned byte array is the
    /// whole sequence re-encoded with one candidate substituted.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn fuzz_record<G: CandidateGenerator>(
        &mut self,
        index: usize,
        generator: &mut G,
    ) -> Result<Vec<Vec<u8>>> {
        let record = &self.records()[index];
        let (field_number, kind) = (record.field_number, record.kind());

        if kind.is_group_marker() {
            return Ok(Vec::new());
        }

        let tokens = generator.candidates(field_number, kind, &record.value);
        trace!(
            "field {} ({}): {} candidate token(s)",
            field_number,
            kind,
            tokens.len()
        );

        // Validate every token up front so the call stays atomic: either
        // all candidates encode or none do.
        let replacements = parse_candidates(tokens, field_number, kind)?;

        let mut out = Vec::with_capacity(replacements.len());
        for replacement in replacements {
            let original = mem::replace(&mut self.records_mut()[index].value, replacement);
            let candidate = wire::encode(self);
            self.records_mut()[index].value = original;
            out.push(candidate);
        }

        Ok(out)
    }

    /// Generates candidate messages for a sequence containing `field_number`.
    ///
    /// Errors if no record carries `field_number`. The mutation scope is
    /// the entire sequence, not only the matching records: the field-number
    /// argument acts as an existence guard, while candidates are generated
    /// for every record in order.
    pub fn fuzz_index<G: CandidateGenerator>(
        &mut self,
        field_number: u32,
        generator: &mut G,
    ) -> Result<Vec<Vec<u8>>> {
        if !self
            .records()
            .iter()
            .any(|r| r.field_number == field_number)
        {
            return Err(Error::no_such_field(field_number));
        }

        self.fuzz_all(generator)
    }

    /// Generates candidate messages by mutating every record in turn.
    pub fn fuzz_every_index<G: CandidateGenerator>(
        &mut self,
        generator: &mut G,
    ) -> Result<Vec<Vec<u8>>> {
        self.fuzz_all(generator)
    }

    fn fuzz_all<G: CandidateGenerator>(&mut self, generator: &mut G) -> Result<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        for index in 0..self.len() {
            out.extend(self.fuzz_record(index, generator)?);
        }
        debug!("generated {} candidate message(s)", out.len());
        Ok(out)
    }
}

fn parse_candidates(
    tokens: Vec<String>,
    field_number: u32,
    kind: RecordKind,
) -> Result<Vec<Value>> {
    tokens
        .into_iter()
        .map(|token| match kind {
            RecordKind::Varint => token
                .parse::<u64>()
                .map(Value::Varint)
                .map_err(|_| Error::fuzz_value(token, field_number, "u64")),
            RecordKind::Fixed64 => token
                .parse::<u64>()
                .map(Value::Fixed64)
                .map_err(|_| Error::fuzz_value(token, field_number, "u64")),
            RecordKind::Fixed32 => token
                .parse::<u32>()
                .map(Value::Fixed32)
                .map_err(|_| Error::fuzz_value(token, field_number, "u32")),
            RecordKind::Str => Ok(Value::Str(token)),
            RecordKind::Bytes => Ok(Value::Bytes(token.into_bytes())),
            // fuzz_record returns early for group markers
            RecordKind::GroupStart | RecordKind::GroupEnd => {
                unreachable!("group markers yield no candidates")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// field 1 varint 150, field 2 "hi", field 3 fixed32 7
    fn sample_bytes() -> Vec<u8> {
        let mut data = vec![0x08, 0x96, 0x01, 0x12, 0x02, b'h', b'i', 0x1D];
        data.extend_from_slice(&7u32.to_le_bytes());
        data
    }

    fn identity(_field: u32, _kind: RecordKind, value: &Value) -> Vec<String> {
        match value {
            Value::Varint(v) | Value::Fixed64(v) => vec![v.to_string()],
            Value::Fixed32(v) => vec![v.to_string()],
            Value::Str(s) => vec![s.clone()],
            Value::Bytes(b) => vec![String::from_utf8_lossy(b).into_owned()],
            Value::GroupStart | Value::GroupEnd => Vec::new(),
        }
    }

    #[test]
    fn test_identity_generator_reproduces_original() {
        let data = sample_bytes();
        let mut seq = RecordSequence::from_bytes(&data);
        let mut generator = identity;

        let candidates = seq.fuzz_every_index(&mut generator).unwrap();
        assert_eq!(candidates.len(), 3);
        for candidate in candidates {
            assert_eq!(candidate, data);
        }
    }

    #[test]
    fn test_substitution_produces_mutated_message() {
        let mut seq = RecordSequence::from_bytes(&[0x08, 0x96, 0x01]);
        let mut generator = |_: u32, _: RecordKind, _: &Value| {
            vec!["0".to_string(), "255".to_string()]
        };

        let candidates = seq.fuzz_every_index(&mut generator).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], vec![0x08, 0x00]);
        assert_eq!(candidates[1], vec![0x08, 0xFF, 0x01]);

        // Sequence is restored after every candidate
        assert_eq!(seq.to_bytes(), vec![0x08, 0x96, 0x01]);
    }

    #[test]
    fn test_fuzz_index_missing_field() {
        let mut seq = RecordSequence::from_bytes(&[0x08, 0x01]);
        let mut generator = identity;

        let err = seq.fuzz_index(9, &mut generator).unwrap_err();
        assert!(matches!(err, Error::NoSuchField { number: 9 }));
    }

    #[test]
    fn test_fuzz_index_mutates_whole_sequence() {
        // The existence check is for field 1 only, but candidates come
        // from every record.
        let data = sample_bytes();
        let mut seq = RecordSequence::from_bytes(&data);

        let mut seen_fields = Vec::new();
        let mut generator = |field: u32, _: RecordKind, _: &Value| {
            seen_fields.push(field);
            Vec::new()
        };

        let candidates = seq.fuzz_index(1, &mut generator).unwrap();
        assert!(candidates.is_empty());
        assert_eq!(seen_fields, vec![1, 2, 3]);
    }

    #[test]
    fn test_group_markers_yield_no_candidates() {
        let mut seq = RecordSequence::from_bytes(&[0x1B, 0x08, 0x01, 0x1C]);

        let mut consulted = Vec::new();
        let mut generator = |_: u32, kind: RecordKind, _: &Value| {
            consulted.push(kind);
            vec!["2".to_string()]
        };

        let candidates = seq.fuzz_every_index(&mut generator).unwrap();
        // Only the inner varint is mutable
        assert_eq!(candidates.len(), 1);
        assert_eq!(consulted, vec![RecordKind::Varint]);
    }

    #[test]
    fn test_bad_numeric_token_aborts_atomically() {
        let data = sample_bytes();
        let mut seq = RecordSequence::from_bytes(&data);
        let mut generator = |_: u32, kind: RecordKind, _: &Value| match kind {
            RecordKind::Varint => vec!["not-a-number".to_string()],
            _ => vec!["1".to_string()],
        };

        let err = seq.fuzz_every_index(&mut generator).unwrap_err();
        assert!(matches!(err, Error::FuzzValue { .. }));

        // No mutation leaked into the sequence
        assert_eq!(seq.to_bytes(), data);
    }

    #[test]
    fn test_negative_token_rejected_for_numeric_kind() {
        let mut seq = RecordSequence::from_bytes(&[0x08, 0x01]);
        let mut generator = |_: u32, _: RecordKind, _: &Value| vec!["-1".to_string()];

        assert!(seq.fuzz_every_index(&mut generator).is_err());
    }

    #[test]
    fn test_string_and_bytes_tokens_are_verbatim() {
        let mut seq = RecordSequence::from_bytes(&[0x12, 0x02, b'h', b'i']);
        let mut generator = |_: u32, _: RecordKind, _: &Value| vec!["longer value".to_string()];

        let candidates = seq.fuzz_every_index(&mut generator).unwrap();
        let restored = RecordSequence::from_bytes(&candidates[0]);
        assert_eq!(
            restored.records()[0].value,
            Value::Str("longer value".to_string())
        );
    }

    #[test]
    fn test_empty_candidate_list_is_ok() {
        let mut seq = RecordSequence::from_bytes(&[0x08, 0x01]);
        let mut generator = |_: u32, _: RecordKind, _: &Value| Vec::new();

        let candidates = seq.fuzz_every_index(&mut generator).unwrap();
        assert!(candidates.is_empty());
    }
}
