//! Hex and base64 byte-string helpers for the text representations.
//!
//! Bytes payloads travel as standard base64 (with padding) inside JSON and
//! YAML, and whole messages travel as lowercase hex strings. Hex decoding
//! tolerates ASCII whitespace so pasted hexdump fragments work as input.

use crate::error::{Error, Result};
use std::fmt::Write;

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Encodes bytes as lowercase hex
pub(crate) fn hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        // Writing to a String cannot fail
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Decodes a hex string, ignoring ASCII whitespace
pub(crate) fn hex_decode(s: &str) -> Result<Vec<u8>> {
    let mut nibbles = Vec::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_whitespace() {
            continue;
        }
        let nibble = c
            .to_digit(16)
            .ok_or_else(|| Error::text_format("hex", format!("invalid hex character '{c}'")))?;
        nibbles.push(nibble as u8);
    }

    if nibbles.len() % 2 != 0 {
        return Err(Error::text_format("hex", "odd number of hex digits"));
    }

    Ok(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
}

/// Encodes bytes as standard base64 with padding
pub(crate) fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let n = (u32::from(chunk[0]) << 16)
            | (u32::from(*chunk.get(1).unwrap_or(&0)) << 8)
            | u32::from(*chunk.get(2).unwrap_or(&0));
        out.push(BASE64_ALPHABET[(n >> 18 & 0x3F) as usize] as char);
        out.push(BASE64_ALPHABET[(n >> 12 & 0x3F) as usize] as char);
        out.push(if chunk.len() > 1 {
            BASE64_ALPHABET[(n >> 6 & 0x3F) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            BASE64_ALPHABET[(n & 0x3F) as usize] as char
        } else {
            '='
        });
    }
    out
}

/// Decodes a standard base64 string with padding
pub(crate) fn base64_decode(s: &str) -> Result<Vec<u8>> {
    fn sextet(c: u8) -> Option<u32> {
        match c {
            b'A'..=b'Z' => Some(u32::from(c - b'A')),
            b'a'..=b'z' => Some(u32::from(c - b'a') + 26),
            b'0'..=b'9' => Some(u32::from(c - b'0') + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let bytes = s.as_bytes();
    if bytes.len() % 4 != 0 {
        return Err(Error::text_format(
            "base64",
            "input length is not a multiple of 4",
        ));
    }

    let mut out = Vec::with_capacity(bytes.len() / 4 * 3);
    for (i, chunk) in bytes.chunks(4).enumerate() {
        let pad = chunk.iter().rev().take_while(|&&c| c == b'=').count();
        let is_last = (i + 1) * 4 == bytes.len();
        if pad > 2 || (pad > 0 && !is_last) {
            return Err(Error::text_format("base64", "misplaced padding"));
        }

        let mut n = 0u32;
        for &c in &chunk[..4 - pad] {
            let v = sextet(c).ok_or_else(|| {
                Error::text_format("base64", format!("invalid base64 character '{}'", c as char))
            })?;
            n = (n << 6) | v;
        }
        n <<= 6 * pad as u32;

        out.push((n >> 16) as u8);
        if pad < 2 {
            out.push((n >> 8) as u8);
        }
        if pad < 1 {
            out.push(n as u8);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hex_round_trip() {
        let data = vec![0x08, 0x96, 0x01, 0xFF, 0x00];
        let hex = hex_encode(&data);
        assert_eq!(hex, "089601ff00");
        assert_eq!(hex_decode(&hex).unwrap(), data);
    }

    #[test]
    fn test_hex_decode_ignores_whitespace() {
        assert_eq!(hex_decode("08 96 01").unwrap(), vec![0x08, 0x96, 0x01]);
        assert_eq!(hex_decode("0896\n01").unwrap(), vec![0x08, 0x96, 0x01]);
    }

    #[test]
    fn test_hex_decode_uppercase() {
        assert_eq!(hex_decode("DEADBEEF").unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_hex_decode_errors() {
        assert!(hex_decode("0g").is_err());
        assert!(hex_decode("089").is_err());
    }

    #[test]
    fn test_base64_known_vectors() {
        assert_eq!(base64_encode(b""), "");
        assert_eq!(base64_encode(b"f"), "Zg==");
        assert_eq!(base64_encode(b"fo"), "Zm8=");
        assert_eq!(base64_encode(b"foo"), "Zm9v");
        assert_eq!(base64_encode(b"hello"), "aGVsbG8=");
    }

    #[test]
    fn test_base64_decode() {
        assert_eq!(base64_decode("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(base64_decode("").unwrap(), Vec::<u8>::new());
        assert_eq!(base64_decode("/w==").unwrap(), vec![0xFF]);
    }

    #[test]
    fn test_base64_round_trip_binary() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(base64_decode(&base64_encode(&data)).unwrap(), data);
    }

    #[test]
    fn test_base64_decode_errors() {
        assert!(base64_decode("abc").is_err()); // bad length
        assert!(base64_decode("a*==").is_err()); // bad character
        assert!(base64_decode("a===").is_err()); // too much padding
        assert!(base64_decode("aa==aaaa").is_err()); // padding not at end
    }
}
