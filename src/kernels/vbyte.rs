//! This module contains the kernels for variable-byte (LEB128) integer coding.
//!
//! Each value is split into 7-bit groups, least significant first; the high bit
//! of every byte flags a continuation. The integrated variant writes the gaps of
//! a non-decreasing run, so callers hand it absolute identifiers.

use crate::error::PrefError;

const SEVEN_BIT_MASK: u32 = 0x7F;
const CONTINUATION_BIT: u8 = 0x80;

//==================================================================================
// 1. Single-Value Operations
//==================================================================================

/// Appends the LEB128 encoding of `value` to `buffer`.
#[inline]
pub fn encode_one(value: u32, buffer: &mut Vec<u8>) {
    let mut current = value;
    loop {
        let byte = (current & SEVEN_BIT_MASK) as u8;
        current >>= 7;
        if current == 0 {
            buffer.push(byte);
            break;
        }
        buffer.push(byte | CONTINUATION_BIT);
    }
}

/// Decodes one value starting at `*pos`, advancing the position.
#[inline]
pub fn decode_one(bytes: &[u8], pos: &mut usize) -> Result<u32, PrefError> {
    let mut result: u32 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *bytes
            .get(*pos)
            .ok_or_else(|| PrefError::Decode("unexpected end of vbyte buffer".to_string()))?;
        *pos += 1;

        let payload = (byte & 0x7F) as u32;
        if shift >= 32 || (shift == 28 && payload > 0x0F) {
            return Err(PrefError::Decode(
                "integer overflow during vbyte decoding".to_string(),
            ));
        }
        result |= payload << shift;

        if byte & CONTINUATION_BIT == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

//==================================================================================
// 2. Slice Operations
//==================================================================================

pub fn encode(input: &[u32], output: &mut Vec<u8>) {
    for &v in input {
        encode_one(v, output);
    }
}

/// Decodes `out.len()` values starting at `*pos`.
pub fn decode_at(bytes: &[u8], pos: &mut usize, out: &mut [u32]) -> Result<(), PrefError> {
    for slot in out.iter_mut() {
        *slot = decode_one(bytes, pos)?;
    }
    Ok(())
}

/// Decodes a buffer holding exactly `out.len()` values.
pub fn decode(bytes: &[u8], out: &mut [u32]) -> Result<(), PrefError> {
    let mut pos = 0;
    decode_at(bytes, &mut pos, out)?;
    if pos != bytes.len() {
        return Err(PrefError::Decode(
            "did not consume entire vbyte buffer, trailing bytes detected".to_string(),
        ));
    }
    Ok(())
}

//==================================================================================
// 3. Integrated (Differential) Variant
//==================================================================================

/// Encodes a non-decreasing run as its first value followed by its gaps.
pub fn encode_integrated(input: &[u32], output: &mut Vec<u8>) {
    let mut previous = 0u32;
    for &v in input {
        encode_one(v.wrapping_sub(previous), output);
        previous = v;
    }
}

pub fn decode_integrated(bytes: &[u8], out: &mut [u32]) -> Result<(), PrefError> {
    decode(bytes, out)?;
    let mut running = 0u32;
    for slot in out.iter_mut() {
        running = running.wrapping_add(*slot);
        *slot = running;
    }
    Ok(())
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vbyte_roundtrip_u32() {
        let original: Vec<u32> = vec![0, 127, 128, 1000, 624_485, u32::MAX];
        let mut bytes = Vec::new();
        encode(&original, &mut bytes);
        let mut decoded = vec![0u32; original.len()];
        decode(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_known_encoding() {
        let mut bytes = Vec::new();
        encode_one(624_485, &mut bytes);
        assert_eq!(bytes, vec![0xE5, 0x8E, 0x26]);
    }

    #[test]
    fn test_decode_overflow_error() {
        let bytes = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        let mut decoded = vec![0u32; 1];
        let err = decode(&bytes, &mut decoded).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut decoded = vec![0u32; 1];
        assert!(decode(&[0x01, 0x02], &mut decoded).is_err());
    }

    #[test]
    fn test_integrated_roundtrip() {
        let original: Vec<u32> = vec![4, 4, 9, 300, 301, 70_000];
        let mut bytes = Vec::new();
        encode_integrated(&original, &mut bytes);
        let mut decoded = vec![0u32; original.len()];
        decode_integrated(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, original);
    }
}
