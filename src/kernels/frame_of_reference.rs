//! Frame-of-reference coding with a variable-byte back end.
//!
//! A run is cut into blocks of `BLOCK_SIZE`. Each block stores its minimum,
//! then every value's offset from that minimum, all as LEB128. Clustered values
//! (item ids of a popular catalogue region, ratings) shrink to one byte each.

use super::vbyte;
use crate::error::PrefError;

pub const BLOCK_SIZE: usize = 128;

//==================================================================================
// 1. Plain Variant
//==================================================================================

pub fn encode(input: &[u32], output: &mut Vec<u8>) {
    for block in input.chunks(BLOCK_SIZE) {
        let min = block.iter().copied().min().unwrap_or(0);
        vbyte::encode_one(min, output);
        for &v in block {
            vbyte::encode_one(v - min, output);
        }
    }
}

pub fn decode(bytes: &[u8], out: &mut [u32]) -> Result<(), PrefError> {
    let mut pos = 0;
    for block in out.chunks_mut(BLOCK_SIZE) {
        let min = vbyte::decode_one(bytes, &mut pos)?;
        vbyte::decode_at(bytes, &mut pos, block)?;
        for slot in block.iter_mut() {
            *slot = slot.checked_add(min).ok_or_else(|| {
                PrefError::Decode("frame-of-reference offset overflows 32 bits".to_string())
            })?;
        }
    }
    if pos != bytes.len() {
        return Err(PrefError::Decode(
            "trailing bytes after the last frame-of-reference block".to_string(),
        ));
    }
    Ok(())
}

//==================================================================================
// 2. Integrated (Differential) Variant
//==================================================================================

/// Encodes a non-decreasing run: gaps are computed internally, then framed.
pub fn encode_integrated(input: &[u32], output: &mut Vec<u8>) {
    let mut gaps = Vec::with_capacity(input.len());
    let mut previous = 0u32;
    for &v in input {
        gaps.push(v.wrapping_sub(previous));
        previous = v;
    }
    encode(&gaps, output);
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
