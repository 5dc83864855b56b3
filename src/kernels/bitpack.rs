//! This module contains the kernels for fixed-width bit-packing and unpacking.
//!
//! Every value of a run is written with the same `bit_width`, with no padding
//! between values. The store uses it for absolute identifiers, with the width
//! derived from the size of the identifier space, so no delta coding is needed.

use super::bitio::{bit_length, BitReader, BitWriter};
use crate::error::PrefError;

//==================================================================================
// 1. Public API
//==================================================================================

/// Packs `input` with `bit_width` bits per value.
///
/// # Errors
/// Returns `PrefError::Encode` if a value needs more than `bit_width` bits or the
/// width is outside `1..=32`.
pub fn encode(input: &[u32], bit_width: u8) -> Result<Vec<u8>, PrefError> {
    if bit_width == 0 || bit_width > 32 {
        return Err(PrefError::Encode(format!(
            "bit width {} is outside 1..=32",
            bit_width
        )));
    }
    let mut writer = BitWriter::with_capacity(input.len() * bit_width as usize);
    for &val in input {
        if bit_length(val as u64) > bit_width as u32 {
            return Err(PrefError::Encode(format!(
                "value {} exceeds bit width {}",
                val, bit_width
            )));
        }
        writer.write_bits(val as u64, bit_width as u32);
    }
    Ok(writer.into_bytes())
}

/// Unpacks `out.len()` values of `bit_width` bits.
pub fn decode(bytes: &[u8], out: &mut [u32], bit_width: u8) -> Result<(), PrefError> {
    if out.is_empty() {
        return Ok(());
    }
    if bit_width == 0 || bit_width > 32 {
        return Err(PrefError::Decode(format!(
            "bit width {} is outside 1..=32",
            bit_width
        )));
    }
    let mut reader = BitReader::new(bytes);
    for slot in out.iter_mut() {
        *slot = reader.read_bits(bit_width as u32)? as u32;
    }
    Ok(())
}

//==================================================================================
// 2. Unit Tests
//==================================================================================
