//! Golomb-Rice coding with a per-run parameter.
//!
//! A run is written as a 6-bit header holding `b`, then for every value the
//! quotient `v >> b` in unary and the remainder in `b` plain bits. `b` is
//! derived from the run's mean, but never so small that a single outlier
//! would need more than `MAX_QUOTIENT_BITS` unary bits.

use super::bitio::{bit_length, BitReader, BitWriter};
use crate::error::PrefError;

const HEADER_BITS: u32 = 6;
const MAX_QUOTIENT_BITS: u32 = 16;

//==================================================================================
// 1. Parameter Selection
//==================================================================================

/// Picks the Rice parameter for a run.
pub fn choose_parameter(input: &[u32]) -> u32 {
    if input.is_empty() {
        return 0;
    }
    let sum: u64 = input.iter().map(|&v| v as u64).sum();
    let mean = sum / input.len() as u64;
    let max = input.iter().copied().max().unwrap_or(0) as u64;
    let from_mean = bit_length(mean).saturating_sub(1);
    let outlier_floor = bit_length(max).saturating_sub(MAX_QUOTIENT_BITS);
    from_mean.max(outlier_floor).min(32)
}

//==================================================================================
// 2. Slice Operations
//==================================================================================

pub fn encode(input: &[u32]) -> Vec<u8> {
    let b = choose_parameter(input);
    let mut writer = BitWriter::with_capacity(HEADER_BITS as usize + input.len() * (b as usize + 2));
    writer.write_bits(b as u64, HEADER_BITS);
    for &v in input {
        let v = v as u64;
        writer.write_unary(v >> b);
        writer.write_bits(v, b);
    }
    writer.into_bytes()
}

pub fn decode(bytes: &[u8], out: &mut [u32]) -> Result<(), PrefError> {
    if out.is_empty() {
        return Ok(());
    }
    let mut reader = BitReader::new(bytes);
    let b = reader.read_bits(HEADER_BITS)? as u32;
    if b > 32 {
        return Err(PrefError::Decode(format!("rice parameter {} exceeds 32", b)));
    }
    for slot in out.iter_mut() {
        let q = reader.read_unary()?;
        let r = reader.read_bits(b)?;
        let v = (q << b) | r;
        *slot = u32::try_from(v)
            .map_err(|_| PrefError::Decode(format!("rice value {} exceeds 32 bits", v)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rice_roundtrip() {
        let original: Vec<u32> = vec![12, 9, 30, 1, 0, 17, 64, 3];
        let bytes = encode(&original);
        let mut decoded = vec![0u32; original.len()];
        decode(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_outliers_raise_the_parameter() {
        let mut input = vec![1u32; 100];
        input.push(u32::MAX);
        let b = choose_parameter(&input);
        assert!(b >= 32 - MAX_QUOTIENT_BITS);

        let bytes = encode(&input);
        let mut decoded = vec![0u32; input.len()];
        decode(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_parameter_follows_mean() {
        assert_eq!(choose_parameter(&[]), 0);
        assert_eq!(choose_parameter(&[1, 1, 1]), 0);
        assert_eq!(choose_parameter(&[16, 16, 16]), 4);
    }
}
