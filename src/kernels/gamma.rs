//! Elias gamma coding of unsigned integers.
//!
//! Codewords are indexed from 0: `v` is written as the gamma code of `v + 1`,
//! i.e. `floor(log2(v + 1))` zeros, a one, then the remaining low bits of
//! `v + 1`. Small values (gaps of dense lists) cost very few bits.

use super::bitio::{bit_length, BitReader, BitWriter};
use crate::error::PrefError;

//==================================================================================
// 1. Single-Value Operations
//==================================================================================

#[inline]
pub fn write_gamma(writer: &mut BitWriter, value: u64) {
    let x = value + 1;
    let n = bit_length(x) - 1;
    writer.write_unary(n as u64);
    writer.write_bits(x, n);
}

#[inline]
pub fn read_gamma(reader: &mut BitReader<'_>) -> Result<u64, PrefError> {
    let n = reader.read_unary()?;
    if n > 63 {
        return Err(PrefError::Decode(format!("gamma prefix of {} bits", n)));
    }
    let x = (1u64 << n) | reader.read_bits(n as u32)?;
    Ok(x - 1)
}

/// Length in bits of the gamma code of `value`.
#[inline]
pub fn len_gamma(value: u64) -> u32 {
    2 * (bit_length(value + 1) - 1) + 1
}

//==================================================================================
// 2. Slice Operations
//==================================================================================

pub fn encode(input: &[u32]) -> Vec<u8> {
    let mut writer = BitWriter::with_capacity(input.len() * 4);
    for &v in input {
        write_gamma(&mut writer, v as u64);
    }
    writer.into_bytes()
}

pub fn decode(bytes: &[u8], out: &mut [u32]) -> Result<(), PrefError> {
    let mut reader = BitReader::new(bytes);
    for slot in out.iter_mut() {
        let v = read_gamma(&mut reader)?;
        *slot = u32::try_from(v)
            .map_err(|_| PrefError::Decode(format!("gamma value {} exceeds 32 bits", v)))?;
    }
    Ok(())
}
