//! Boldi-Vigna zeta codes, parameterized by the shrinking factor `k`.
//!
//! `v` is written as the zeta_k code of `x = v + 1`: with `h = floor(log2(x) / k)`,
//! the codeword is `h` in unary followed by `x - 2^(hk)` in minimal binary over
//! the interval `[0, 2^((h+1)k) - 2^(hk))`. `k = 1` degenerates to gamma; larger
//! `k` favours the power-law gap distributions of preference data.

use super::bitio::{bit_length, BitReader, BitWriter};
use crate::error::PrefError;

/// Largest shrinking factor accepted by the policy.
pub const MAX_K: u8 = 16;

//==================================================================================
// 1. Minimal Binary Helpers
//==================================================================================

/// Returns `(s, m)` for an interval of size `z`: values below `m` use `s - 1` bits.
#[inline]
fn minimal_binary_params(z: u64) -> (u32, u64) {
    if z <= 1 {
        return (0, 0);
    }
    let s = bit_length(z - 1);
    let m = (1u64 << s) - z;
    (s, m)
}

#[inline]
fn write_minimal_binary(writer: &mut BitWriter, y: u64, z: u64) {
    let (s, m) = minimal_binary_params(z);
    if s == 0 {
        return;
    }
    if y < m {
        writer.write_bits(y, s - 1);
    } else {
        writer.write_bits(y + m, s);
    }
}

#[inline]
fn read_minimal_binary(reader: &mut BitReader<'_>, z: u64) -> Result<u64, PrefError> {
    let (s, m) = minimal_binary_params(z);
    if s == 0 {
        return Ok(0);
    }
    let prefix = reader.read_bits(s - 1)?;
    if prefix < m {
        return Ok(prefix);
    }
    let bit = reader.read_bit()? as u64;
    Ok(((prefix << 1) | bit) - m)
}

//==================================================================================
// 2. Single-Value Operations
//==================================================================================

#[inline]
pub fn write_zeta(writer: &mut BitWriter, value: u64, k: u32) {
    let x = value + 1;
    let h = (bit_length(x) - 1) / k;
    let left = 1u64 << (h * k);
    let z = (1u64 << ((h + 1) * k)) - left;
    writer.write_unary(h as u64);
    write_minimal_binary(writer, x - left, z);
}

#[inline]
pub fn read_zeta(reader: &mut BitReader<'_>, k: u32) -> Result<u64, PrefError> {
    let h = reader.read_unary()?;
    if (h + 1) * k as u64 > 63 {
        return Err(PrefError::Decode(format!("zeta_{} prefix {} is too long", k, h)));
    }
    let h = h as u32;
    let left = 1u64 << (h * k);
    let z = (1u64 << ((h + 1) * k)) - left;
    let y = read_minimal_binary(reader, z)?;
    Ok(left + y - 1)
}

//==================================================================================
// 3. Slice Operations
//==================================================================================

pub fn encode(input: &[u32], k: u8) -> Vec<u8> {
    let k = k as u32;
    let mut writer = BitWriter::with_capacity(input.len() * (k as usize + 2));
    for &v in input {
        write_zeta(&mut writer, v as u64, k);
    }
    writer.into_bytes()
}

pub fn decode(bytes: &[u8], out: &mut [u32], k: u8) -> Result<(), PrefError> {
    let k = k as u32;
    let mut reader = BitReader::new(bytes);
    for slot in out.iter_mut() {
        let v = read_zeta(&mut reader, k)?;
        *slot = u32::try_from(v)
            .map_err(|_| PrefError::Decode(format!("zeta value {} exceeds 32 bits", v)))?;
    }
    Ok(())
}
