//! Elias-Fano encoding for monotonic identifier lists.
//!
//! For `n` values below a universe `u`, every value is split into `l =
//! floor(log2(u / n))` low bits, stored verbatim, and a high part stored as
//! unary gaps. The total is within about two bits per element of the
//! information-theoretic bound, independent of how the gaps are distributed.
//!
//! Layout (bit stream): `l` (6 bits), the `n` low parts, then the `n` unary
//! high-part gaps. The run length is not stored; the caller supplies it.

use super::bitio::{bit_length, BitReader, BitWriter};
use crate::error::PrefError;

const LOW_WIDTH_BITS: u32 = 6;

/// Number of low bits for `n` values whose maximum is `max`.
pub fn low_bits_for(n: usize, max: u32) -> u32 {
    let universe = max as u64 + 1;
    let n = n as u64;
    if n == 0 || universe <= n {
        0
    } else {
        bit_length(universe / n) - 1
    }
}

/// Encodes a non-decreasing run.
///
/// # Panics
/// Panics in debug builds if the run is not non-decreasing; the codec layer
/// rejects such input before calling the kernel.
pub fn encode(input: &[u32]) -> Vec<u8> {
    debug_assert!(input.windows(2).all(|w| w[0] <= w[1]));
    let Some(&max) = input.last() else {
        return Vec::new();
    };
    let l = low_bits_for(input.len(), max);
    let high_total = (max as u64) >> l;
    let mut writer =
        BitWriter::with_capacity(LOW_WIDTH_BITS as usize + input.len() * (l as usize + 1) + high_total as usize + 1);

    writer.write_bits(l as u64, LOW_WIDTH_BITS);
    for &v in input {
        writer.write_bits(v as u64, l);
    }
    let mut previous_high = 0u64;
    for &v in input {
        let high = (v as u64) >> l;
        writer.write_unary(high - previous_high);
        previous_high = high;
    }
    writer.into_bytes()
}

pub fn decode(bytes: &[u8], out: &mut [u32]) -> Result<(), PrefError> {
    if out.is_empty() {
        return Ok(());
    }
    let mut reader = BitReader::new(bytes);
    let l = reader.read_bits(LOW_WIDTH_BITS)? as u32;
    if l > 32 {
        return Err(PrefError::Decode(format!("Elias-Fano low width {} exceeds 32", l)));
    }
    for slot in out.iter_mut() {
        *slot = reader.read_bits(l)? as u32;
    }
    let mut high = 0u64;
    for slot in out.iter_mut() {
        high += reader.read_unary()?;
        let value = (high << l) | *slot as u64;
        *slot = u32::try_from(value)
            .map_err(|_| PrefError::Decode(format!("Elias-Fano value {} exceeds 32 bits", value)))?;
    }
    Ok(())
}
