//! Minimal MSB-first bit stream writer and reader shared by the bit-oriented
//! kernels (gamma, zeta, rice, fixed, PFOR, Elias-Fano).
//!
//! The writer accumulates into a `BitVec<u8, Msb0>` and hands back the raw bytes;
//! the reader walks a `BitSlice` with an explicit cursor and reports truncation
//! as a `PrefError::Decode` instead of panicking.

use bitvec::prelude::*;

use crate::error::PrefError;

//==================================================================================
// 1. Writer
//==================================================================================

#[derive(Debug, Default)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bits: BitVec::with_capacity(bits),
        }
    }

    /// Appends the low `width` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, width: u32) {
        debug_assert!(width <= 64);
        if width == 0 {
            return;
        }
        let shifted = if width == 64 { value } else { value << (64 - width) };
        self.bits
            .extend_from_bitslice(&shifted.view_bits::<Msb0>()[..width as usize]);
    }

    /// Appends `n` zeros followed by a one.
    pub fn write_unary(&mut self, n: u64) {
        let new_len = self.bits.len() + n as usize;
        self.bits.resize(new_len, false);
        self.bits.push(true);
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Consumes the writer, padding the final byte with zeros.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bits.into_vec()
    }
}

//==================================================================================
// 2. Reader
//==================================================================================

pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bits: bytes.view_bits::<Msb0>(),
            pos: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }

    /// Reads `width` bits as an unsigned integer, most significant first.
    pub fn read_bits(&mut self, width: u32) -> Result<u64, PrefError> {
        debug_assert!(width <= 64);
        if width == 0 {
            return Ok(0);
        }
        let end = self.pos + width as usize;
        if end > self.bits.len() {
            return Err(PrefError::Decode(format!(
                "needed {} bits at offset {}, only {} available",
                width,
                self.pos,
                self.remaining()
            )));
        }
        let value = self.bits[self.pos..end]
            .iter()
            .by_vals()
            .fold(0u64, |acc, bit| (acc << 1) | bit as u64);
        self.pos = end;
        Ok(value)
    }

    /// Reads one bit.
    pub fn read_bit(&mut self) -> Result<bool, PrefError> {
        let bit = *self
            .bits
            .get(self.pos)
            .ok_or_else(|| PrefError::Decode("unexpected end of bit stream".to_string()))?;
        self.pos += 1;
        Ok(bit)
    }

    /// Reads a unary code (count of zeros before the terminating one).
    pub fn read_unary(&mut self) -> Result<u64, PrefError> {
        let rest = &self.bits[self.pos..];
        let zeros = rest
            .first_one()
            .ok_or_else(|| PrefError::Decode("unterminated unary code".to_string()))?;
        self.pos += zeros + 1;
        Ok(zeros as u64)
    }
}

/// Number of bits needed to write `value` in plain binary (0 for 0).
#[inline]
pub fn bit_length(value: u64) -> u32 {
    64 - value.leading_zeros()
}
