//! Patched frame-of-reference (PFOR) coding: NewPFD, OptPFD and FastPFOR.
//!
//! The run is cut into blocks of `BLOCK_SIZE`. Each block picks a bit width `b`;
//! every value is stored with its low `b` bits, and the few values that do not
//! fit ("exceptions") get their position and high part patched in afterwards.
//! The three variants differ only in how `b` is chosen and how the high parts of
//! exceptions are written:
//!
//! | variant  | choice of `b`                          | exception high parts |
//! |----------|----------------------------------------|----------------------|
//! | NewPFD   | smallest `b` covering >= 90% of values | gamma                |
//! | OptPFD   | `b` minimising the block size          | gamma                |
//! | FastPFOR | `b` minimising the block size          | fixed width packing  |
//!
//! Block layout (bit stream): `b` (6 bits), exception count (8 bits),
//! [FastPFOR, if exceptions: high width (6 bits)], `n` low parts of `b` bits,
//! then per exception its 7-bit position and its high part.

use super::bitio::{bit_length, BitReader, BitWriter};
use super::gamma::{len_gamma, read_gamma, write_gamma};
use crate::error::PrefError;

pub const BLOCK_SIZE: usize = 128;

const WIDTH_BITS: u32 = 6;
const COUNT_BITS: u32 = 8;
const POSITION_BITS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PforVariant {
    NewPfd,
    OptPfd,
    FastPfor,
}

//==================================================================================
// 1. Bit Width Selection
//==================================================================================

/// Estimated size in bits of `block` packed with width `b`.
fn block_cost(block: &[u32], b: u32, max_bits: u32, variant: PforVariant) -> u64 {
    let mut cost = (WIDTH_BITS + COUNT_BITS) as u64 + block.len() as u64 * b as u64;
    let mut exceptions = 0u64;
    for &v in block.iter().filter(|&&v| bit_length(v as u64) > b) {
        exceptions += 1;
        cost += POSITION_BITS as u64;
        cost += match variant {
            PforVariant::FastPfor => (max_bits - b) as u64,
            _ => len_gamma(((v as u64) >> b) - 1) as u64,
        };
    }
    if variant == PforVariant::FastPfor && exceptions > 0 {
        cost += WIDTH_BITS as u64;
    }
    cost
}

/// Chooses the low-part bit width for one block.
pub fn choose_bit_width(block: &[u32], variant: PforVariant) -> u32 {
    let max_bits = block
        .iter()
        .map(|&v| bit_length(v as u64))
        .max()
        .unwrap_or(0);

    match variant {
        PforVariant::NewPfd => {
            let allowed = block.len() / 10;
            (0..=max_bits)
                .find(|&b| {
                    block
                        .iter()
                        .filter(|&&v| bit_length(v as u64) > b)
                        .count()
                        <= allowed
                })
                .unwrap_or(max_bits)
        }
        PforVariant::OptPfd | PforVariant::FastPfor => (0..=max_bits)
            .min_by_key(|&b| (block_cost(block, b, max_bits, variant), std::cmp::Reverse(b)))
            .unwrap_or(max_bits),
    }
}

//==================================================================================
// 2. Public API
//==================================================================================

pub fn encode(input: &[u32], variant: PforVariant) -> Vec<u8> {
    let mut writer = BitWriter::with_capacity(input.len() * 8);
    for block in input.chunks(BLOCK_SIZE) {
        encode_block(&mut writer, block, variant);
    }
    writer.into_bytes()
}

pub fn decode(bytes: &[u8], out: &mut [u32], variant: PforVariant) -> Result<(), PrefError> {
    let mut reader = BitReader::new(bytes);
    for block in out.chunks_mut(BLOCK_SIZE) {
        decode_block(&mut reader, block, variant)?;
    }
    Ok(())
}

//==================================================================================
// 3. Block Codec
//==================================================================================

fn encode_block(writer: &mut BitWriter, block: &[u32], variant: PforVariant) {
    let b = choose_bit_width(block, variant);
    let low_mask = if b >= 32 { u64::MAX } else { (1u64 << b) - 1 };
    let exceptions: Vec<(usize, u64)> = block
        .iter()
        .enumerate()
        .filter(|(_, &v)| bit_length(v as u64) > b)
        .map(|(i, &v)| (i, (v as u64) >> b))
        .collect();

    writer.write_bits(b as u64, WIDTH_BITS);
    writer.write_bits(exceptions.len() as u64, COUNT_BITS);
    let high_width = exceptions
        .iter()
        .map(|&(_, high)| bit_length(high))
        .max()
        .unwrap_or(0);
    if variant == PforVariant::FastPfor && !exceptions.is_empty() {
        writer.write_bits(high_width as u64, WIDTH_BITS);
    }

    for &v in block {
        writer.write_bits(v as u64 & low_mask, b);
    }
    for &(position, high) in &exceptions {
        writer.write_bits(position as u64, POSITION_BITS);
        match variant {
            PforVariant::FastPfor => writer.write_bits(high, high_width),
            _ => write_gamma(writer, high - 1),
        }
    }
}

fn decode_block(
    reader: &mut BitReader<'_>,
    block: &mut [u32],
    variant: PforVariant,
) -> Result<(), PrefError> {
    let b = reader.read_bits(WIDTH_BITS)? as u32;
    let exception_count = reader.read_bits(COUNT_BITS)? as usize;
    if b > 32 || exception_count > block.len() {
        return Err(PrefError::Decode(format!(
            "invalid PFOR block header (b = {}, exceptions = {})",
            b, exception_count
        )));
    }
    let high_width = if variant == PforVariant::FastPfor && exception_count > 0 {
        reader.read_bits(WIDTH_BITS)? as u32
    } else {
        0
    };

    for slot in block.iter_mut() {
        *slot = reader.read_bits(b)? as u32;
    }
    for _ in 0..exception_count {
        let position = reader.read_bits(POSITION_BITS)? as usize;
        let high = match variant {
            PforVariant::FastPfor => reader.read_bits(high_width)?,
            _ => read_gamma(reader)? + 1,
        };
        let slot = block.get_mut(position).ok_or_else(|| {
            PrefError::Decode(format!("PFOR exception position {} out of block", position))
        })?;
        let value = (high << b) | *slot as u64;
        *slot = u32::try_from(value)
            .map_err(|_| PrefError::Decode(format!("PFOR value {} exceeds 32 bits", value)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIANTS: [PforVariant; 3] = [
        PforVariant::NewPfd,
        PforVariant::OptPfd,
        PforVariant::FastPfor,
    ];

    fn skewed_run(len: usize) -> Vec<u32> {
        (0..len as u32)
            .map(|i| if i % 17 == 0 { 50_000 + i } else { i % 9 })
            .collect()
    }

    #[test]
    fn test_roundtrip_all_variants() {
        let original = skewed_run(300);
        for variant in VARIANTS {
            let bytes = encode(&original, variant);
            let mut decoded = vec![0u32; original.len()];
            decode(&bytes, &mut decoded, variant).unwrap();
            assert_eq!(decoded, original, "{:?}", variant);
        }
    }

    #[test]
    fn test_extreme_values_roundtrip() {
        let original: Vec<u32> = vec![0, u32::MAX, 1, u32::MAX - 1, 0, 0, 7];
        for variant in VARIANTS {
            let bytes = encode(&original, variant);
            let mut decoded = vec![0u32; original.len()];
            decode(&bytes, &mut decoded, variant).unwrap();
            assert_eq!(decoded, original, "{:?}", variant);
        }
    }

    #[test]
    fn test_newpfd_leaves_at_most_ten_percent_exceptions() {
        let block = skewed_run(BLOCK_SIZE);
        let b = choose_bit_width(&block, PforVariant::NewPfd);
        let exceptions = block.iter().filter(|&&v| bit_length(v as u64) > b).count();
        assert!(exceptions <= BLOCK_SIZE / 10);
        assert_eq!(b, 4);
    }

    #[test]
    fn test_optimising_variants_beat_plain_packing() {
        let original = skewed_run(BLOCK_SIZE);
        let plain_bits = BLOCK_SIZE * 16;
        for variant in [PforVariant::OptPfd, PforVariant::FastPfor] {
            let bytes = encode(&original, variant);
            assert!(bytes.len() * 8 < plain_bits, "{:?}", variant);
        }
    }

    #[test]
    fn test_constant_zero_block_is_header_only() {
        let bytes = encode(&[0; 64], PforVariant::OptPfd);
        assert_eq!(bytes.len(), 2);
    }
}
