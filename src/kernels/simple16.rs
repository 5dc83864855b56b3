//! Simple16 word-aligned packing.
//!
//! Every 32-bit word holds a 4-bit selector and 28 data bits. The selector picks
//! one of 16 layouts mixing different bit widths; the encoder greedily takes the
//! first layout that fits the next values. Values of 2^28 and above cannot be
//! represented and are rejected at encode time.

use crate::error::PrefError;

const DATA_BITS: u32 = 28;
pub const MAX_VALUE: u32 = (1 << DATA_BITS) - 1;

/// Bit width of every slot, per selector.
const LAYOUTS: [&[u8]; 16] = [
    &[1; 28],
    &[2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    &[1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1],
    &[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2],
    &[2; 14],
    &[4, 3, 3, 3, 3, 3, 3, 3, 3],
    &[3, 4, 4, 4, 4, 3, 3, 3],
    &[4; 7],
    &[5, 5, 5, 5, 4, 4],
    &[4, 4, 5, 5, 5, 5],
    &[6, 6, 6, 5, 5],
    &[5, 5, 6, 6, 6],
    &[7; 4],
    &[10, 9, 9],
    &[14; 2],
    &[28; 1],
];

//==================================================================================
// 1. Core Logic
//==================================================================================

/// Returns true if the first `min(layout.len(), rest.len())` values fit `layout`.
#[inline]
fn fits(layout: &[u8], rest: &[u32]) -> bool {
    layout
        .iter()
        .zip(rest)
        .all(|(&width, &v)| v >> width == 0)
}

pub fn encode(input: &[u32]) -> Result<Vec<u32>, PrefError> {
    if let Some(&bad) = input.iter().find(|&&v| v > MAX_VALUE) {
        return Err(PrefError::Encode(format!(
            "value {} does not fit the 28 data bits of a Simple16 word",
            bad
        )));
    }
    let mut words = Vec::with_capacity(input.len() / 4 + 1);
    let mut rest = input;
    while !rest.is_empty() {
        // Selector 15 holds any single value, so a layout is always found.
        let selector = LAYOUTS
            .iter()
            .position(|layout| fits(layout, rest))
            .unwrap_or(LAYOUTS.len() - 1);
        let layout = LAYOUTS[selector];
        let taken = layout.len().min(rest.len());

        let mut word = (selector as u32) << DATA_BITS;
        let mut shift = 0u32;
        for (&width, &v) in layout.iter().zip(&rest[..taken]) {
            word |= v << shift;
            shift += width as u32;
        }
        words.push(word);
        rest = &rest[taken..];
    }
    Ok(words)
}

pub fn decode(words: &[u32], out: &mut [u32]) -> Result<(), PrefError> {
    let mut filled = 0;
    let mut word_iter = words.iter();
    while filled < out.len() {
        let &word = word_iter
            .next()
            .ok_or_else(|| PrefError::Decode("Simple16 stream ended early".to_string()))?;
        let layout = LAYOUTS[(word >> DATA_BITS) as usize];
        let taken = layout.len().min(out.len() - filled);
        let mut shift = 0u32;
        for (&width, slot) in layout.iter().zip(&mut out[filled..filled + taken]) {
            *slot = (word >> shift) & ((1u32 << width) - 1);
            shift += width as u32;
        }
        filled += taken;
    }
    if word_iter.next().is_some() {
        return Err(PrefError::Decode("trailing Simple16 words".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_use_all_28_bits() {
        for (selector, layout) in LAYOUTS.iter().enumerate() {
            let total: u32 = layout.iter().map(|&w| w as u32).sum();
            assert_eq!(total, DATA_BITS, "selector {}", selector);
        }
    }

    #[test]
    fn test_simple16_roundtrip() {
        let original: Vec<u32> = vec![
            1, 0, 1, 1, 0, 1, 3, 2, 7, 15, 100, 4000, 1, 1, 1, MAX_VALUE, 0, 0, 12, 300_000,
        ];
        let words = encode(&original).unwrap();
        let mut decoded = vec![0u32; original.len()];
        decode(&words, &mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_dense_ones_pack_28_per_word() {
        let original = vec![1u32; 56];
        let words = encode(&original).unwrap();
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_oversized_value_is_rejected() {
        assert!(matches!(encode(&[1, 1 << 28]), Err(PrefError::Encode(_))));
    }
}
