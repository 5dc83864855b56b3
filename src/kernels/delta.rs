//! This module contains the delta coder used by the store for identifier lists.
//!
//! Identifier lists are sorted strictly ascending, so their gaps are always
//! positive (the first element stays absolute). Non-integrated codecs are fed
//! these gaps; integrated codecs see the absolute values. Both directions work
//! **in-place** on the decode/encode scratch buffers.

use num_traits::{PrimInt, WrappingAdd, WrappingSub};

//==================================================================================
// 1. Generic Core Logic (In-Place)
//==================================================================================

/// Replaces a strictly ascending run with its gaps: `data[i] -= data[i - 1]`.
///
/// Iterates backwards so every subtraction sees the original predecessor.
pub fn delta<T>(data: &mut [T])
where
    T: PrimInt + WrappingSub,
{
    debug_assert!(
        is_strictly_ascending(data),
        "delta coding requires a strictly ascending, non-negative run"
    );
    for i in (1..data.len()).rev() {
        data[i] = data[i].wrapping_sub(&data[i - 1]);
    }
}

/// Inverse of [`delta`] (a running sum): `data[i] += data[i - 1]`.
pub fn atled<T>(data: &mut [T])
where
    T: PrimInt + WrappingAdd,
{
    for i in 1..data.len() {
        data[i] = data[i].wrapping_add(&data[i - 1]);
    }
    debug_assert!(
        is_strictly_ascending(data),
        "delta decoding produced a run that is not strictly ascending"
    );
}

/// Alias of [`atled`].
#[inline]
pub fn undelta<T>(data: &mut [T])
where
    T: PrimInt + WrappingAdd,
{
    atled(data)
}

/// True if the run is non-negative and strictly ascending.
pub fn is_strictly_ascending<T: PrimInt>(data: &[T]) -> bool {
    data.first().map_or(true, |first| *first >= T::zero())
        && data.windows(2).all(|w| w[0] < w[1])
}

/// True if the run is non-decreasing.
pub fn is_non_decreasing<T: PrimInt>(data: &[T]) -> bool {
    data.windows(2).all(|w| w[0] <= w[1])
}

//==================================================================================
// 2. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_then_atled_restores_run() {
        let original: Vec<i32> = vec![3, 7, 8, 20, 1000];
        let mut buffer = original.clone();

        delta(&mut buffer);
        assert_eq!(buffer, vec![3, 4, 1, 12, 980]);

        atled(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_short_runs_are_untouched() {
        let mut empty: Vec<i32> = vec![];
        delta(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![42u32];
        delta(&mut single);
        assert_eq!(single, vec![42]);
        undelta(&mut single);
        assert_eq!(single, vec![42]);
    }

    #[test]
    fn test_monotonicity_predicates() {
        assert!(is_strictly_ascending::<i32>(&[]));
        assert!(is_strictly_ascending(&[0, 1, 5]));
        assert!(!is_strictly_ascending(&[0, 1, 1]));
        assert!(!is_strictly_ascending(&[-1, 2]));
        assert!(is_non_decreasing(&[0u32, 1, 1, 4]));
        assert!(!is_non_decreasing(&[2u32, 1]));
    }
}
