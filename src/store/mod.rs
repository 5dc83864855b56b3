// In: src/store/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Store Layer
// ====================================================================================
//
// Construction (once):
//
//   1. [BinaryPreferenceStore::build / RatingPreferenceStore::build]
//         |
//         `-> a. Parses the codec names (fails before any tuple is read)
//         |
//         `-> b. Hands the tuple stream to the builder
//
//   2. [builder::build_adjacency]
//         |
//         `-> a. Groups tuples by user and, transposed, by item
//         |
//         `-> b. In parallel per group: sort, dedup, delta (if needed), encode
//
//   3. [CompressedAdjacency]  -> Owns both slot arrays and the codecs
//
// Reads (many, concurrent, `&self` only):
//
//   [preferences_of_user(u)] -> decode slot into a fresh buffer -> undelta
//                            -> `Preferences` iterator owning that buffer
//
// Nothing decoded is cached; every read pays the decode cost again.
// ====================================================================================

/// The [`PreferenceSource`](crate::traits::PreferenceSource) methods shared by
/// both layouts. Expects a `CompressedAdjacency` in `self.inner` and an
/// inherent `self.preferences(axis, idx)`.
macro_rules! adjacency_source_methods {
    () => {
        fn num_users(&self) -> usize {
            self.inner.num_users()
        }

        fn num_items(&self) -> usize {
            self.inner.num_items()
        }

        fn num_preferences(&self) -> usize {
            self.inner.num_preferences()
        }

        fn preferences_of_user(&self, uidx: u32) -> $crate::store::Preferences {
            self.preferences($crate::error::Axis::User, uidx)
        }

        fn preferences_of_item(&self, iidx: u32) -> $crate::store::Preferences {
            self.preferences($crate::error::Axis::Item, iidx)
        }

        fn user_ids(&self, uidx: u32) -> $crate::store::IdIter {
            $crate::store::IdIter::new(self.inner.decode_ids($crate::error::Axis::User, uidx))
        }

        fn item_ids(&self, iidx: u32) -> $crate::store::IdIter {
            $crate::store::IdIter::new(self.inner.decode_ids($crate::error::Axis::Item, iidx))
        }

        fn user_preference_count(&self, uidx: u32) -> usize {
            self.inner.len_of($crate::error::Axis::User, uidx)
        }

        fn item_preference_count(&self, iidx: u32) -> usize {
            self.inner.len_of($crate::error::Axis::Item, iidx)
        }

        fn num_users_with_preferences(&self) -> usize {
            self.inner.count_non_empty($crate::error::Axis::User)
        }

        fn num_items_with_preferences(&self) -> usize {
            self.inner.count_non_empty($crate::error::Axis::Item)
        }

        fn users_with_preferences(&self) -> Box<dyn Iterator<Item = u32> + '_> {
            Box::new(self.inner.non_empty($crate::error::Axis::User))
        }

        fn items_with_preferences(&self) -> Box<dyn Iterator<Item = u32> + '_> {
            Box::new(self.inner.non_empty($crate::error::Axis::Item))
        }
    };
}

pub mod adjacency;
pub(crate) mod builder;
pub mod binary;
pub mod format;
pub mod rating;

pub use adjacency::{CompressedAdjacency, Slot, StoreSummary};
pub use binary::BinaryPreferenceStore;
pub use format::{AnyStore, Labels, StoreRef};
pub use rating::RatingPreferenceStore;

use std::iter::FusedIterator;
use std::vec;

use crate::traits::IdxPref;

//==================================================================================
// Read Iterators
//==================================================================================

/// Decoded preferences of one user or item.
///
/// Owns the decoded buffers, so it is finite and cannot be restarted; read the
/// row again to get a fresh one.
#[derive(Debug, Clone)]
pub struct Preferences {
    ids: vec::IntoIter<i32>,
    values: Option<vec::IntoIter<i32>>,
    scale: f64,
}

impl Preferences {
    /// Implicit feedback: every value is `1.0`.
    pub(crate) fn binary(ids: Vec<i32>) -> Self {
        Self {
            ids: ids.into_iter(),
            values: None,
            scale: 1.0,
        }
    }

    /// Explicit feedback: `values[k]` belongs to `ids[k]`.
    pub(crate) fn rated(ids: Vec<i32>, values: Vec<i32>, scale: f64) -> Self {
        assert_eq!(
            ids.len(),
            values.len(),
            "id and value blocks of one slot must have the same length"
        );
        Self {
            ids: ids.into_iter(),
            values: Some(values.into_iter()),
            scale,
        }
    }

    pub fn empty() -> Self {
        Self::binary(Vec::new())
    }
}

impl Iterator for Preferences {
    type Item = IdxPref;

    fn next(&mut self) -> Option<IdxPref> {
        let idx = self.ids.next()? as u32;
        let value = match self.values.as_mut() {
            Some(values) => values.next().map_or(1.0, |q| q as f64 / self.scale),
            None => 1.0,
        };
        Some(IdxPref { idx, value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for Preferences {}
impl FusedIterator for Preferences {}

/// Decoded counterpart indices of one user or item, ascending.
#[derive(Debug, Clone)]
pub struct IdIter {
    inner: vec::IntoIter<i32>,
}

impl IdIter {
    pub(crate) fn new(ids: Vec<i32>) -> Self {
        Self {
            inner: ids.into_iter(),
        }
    }
}

impl Iterator for IdIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.inner.next().map(|id| id as u32)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for IdIter {}
impl FusedIterator for IdIter {}

/// Decoded ratings of one user or item, in counterpart order.
#[derive(Debug, Clone)]
pub struct ValueIter {
    inner: vec::IntoIter<i32>,
    scale: f64,
}

impl ValueIter {
    pub(crate) fn new(values: Vec<i32>, scale: f64) -> Self {
        Self {
            inner: values.into_iter(),
            scale,
        }
    }
}

impl Iterator for ValueIter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.inner.next().map(|q| q as f64 / self.scale)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ValueIter {}
impl FusedIterator for ValueIter {}

#[cfg(test)]
mod store_tests;
