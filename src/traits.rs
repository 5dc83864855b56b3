// In: src/traits.rs

//! The read contract every preference store implements.
//!
//! Downstream consumers (similarity, factorisation, evaluation) are written
//! against [`PreferenceSource`] only, so they work with either store layout and
//! never see codecs or compressed blocks.

use crate::store::{IdIter, Preferences};

/// One decoded preference: the counterpart's dense index and its value.
///
/// For implicit feedback the value is always `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdxPref {
    pub idx: u32,
    pub value: f64,
}

impl IdxPref {
    pub fn new(idx: u32, value: f64) -> Self {
        Self { idx, value }
    }
}

/// Read access to a dual-indexed preference matrix.
///
/// Every row / column read decodes from the compressed representation. Indices
/// outside `[0, N)` and entities without preferences yield empty results.
pub trait PreferenceSource: Send + Sync {
    fn num_users(&self) -> usize;

    fn num_items(&self) -> usize;

    /// Total number of distinct (user, item) pairs.
    fn num_preferences(&self) -> usize;

    /// The items of a user, ascending by item index.
    fn preferences_of_user(&self, uidx: u32) -> Preferences;

    /// The users of an item, ascending by user index.
    fn preferences_of_item(&self, iidx: u32) -> Preferences;

    /// Item indices only.
    fn user_ids(&self, uidx: u32) -> IdIter;

    /// User indices only.
    fn item_ids(&self, iidx: u32) -> IdIter;

    /// Point lookup. Decodes the user's whole row, then binary searches it.
    fn preference(&self, uidx: u32, iidx: u32) -> Option<IdxPref>;

    /// Row length, without decoding.
    fn user_preference_count(&self, uidx: u32) -> usize;

    /// Column length, without decoding.
    fn item_preference_count(&self, iidx: u32) -> usize;

    fn num_users_with_preferences(&self) -> usize;

    fn num_items_with_preferences(&self) -> usize;

    /// Users holding at least one preference, ascending.
    fn users_with_preferences(&self) -> Box<dyn Iterator<Item = u32> + '_>;

    /// Items holding at least one preference, ascending.
    fn items_with_preferences(&self) -> Box<dyn Iterator<Item = u32> + '_>;
}
