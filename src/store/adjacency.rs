// In: src/store/adjacency.rs

//! The dual-indexed block arrays shared by both store layouts.
//!
//! `CompressedAdjacency` owns one slot per user and one per item. A slot holds
//! the compressed counterpart ids and, for rating data, the compressed values
//! in the same order. Empty rows and columns hold `None`. Nothing decoded is
//! ever retained: every accessor decodes into a fresh buffer.

use std::sync::Arc;

use serde::Serialize;

use crate::codec::policy::CodecPlan;
use crate::codec::{Codec, CodecKind, CodecStats, EncodedBlock};
use crate::error::Axis;
use crate::kernels::delta;

/// The compressed row (or column) of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub(crate) ids: EncodedBlock,
    pub(crate) values: Option<EncodedBlock>,
}

impl Slot {
    /// Logical length; ids and values always agree.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &EncodedBlock {
        &self.ids
    }

    pub fn values(&self) -> Option<&EncodedBlock> {
        self.values.as_ref()
    }
}

/// Footprint and codec summary of a store.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StoreSummary {
    pub num_users: usize,
    pub num_items: usize,
    pub num_preferences: usize,
    pub users_with_preferences: usize,
    pub items_with_preferences: usize,
    pub user_id_codec: CodecKind,
    pub item_id_codec: CodecKind,
    pub value_codec: Option<CodecKind>,
    /// Payload bytes of all identifier blocks, both indices.
    pub id_bytes: usize,
    /// Payload bytes of all value blocks, both indices.
    pub value_bytes: usize,
}

impl StoreSummary {
    /// Average payload bits per stored identifier.
    pub fn bits_per_id(&self) -> f64 {
        if self.num_preferences == 0 {
            0.0
        } else {
            (self.id_bytes * 8) as f64 / (2 * self.num_preferences) as f64
        }
    }

    pub fn bits_per_value(&self) -> f64 {
        if self.num_preferences == 0 {
            0.0
        } else {
            (self.value_bytes * 8) as f64 / (2 * self.num_preferences) as f64
        }
    }
}

/// Two mirrored arrays of compressed slots plus the codecs that wrote them.
#[derive(Debug, Clone)]
pub struct CompressedAdjacency {
    pub(crate) by_user: Vec<Option<Slot>>,
    pub(crate) by_item: Vec<Option<Slot>>,
    pub(crate) codecs: CodecPlan,
    pub(crate) num_preferences: usize,
}

impl CompressedAdjacency {
    pub(crate) fn new(
        by_user: Vec<Option<Slot>>,
        by_item: Vec<Option<Slot>>,
        codecs: CodecPlan,
        num_preferences: usize,
    ) -> Self {
        debug_assert_eq!(lengths_sum(&by_user), num_preferences);
        debug_assert_eq!(lengths_sum(&by_item), num_preferences);
        Self {
            by_user,
            by_item,
            codecs,
            num_preferences,
        }
    }

    pub fn num_users(&self) -> usize {
        self.by_user.len()
    }

    pub fn num_items(&self) -> usize {
        self.by_item.len()
    }

    pub fn num_preferences(&self) -> usize {
        self.num_preferences
    }

    pub fn codecs(&self) -> &CodecPlan {
        &self.codecs
    }

    fn slots(&self, axis: Axis) -> &[Option<Slot>] {
        match axis {
            Axis::User => &self.by_user,
            Axis::Item => &self.by_item,
        }
    }

    fn id_codec(&self, axis: Axis) -> &Arc<dyn Codec> {
        match axis {
            Axis::User => &self.codecs.user_ids,
            Axis::Item => &self.codecs.item_ids,
        }
    }

    /// The slot at `idx`, `None` when out of range or empty.
    pub fn slot(&self, axis: Axis, idx: u32) -> Option<&Slot> {
        self.slots(axis).get(idx as usize).and_then(Option::as_ref)
    }

    /// Logical length at `idx`, without decoding.
    pub fn len_of(&self, axis: Axis, idx: u32) -> usize {
        self.slot(axis, idx).map_or(0, Slot::len)
    }

    /// Decodes the counterpart ids at `idx`, ascending.
    pub fn decode_ids(&self, axis: Axis, idx: u32) -> Vec<i32> {
        let Some(slot) = self.slot(axis, idx) else {
            return Vec::new();
        };
        let codec = self.id_codec(axis);
        let mut buf = vec![0i32; slot.len()];
        decode_or_panic(codec.as_ref(), &slot.ids, &mut buf, axis, idx);
        if !codec.is_integrated() {
            delta::atled(&mut buf);
        }
        buf
    }

    /// Decodes the quantised values at `idx`; empty for binary data.
    pub fn decode_values(&self, axis: Axis, idx: u32) -> Vec<i32> {
        let (Some(slot), Some(codec)) = (self.slot(axis, idx), self.codecs.values.as_ref()) else {
            return Vec::new();
        };
        let Some(block) = slot.values.as_ref() else {
            return Vec::new();
        };
        let mut buf = vec![0i32; block.len()];
        decode_or_panic(codec.as_ref(), block, &mut buf, axis, idx);
        buf
    }

    pub fn count_non_empty(&self, axis: Axis) -> usize {
        self.slots(axis).iter().filter(|s| s.is_some()).count()
    }

    /// Indices holding at least one preference, ascending.
    pub fn non_empty(&self, axis: Axis) -> impl Iterator<Item = u32> + '_ {
        self.slots(axis)
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| i as u32)
    }

    /// Sum of logical lengths over one axis.
    pub fn total_len(&self, axis: Axis) -> usize {
        lengths_sum(self.slots(axis))
    }

    /// Encoder statistics of the identifier codecs (both indices).
    ///
    /// Zero for a store loaded from a persisted blob, since nothing was encoded.
    pub fn id_stats(&self) -> CodecStats {
        self.codecs.user_ids.stats().merge(self.codecs.item_ids.stats())
    }

    pub fn value_stats(&self) -> Option<CodecStats> {
        self.codecs.values.as_ref().map(|c| c.stats())
    }

    pub fn summary(&self) -> StoreSummary {
        let mut id_bytes = 0;
        let mut value_bytes = 0;
        for slot in self.by_user.iter().chain(self.by_item.iter()).flatten() {
            id_bytes += slot.ids.size_bytes();
            value_bytes += slot.values.as_ref().map_or(0, EncodedBlock::size_bytes);
        }
        StoreSummary {
            num_users: self.num_users(),
            num_items: self.num_items(),
            num_preferences: self.num_preferences,
            users_with_preferences: self.count_non_empty(Axis::User),
            items_with_preferences: self.count_non_empty(Axis::Item),
            user_id_codec: self.codecs.user_ids.kind(),
            item_id_codec: self.codecs.item_ids.kind(),
            value_codec: self.codecs.values.as_ref().map(|c| c.kind()),
            id_bytes,
            value_bytes,
        }
    }
}

fn lengths_sum(slots: &[Option<Slot>]) -> usize {
    slots.iter().flatten().map(Slot::len).sum()
}

/// Blocks are either produced by the matching codec or decoded once when a
/// blob is loaded, so a failure here means memory corruption.
fn decode_or_panic(codec: &dyn Codec, block: &EncodedBlock, buf: &mut [i32], axis: Axis, idx: u32) {
    if let Err(err) = codec.decode(block, buf, block.len()) {
        panic!("corrupted {} block at index {}: {}", axis, idx, err);
    }
}
