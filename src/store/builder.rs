// In: src/store/builder.rs

//! Bulk construction of the two mirrored indices.
//!
//! The tuple stream is consumed exactly once and grouped into two independent
//! collections (by user and by item). Each group is then finished on its own
//! rayon task: sorted by counterpart, de-duplicated, delta coded when the id
//! codec needs it, and encoded. Every task writes one slot of a pre-sized
//! array, so no locking is involved.

use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::codec::policy::{CodecPlan, CodecSpec};
use crate::codec::Codec;
use crate::error::{Axis, PrefError};
use crate::kernels::delta;
use crate::store::adjacency::{CompressedAdjacency, Slot};

/// A dense `(user, item, quantised value)` tuple. Binary data carries `0`.
pub(crate) type QuantisedTuple = (u32, u32, i32);

/// `(counterpart index, quantised value)`
type Entry = (u32, i32);

//==================================================================================
// 1. Entry Point
//==================================================================================

/// Builds both indices from a tuple stream.
///
/// The codec specs must already be parsed and validated: configuration errors
/// are reported before this function consumes the first tuple.
pub(crate) fn build_adjacency<I>(
    num_users: usize,
    num_items: usize,
    tuples: I,
    ids: &CodecSpec,
    values: Option<&CodecSpec>,
    threads: Option<usize>,
) -> Result<CompressedAdjacency, PrefError>
where
    I: IntoIterator<Item = Result<QuantisedTuple, PrefError>>,
{
    for (axis, n) in [(Axis::User, num_users), (Axis::Item, num_items)] {
        if n > i32::MAX as usize {
            return Err(PrefError::Config(format!(
                "{} count {} exceeds the 31-bit identifier space",
                axis, n
            )));
        }
    }

    let start = Instant::now();
    let (by_user, by_item) = group(num_users, num_items, tuples)?;
    let grouped_in = start.elapsed();

    let plan = CodecPlan::resolve(ids, values, num_users, num_items);

    let encode_start = Instant::now();
    let encode_both = || {
        let value_codec = plan.values.as_deref();
        let (users, items) = rayon::join(
            || encode_axis(by_user, plan.user_ids.as_ref(), value_codec),
            || encode_axis(by_item, plan.item_ids.as_ref(), value_codec),
        );
        Ok::<_, PrefError>((users?, items?))
    };
    let (by_user, by_item) = match threads {
        Some(n) => ThreadPoolBuilder::new()
            .num_threads(n)
            .build()?
            .install(encode_both)?,
        None => encode_both()?,
    };

    let num_preferences: usize = by_user.iter().flatten().map(Slot::len).sum();
    log::info!(
        "built {} users x {} items, {} preferences | grouping: {:.2?} | encoding: {:.2?}",
        by_user.len(),
        by_item.len(),
        num_preferences,
        grouped_in,
        encode_start.elapsed(),
    );

    Ok(CompressedAdjacency::new(by_user, by_item, plan, num_preferences))
}

//==================================================================================
// 2. Grouping
//==================================================================================

fn group<I>(
    num_users: usize,
    num_items: usize,
    tuples: I,
) -> Result<(Vec<Vec<Entry>>, Vec<Vec<Entry>>), PrefError>
where
    I: IntoIterator<Item = Result<QuantisedTuple, PrefError>>,
{
    let mut by_user: Vec<Vec<Entry>> = vec![Vec::new(); num_users];
    let mut by_item: Vec<Vec<Entry>> = vec![Vec::new(); num_items];
    for tuple in tuples {
        let (u, i, v) = tuple?;
        let user_row = by_user.get_mut(u as usize).ok_or(PrefError::IndexOutOfRange {
            axis: Axis::User,
            index: u as usize,
            len: num_users,
        })?;
        if i as usize >= num_items {
            return Err(PrefError::IndexOutOfRange {
                axis: Axis::Item,
                index: i as usize,
                len: num_items,
            });
        }
        user_row.push((i, v));
        by_item[i as usize].push((u, v));
    }
    Ok((by_user, by_item))
}

//==================================================================================
// 3. Parallel Encoding
//==================================================================================

fn encode_axis(
    groups: Vec<Vec<Entry>>,
    id_codec: &dyn Codec,
    value_codec: Option<&dyn Codec>,
) -> Result<Vec<Option<Slot>>, PrefError> {
    groups
        .into_par_iter()
        .map(|entries| encode_group(entries, id_codec, value_codec))
        .collect()
}

fn encode_group(
    mut entries: Vec<Entry>,
    id_codec: &dyn Codec,
    value_codec: Option<&dyn Codec>,
) -> Result<Option<Slot>, PrefError> {
    if entries.is_empty() {
        return Ok(None);
    }
    // Stable sort, so the first occurrence of a duplicate pair survives in both indices.
    entries.sort_by_key(|&(counterpart, _)| counterpart);
    entries.dedup_by_key(|&mut (counterpart, _)| counterpart);

    let mut ids: Vec<i32> = entries.iter().map(|&(c, _)| c as i32).collect();
    if !id_codec.is_integrated() {
        delta::delta(&mut ids);
    }
    let ids = id_codec.encode(&ids)?;

    let values = match value_codec {
        Some(codec) => {
            let raw: Vec<i32> = entries.iter().map(|&(_, v)| v).collect();
            Some(codec.encode(&raw)?)
        }
        None => None,
    };
    Ok(Some(Slot { ids, values }))
}
