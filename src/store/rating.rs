// In: src/store/rating.rs

//! The explicit-feedback store.
//!
//! Every slot holds two blocks: the counterpart ids (delta coded when the id
//! codec requires it) and the quantised ratings in the same order, compressed
//! with an independent value codec. Ratings are quantised once at build time as
//! `round(rating * rating_scale)` and divided by the scale again on read.

use crate::codec::policy;
use crate::config::StoreConfig;
use crate::error::{Axis, PrefError};
use crate::store::adjacency::{CompressedAdjacency, StoreSummary};
use crate::store::builder;
use crate::store::{format, Preferences, ValueIter};
use crate::traits::{IdxPref, PreferenceSource};

#[derive(Debug, Clone)]
pub struct RatingPreferenceStore {
    inner: CompressedAdjacency,
    rating_scale: f64,
}

/// `round(rating * scale)` as `i32`.
pub fn quantise(rating: f64, scale: f64) -> Result<i32, PrefError> {
    let q = (rating * scale).round();
    if !q.is_finite() || q < i32::MIN as f64 || q > i32::MAX as f64 {
        return Err(PrefError::Encode(format!(
            "rating {} does not fit a 32-bit integer at scale {}",
            rating, scale
        )));
    }
    Ok(q as i32)
}

impl RatingPreferenceStore {
    /// Builds the store from dense `(user, item, rating)` triples.
    ///
    /// # Errors
    /// Besides the binary store's errors, rejects an integrated value codec and
    /// an integrated id codec paired with anything but `null` values. Both
    /// checks happen before `tuples` is touched.
    pub fn build<I>(
        num_users: usize,
        num_items: usize,
        tuples: I,
        config: &StoreConfig,
    ) -> Result<Self, PrefError>
    where
        I: IntoIterator<Item = (u32, u32, f64)>,
    {
        let (ids, values) = policy::parse_rating_codecs(config)?;
        let scale = config.rating_scale;
        let inner = builder::build_adjacency(
            num_users,
            num_items,
            tuples
                .into_iter()
                .map(|(u, i, rating)| quantise(rating, scale).map(|q| (u, i, q))),
            &ids,
            Some(&values),
            config.threads,
        )?;
        Ok(Self {
            inner,
            rating_scale: scale,
        })
    }

    pub(crate) fn from_parts(inner: CompressedAdjacency, rating_scale: f64) -> Self {
        Self {
            inner,
            rating_scale,
        }
    }

    pub fn adjacency(&self) -> &CompressedAdjacency {
        &self.inner
    }

    pub fn rating_scale(&self) -> f64 {
        self.rating_scale
    }

    pub fn summary(&self) -> StoreSummary {
        self.inner.summary()
    }

    /// Ratings of a user's items, in ascending item order. Ids are not decoded.
    pub fn user_values(&self, uidx: u32) -> ValueIter {
        ValueIter::new(self.inner.decode_values(Axis::User, uidx), self.rating_scale)
    }

    /// Ratings given to an item, in ascending user order.
    pub fn item_values(&self, iidx: u32) -> ValueIter {
        ValueIter::new(self.inner.decode_values(Axis::Item, iidx), self.rating_scale)
    }

    pub fn to_bytes(&self, zstd_level: Option<i32>) -> Result<Vec<u8>, PrefError> {
        format::to_bytes(self.into(), None, zstd_level)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrefError> {
        match format::from_bytes(bytes)?.0 {
            format::AnyStore::Rating(store) => Ok(store),
            format::AnyStore::Binary(_) => Err(PrefError::Format(
                "blob holds a binary store, not a rating store".to_string(),
            )),
        }
    }

    fn preferences(&self, axis: Axis, idx: u32) -> Preferences {
        let ids = self.inner.decode_ids(axis, idx);
        let values = self.inner.decode_values(axis, idx);
        Preferences::rated(ids, values, self.rating_scale)
    }
}

impl PreferenceSource for RatingPreferenceStore {
    adjacency_source_methods!();

    fn preference(&self, uidx: u32, iidx: u32) -> Option<IdxPref> {
        let ids = self.inner.decode_ids(Axis::User, uidx);
        let k = ids.binary_search(&(iidx as i32)).ok()?;
        let values = self.inner.decode_values(Axis::User, uidx);
        Some(IdxPref::new(iidx, values[k] as f64 / self.rating_scale))
    }
}
