// In: src/store/binary.rs

//! The implicit-feedback store: only counterpart ids are compressed, every
//! preference value reads back as `1.0`.

use crate::codec::policy;
use crate::config::StoreConfig;
use crate::error::{Axis, PrefError};
use crate::store::adjacency::{CompressedAdjacency, StoreSummary};
use crate::store::builder;
use crate::store::{format, Preferences};
use crate::traits::{IdxPref, PreferenceSource};

#[derive(Debug, Clone)]
pub struct BinaryPreferenceStore {
    inner: CompressedAdjacency,
}

impl BinaryPreferenceStore {
    /// Builds the store from dense `(user, item)` pairs.
    ///
    /// # Errors
    /// Configuration errors are returned before `tuples` is touched. Indices
    /// outside `[0, num_users)` / `[0, num_items)` fail with
    /// `PrefError::IndexOutOfRange`.
    pub fn build<I>(
        num_users: usize,
        num_items: usize,
        tuples: I,
        config: &StoreConfig,
    ) -> Result<Self, PrefError>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let ids = policy::parse_binary_codecs(config)?;
        let inner = builder::build_adjacency(
            num_users,
            num_items,
            tuples.into_iter().map(|(u, i)| Ok((u, i, 0))),
            &ids,
            None,
            config.threads,
        )?;
        Ok(Self { inner })
    }

    pub(crate) fn from_adjacency(inner: CompressedAdjacency) -> Self {
        Self { inner }
    }

    pub fn adjacency(&self) -> &CompressedAdjacency {
        &self.inner
    }

    pub fn summary(&self) -> StoreSummary {
        self.inner.summary()
    }

    /// Serialises the store into a single blob (see `store::format`).
    pub fn to_bytes(&self, zstd_level: Option<i32>) -> Result<Vec<u8>, PrefError> {
        format::to_bytes(self.into(), None, zstd_level)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrefError> {
        match format::from_bytes(bytes)?.0 {
            format::AnyStore::Binary(store) => Ok(store),
            format::AnyStore::Rating(_) => Err(PrefError::Format(
                "blob holds a rating store, not a binary store".to_string(),
            )),
        }
    }

    fn preferences(&self, axis: Axis, idx: u32) -> Preferences {
        Preferences::binary(self.inner.decode_ids(axis, idx))
    }
}

impl PreferenceSource for BinaryPreferenceStore {
    adjacency_source_methods!();

    fn preference(&self, uidx: u32, iidx: u32) -> Option<IdxPref> {
        let ids = self.inner.decode_ids(Axis::User, uidx);
        ids.binary_search(&(iidx as i32))
            .ok()
            .map(|_| IdxPref::new(iidx, 1.0))
    }
}
