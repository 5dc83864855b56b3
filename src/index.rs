// In: src/index.rs

//! A bijection between opaque entity identifiers and dense `u32` indices.
//!
//! The store only ever sees dense indices in `[0, N)`. `EntityIndex` is the
//! boundary that maps raw user / item identifiers (strings from a file, numeric
//! ids from another system) onto that range and back.

use std::borrow::Borrow;
use std::hash::Hash;

use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Dense, gap-free, immutable id <-> index mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityIndex<T: Eq + Hash + Clone> {
    ids: Vec<T>,
    positions: HashMap<T, u32>,
}

impl<T: Eq + Hash + Clone> EntityIndex<T> {
    /// Assigns indices in first-seen order; repeated ids keep their first index.
    pub fn from_ids<I: IntoIterator<Item = T>>(ids: I) -> Self {
        let iter = ids.into_iter();
        let (lower, _) = iter.size_hint();
        let mut index = Self {
            ids: Vec::with_capacity(lower),
            positions: HashMap::with_capacity(lower),
        };
        for id in iter {
            if !index.positions.contains_key(&id) {
                index.positions.insert(id.clone(), index.ids.len() as u32);
                index.ids.push(id);
            }
        }
        index
    }

    /// Dense index of `id`, if known.
    pub fn idx<Q>(&self, id: &Q) -> Option<u32>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.get(id).copied()
    }

    /// Raw identifier at `idx`, if in range.
    pub fn id(&self, idx: u32) -> Option<&T> {
        self.ids.get(idx as usize)
    }

    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All identifiers, ordered by index.
    pub fn ids(&self) -> &[T] {
        &self.ids
    }
}

// Only the ordered id list is persisted; the lookup table is rebuilt on load.
impl<T: Eq + Hash + Clone + Serialize> Serialize for EntityIndex<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ids.serialize(serializer)
    }
}

impl<'de, T: Eq + Hash + Clone + DeserializeOwned> Deserialize<'de> for EntityIndex<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ids = Vec::<T>::deserialize(deserializer)?;
        let expected = ids.len();
        let index = Self::from_ids(ids);
        if index.len() != expected {
            return Err(serde::de::Error::custom(
                "entity index contains duplicate identifiers",
            ));
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_dense_and_first_seen() {
        let index = EntityIndex::from_ids(vec!["b", "a", "b", "c"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.idx(&"b"), Some(0));
        assert_eq!(index.idx(&"a"), Some(1));
        assert_eq!(index.idx(&"c"), Some(2));
        assert_eq!(index.idx(&"zzz"), None);
        assert_eq!(index.id(1), Some(&"a"));
        assert_eq!(index.id(3), None);
        assert_eq!(index.ids(), &["b", "a", "c"]);
    }

    #[test]
    fn test_serde_keeps_the_order() {
        let index = EntityIndex::from_ids((10u64..15).rev());
        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, "[14,13,12,11,10]");
        let back: EntityIndex<u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, index);
        assert_eq!(back.idx(&12), Some(2));
    }

    #[test]
    fn test_duplicate_ids_in_a_persisted_index_are_rejected() {
        let result: Result<EntityIndex<String>, _> = serde_json::from_str(r#"["a","b","a"]"#);
        assert!(result.is_err());
    }
}
