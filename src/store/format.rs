// In: src/store/format.rs

//! The persisted single-blob layout of a store.
//!
//! ```text
//! magic "PFST" | version u16 LE | flags u8 | body
//! body = header_len u32 LE | JSON header | payload bytes...
//! ```
//!
//! Flag bit 0 means the body is one zstd frame. The JSON header records the
//! store kind, the codec descriptors, the rating scale, optional entity labels
//! and, per slot, the logical length plus the shape and byte size of each
//! payload. Payloads follow in slot order: all user slots, then all item
//! slots, ids before values. Word payloads are stored little-endian.
//!
//! The layout is tied to this crate's codec implementations; there is no
//! cross-version compatibility.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::codec::policy::{self, CodecPlan};
use crate::codec::{Codec, CodecKind, EncodedBlock, Payload, PayloadShape};
use crate::error::{Axis, PrefError};
use crate::index::EntityIndex;
use crate::kernels::zstd;
use crate::store::adjacency::{CompressedAdjacency, Slot, StoreSummary};
use crate::store::{BinaryPreferenceStore, RatingPreferenceStore};
use crate::traits::PreferenceSource;

//==================================================================================
// 1. Format Constants
//==================================================================================
pub const STORE_MAGIC: &[u8; 4] = b"PFST";
pub const STORE_FORMAT_VERSION: u16 = 1;
const FLAG_ZSTD: u8 = 0b0000_0001;
/// magic(4) + version(2) + flags(1)
const PREAMBLE_SIZE: usize = 7;

//==================================================================================
// 2. Public Types
//==================================================================================

/// Raw identifiers of both entity spaces, persisted alongside a store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub users: EntityIndex<String>,
    pub items: EntityIndex<String>,
}

/// A borrowed store of either layout.
#[derive(Debug, Clone, Copy)]
pub enum StoreRef<'a> {
    Binary(&'a BinaryPreferenceStore),
    Rating(&'a RatingPreferenceStore),
}

impl<'a> From<&'a BinaryPreferenceStore> for StoreRef<'a> {
    fn from(store: &'a BinaryPreferenceStore) -> Self {
        StoreRef::Binary(store)
    }
}

impl<'a> From<&'a RatingPreferenceStore> for StoreRef<'a> {
    fn from(store: &'a RatingPreferenceStore) -> Self {
        StoreRef::Rating(store)
    }
}

/// A loaded store of either layout.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Binary(BinaryPreferenceStore),
    Rating(RatingPreferenceStore),
}

impl AnyStore {
    pub fn as_source(&self) -> &dyn PreferenceSource {
        match self {
            AnyStore::Binary(store) => store,
            AnyStore::Rating(store) => store,
        }
    }

    pub fn summary(&self) -> StoreSummary {
        match self {
            AnyStore::Binary(store) => store.summary(),
            AnyStore::Rating(store) => store.summary(),
        }
    }

    pub fn as_store_ref(&self) -> StoreRef<'_> {
        match self {
            AnyStore::Binary(store) => StoreRef::Binary(store),
            AnyStore::Rating(store) => StoreRef::Rating(store),
        }
    }
}

//==================================================================================
// 3. Header Model
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum StoreKind {
    Binary,
    Rating,
}

#[derive(Serialize, Deserialize, Debug)]
struct BlockEntry {
    shape: PayloadShape,
    size: usize,
}

#[derive(Serialize, Deserialize, Debug)]
struct SlotEntry {
    len: u32,
    ids: BlockEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<BlockEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
struct StoreHeader {
    kind: StoreKind,
    num_preferences: usize,
    user_id_codec: CodecKind,
    item_id_codec: CodecKind,
    #[serde(default)]
    value_codec: Option<CodecKind>,
    #[serde(default)]
    rating_scale: Option<f64>,
    #[serde(default)]
    labels: Option<Labels>,
    users: Vec<Option<SlotEntry>>,
    items: Vec<Option<SlotEntry>>,
}

//==================================================================================
// 4. Writer
//==================================================================================

/// Serialises a store, optionally with its entity labels.
pub fn to_bytes(
    store: StoreRef<'_>,
    labels: Option<&Labels>,
    zstd_level: Option<i32>,
) -> Result<Vec<u8>, PrefError> {
    let (kind, adjacency, rating_scale) = match store {
        StoreRef::Binary(s) => (StoreKind::Binary, s.adjacency(), None),
        StoreRef::Rating(s) => (StoreKind::Rating, s.adjacency(), Some(s.rating_scale())),
    };
    if let Some(labels) = labels {
        if labels.users.len() != adjacency.num_users() || labels.items.len() != adjacency.num_items() {
            return Err(PrefError::Format(format!(
                "labels cover {} users / {} items, the store has {} / {}",
                labels.users.len(),
                labels.items.len(),
                adjacency.num_users(),
                adjacency.num_items()
            )));
        }
    }

    let codecs = adjacency.codecs();
    let header = StoreHeader {
        kind,
        num_preferences: adjacency.num_preferences(),
        user_id_codec: codecs.user_ids.kind(),
        item_id_codec: codecs.item_ids.kind(),
        value_codec: codecs.values.as_ref().map(|c| c.kind()),
        rating_scale,
        labels: labels.cloned(),
        users: adjacency.by_user.iter().map(slot_entry).collect(),
        items: adjacency.by_item.iter().map(slot_entry).collect(),
    };
    let header_json = serde_json::to_vec(&header)?;
    let header_len = u32::try_from(header_json.len())
        .map_err(|_| PrefError::Format("header exceeds 4 GiB".to_string()))?;

    let payload_size: usize = adjacency
        .by_user
        .iter()
        .chain(adjacency.by_item.iter())
        .flatten()
        .map(|s| s.ids.size_bytes() + s.values.as_ref().map_or(0, EncodedBlock::size_bytes))
        .sum();
    let mut body = Vec::with_capacity(4 + header_json.len() + payload_size);
    body.extend_from_slice(&header_len.to_le_bytes());
    body.extend_from_slice(&header_json);
    for slot in adjacency.by_user.iter().chain(adjacency.by_item.iter()).flatten() {
        write_payload(&mut body, slot.ids.payload());
        if let Some(values) = &slot.values {
            write_payload(&mut body, values.payload());
        }
    }

    let mut out = Vec::with_capacity(PREAMBLE_SIZE + body.len());
    out.extend_from_slice(STORE_MAGIC);
    out.extend_from_slice(&STORE_FORMAT_VERSION.to_le_bytes());
    match zstd_level {
        Some(level) => {
            out.push(FLAG_ZSTD);
            zstd::encode(&body, &mut out, level)?;
        }
        None => {
            out.push(0);
            out.extend_from_slice(&body);
        }
    }
    log::debug!(
        "serialised {:?} store: {} header bytes, {} payload bytes, {} total",
        kind,
        header_json.len(),
        payload_size,
        out.len()
    );
    Ok(out)
}

pub fn write_to<W: Write>(
    writer: &mut W,
    store: StoreRef<'_>,
    labels: Option<&Labels>,
    zstd_level: Option<i32>,
) -> Result<(), PrefError> {
    let bytes = to_bytes(store, labels, zstd_level)?;
    writer.write_all(&bytes)?;
    Ok(())
}

fn slot_entry(slot: &Option<Slot>) -> Option<SlotEntry> {
    slot.as_ref().map(|s| SlotEntry {
        len: s.ids.len() as u32,
        ids: block_entry(&s.ids),
        values: s.values.as_ref().map(block_entry),
    })
}

fn block_entry(block: &EncodedBlock) -> BlockEntry {
    BlockEntry {
        shape: block.payload().shape(),
        size: block.size_bytes(),
    }
}

fn write_payload(out: &mut Vec<u8>, payload: &Payload) {
    match payload {
        Payload::Bytes(bytes) => out.extend_from_slice(bytes),
        Payload::Words(words) => {
            for word in words.iter() {
                out.extend_from_slice(&word.to_le_bytes());
            }
        }
    }
}

//==================================================================================
// 5. Reader
//==================================================================================

/// Restores a store and its labels, if any were written.
pub fn from_bytes(bytes: &[u8]) -> Result<(AnyStore, Option<Labels>), PrefError> {
    if bytes.len() < PREAMBLE_SIZE {
        return Err(PrefError::Format(format!(
            "blob of {} bytes is too short",
            bytes.len()
        )));
    }
    if &bytes[0..4] != STORE_MAGIC {
        return Err(PrefError::Format("invalid magic number".to_string()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != STORE_FORMAT_VERSION {
        return Err(PrefError::Format(format!(
            "unsupported format version: expected {}, got {}",
            STORE_FORMAT_VERSION, version
        )));
    }
    let flags = bytes[6];
    if flags & !FLAG_ZSTD != 0 {
        return Err(PrefError::Format(format!("unknown flags {:#04x}", flags)));
    }

    let decompressed;
    let body: &[u8] = if flags & FLAG_ZSTD != 0 {
        let mut buf = Vec::new();
        zstd::decode(&bytes[PREAMBLE_SIZE..], &mut buf)?;
        decompressed = buf;
        &decompressed
    } else {
        &bytes[PREAMBLE_SIZE..]
    };

    let mut cursor = ByteCursor::new(body);
    let header_len = u32::from_le_bytes(cursor.take_array()?) as usize;
    let header: StoreHeader = serde_json::from_slice(cursor.take(header_len)?)?;

    let value_expected = header.value_codec.is_some();
    if value_expected != (header.kind == StoreKind::Rating) {
        return Err(PrefError::Format(
            "value codec present on a binary store or missing on a rating store".to_string(),
        ));
    }

    let codecs = CodecPlan {
        user_ids: policy::from_kind(header.user_id_codec),
        item_ids: policy::from_kind(header.item_id_codec),
        values: header.value_codec.map(policy::from_kind),
    };
    let (num_users, num_items) = (header.users.len(), header.items.len());
    let by_user =
        read_slots(&mut cursor, &header.users, &codecs, Axis::User, num_items, header.num_preferences)?;
    let by_item =
        read_slots(&mut cursor, &header.items, &codecs, Axis::Item, num_users, header.num_preferences)?;
    if !cursor.is_exhausted() {
        return Err(PrefError::Format(format!(
            "{} trailing bytes after the last payload",
            cursor.remaining()
        )));
    }
    if let Some(labels) = &header.labels {
        if labels.users.len() != by_user.len() || labels.items.len() != by_item.len() {
            return Err(PrefError::Format(
                "entity labels do not match the slot counts".to_string(),
            ));
        }
    }

    let adjacency = CompressedAdjacency::new(by_user, by_item, codecs, header.num_preferences);
    let store = match header.kind {
        StoreKind::Binary => AnyStore::Binary(BinaryPreferenceStore::from_adjacency(adjacency)),
        StoreKind::Rating => {
            let scale = header.rating_scale.unwrap_or(1.0);
            if !(scale.is_finite() && scale > 0.0) {
                return Err(PrefError::Format(format!("invalid rating scale {}", scale)));
            }
            AnyStore::Rating(RatingPreferenceStore::from_parts(adjacency, scale))
        }
    };
    Ok((store, header.labels))
}

pub fn read_from<R: Read>(reader: &mut R) -> Result<(AnyStore, Option<Labels>), PrefError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    from_bytes(&bytes)
}

fn read_slots(
    cursor: &mut ByteCursor<'_>,
    entries: &[Option<SlotEntry>],
    codecs: &CodecPlan,
    axis: Axis,
    counterparts: usize,
    num_preferences: usize,
) -> Result<Vec<Option<Slot>>, PrefError> {
    let id_codec = match axis {
        Axis::User => codecs.user_ids.as_ref(),
        Axis::Item => codecs.item_ids.as_ref(),
    };
    let id_shape = id_codec.kind().payload_shape();
    let value_codec = codecs.values.as_deref();
    let value_shape = value_codec.map(|c| c.kind().payload_shape());

    let mut total = 0usize;
    let mut slots = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let Some(entry) = entry else {
            slots.push(None);
            continue;
        };
        if entry.len == 0 {
            return Err(PrefError::Format(format!("empty {} slot {} is not marked absent", axis, idx)));
        }
        if entry.values.as_ref().map(|b| b.shape) != value_shape {
            return Err(PrefError::Format(format!(
                "{} slot {} value block does not match the value codec",
                axis, idx
            )));
        }
        let ids = read_block(cursor, entry.len, &entry.ids, id_shape)?;
        let values = match &entry.values {
            Some(block) => Some(read_block(cursor, entry.len, block, block.shape)?),
            None => None,
        };
        let slot = Slot { ids, values };
        check_slot(&slot, id_codec, value_codec, counterparts)
            .map_err(|err| PrefError::Decode(format!("{} slot {}: {}", axis, idx, err)))?;
        total += entry.len as usize;
        slots.push(Some(slot));
    }
    if total != num_preferences {
        return Err(PrefError::Format(format!(
            "{} index holds {} preferences, header says {}",
            axis, total, num_preferences
        )));
    }
    Ok(slots)
}

/// Decodes a slot once, so reads of a loaded store never meet a malformed
/// payload. Identifiers must come back strictly ascending and inside
/// `[0, counterparts)`.
fn check_slot(
    slot: &Slot,
    id_codec: &dyn Codec,
    value_codec: Option<&dyn Codec>,
    counterparts: usize,
) -> Result<(), PrefError> {
    let len = slot.ids.len();
    let mut ids = vec![0i32; len];
    id_codec.decode(&slot.ids, &mut ids, len)?;
    if !id_codec.is_integrated() {
        // Wrapping: corrupted gaps must fail the check below, not overflow.
        for k in 1..len {
            ids[k] = ids[k].wrapping_add(ids[k - 1]);
        }
    }
    let ascending = ids.windows(2).all(|w| w[0] < w[1]);
    let in_range = ids.first().map_or(true, |&first| first >= 0)
        && ids.last().map_or(true, |&last| (last as usize) < counterparts);
    if !(ascending && in_range) {
        return Err(PrefError::Decode(format!(
            "identifiers are not strictly ascending within [0, {})",
            counterparts
        )));
    }

    if let (Some(codec), Some(block)) = (value_codec, &slot.values) {
        let mut values = vec![0i32; len];
        codec.decode(block, &mut values, len)?;
    }
    Ok(())
}

fn read_block(
    cursor: &mut ByteCursor<'_>,
    len: u32,
    entry: &BlockEntry,
    expected: PayloadShape,
) -> Result<EncodedBlock, PrefError> {
    if entry.shape != expected {
        return Err(PrefError::Format(format!(
            "payload shape {:?} does not match the codec's {:?}",
            entry.shape, expected
        )));
    }
    let raw = cursor.take(entry.size)?;
    let payload = match entry.shape {
        PayloadShape::Bytes => Payload::Bytes(raw.into()),
        PayloadShape::Words => {
            if raw.len() % 4 != 0 {
                return Err(PrefError::Format(format!(
                    "word payload of {} bytes is not a multiple of 4",
                    raw.len()
                )));
            }
            let words: Vec<u32> = raw
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            Payload::Words(words.into_boxed_slice())
        }
    };
    Ok(EncodedBlock::from_parts(len, payload))
}

/// Bounds-checked reads over the body.
struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PrefError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                PrefError::Format(format!(
                    "truncated blob: wanted {} bytes at offset {}, {} available",
                    n,
                    self.pos,
                    self.remaining()
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], PrefError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.bytes.len()
    }
}
