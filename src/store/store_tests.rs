// In: src/store/store_tests.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::format::{self, AnyStore, Labels};
use super::*;
use crate::config::StoreConfig;
use crate::error::{Axis, PrefError};
use crate::index::EntityIndex;
use crate::traits::{IdxPref, PreferenceSource};

//==================================================================================
// Test Helpers
//==================================================================================

/// Every identifier codec name, delta-coded and integrated alike.
const ID_CODECS: &[&str] = &[
    "null", "gamma", "zeta", "zeta_1", "zeta_5", "rice", "fixed", "fixed_12", "vbyte", "ivbyte",
    "for", "ifor", "simple", "optpfd", "newpfd", "fastpfor", "succinct",
];

/// The non-integrated codecs, which accept non-monotonic runs.
const VALUE_CODECS: &[&str] = &[
    "null", "gamma", "zeta", "rice", "vbyte", "for", "simple", "optpfd", "newpfd",
    "fastpfor",
];

const SCENARIO: [(u32, u32); 3] = [(0, 0), (0, 2), (1, 1)];

fn binary(codec: &str, num_users: usize, num_items: usize, tuples: &[(u32, u32)]) -> BinaryPreferenceStore {
    BinaryPreferenceStore::build(
        num_users,
        num_items,
        tuples.iter().copied(),
        &StoreConfig::with_id_codec(codec),
    )
    .unwrap_or_else(|e| panic!("building with '{}' failed: {}", codec, e))
}

fn ids_of(prefs: Preferences) -> Vec<u32> {
    prefs.map(|p| p.idx).collect()
}

/// Random tuples with repeated pairs, plus the expected adjacency of each view.
fn random_tuples(
    seed: u64,
    num_users: u32,
    num_items: u32,
    count: usize,
) -> (Vec<(u32, u32)>, BTreeMap<u32, BTreeSet<u32>>, BTreeMap<u32, BTreeSet<u32>>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tuples = Vec::with_capacity(count);
    let mut by_user: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    let mut by_item: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    for _ in 0..count {
        // Skew towards low ids so some rows are long and some entities stay empty.
        let u = rng.random_range(0..num_users) % (num_users - 3);
        let i = rng.random_range(0..num_items).min(rng.random_range(0..num_items));
        tuples.push((u, i));
        by_user.entry(u).or_default().insert(i);
        by_item.entry(i).or_default().insert(u);
    }
    (tuples, by_user, by_item)
}

/// Checks every read invariant of a store against the expected adjacency.
fn assert_matches_model(
    store: &dyn PreferenceSource,
    by_user: &BTreeMap<u32, BTreeSet<u32>>,
    by_item: &BTreeMap<u32, BTreeSet<u32>>,
    label: &str,
) {
    let expected_total: usize = by_user.values().map(BTreeSet::len).sum();
    assert_eq!(store.num_preferences(), expected_total, "{}", label);

    let mut user_total = 0;
    for u in 0..store.num_users() as u32 {
        let got = ids_of(store.preferences_of_user(u));
        let want: Vec<u32> = by_user.get(&u).map(|s| s.iter().copied().collect()).unwrap_or_default();
        assert_eq!(got, want, "{}: user {}", label, u);
        assert!(got.windows(2).all(|w| w[0] < w[1]), "{}: user {} not ascending", label, u);
        assert_eq!(store.user_preference_count(u), got.len(), "{}", label);
        for &i in &got {
            assert!(store.item_ids(i).any(|x| x == u), "{}: ({}, {}) missing from item view", label, u, i);
        }
        user_total += got.len();
    }

    let mut item_total = 0;
    for i in 0..store.num_items() as u32 {
        let got: Vec<u32> = store.item_ids(i).collect();
        let want: Vec<u32> = by_item.get(&i).map(|s| s.iter().copied().collect()).unwrap_or_default();
        assert_eq!(got, want, "{}: item {}", label, i);
        assert_eq!(store.item_preference_count(i), got.len(), "{}", label);
        for &u in &got {
            assert!(store.user_ids(u).any(|x| x == i), "{}: ({}, {}) missing from user view", label, u, i);
        }
        item_total += got.len();
    }

    assert_eq!(user_total, expected_total, "{}", label);
    assert_eq!(item_total, expected_total, "{}", label);
    assert_eq!(store.num_users_with_preferences(), by_user.len(), "{}", label);
    assert_eq!(store.num_items_with_preferences(), by_item.len(), "{}", label);
    assert!(store.users_with_preferences().eq(by_user.keys().copied()), "{}", label);
    assert!(store.items_with_preferences().eq(by_item.keys().copied()), "{}", label);
}

//==================================================================================
// Construction & Read Invariants
//==================================================================================

#[test]
fn test_three_tuple_scenario_with_null_codec() {
    let store = binary("null", 2, 3, &SCENARIO);
    assert_eq!(ids_of(store.preferences_of_user(0)), vec![0, 2]);
    assert_eq!(ids_of(store.preferences_of_user(1)), vec![1]);
    assert_eq!(ids_of(store.preferences_of_item(0)), vec![0]);
    assert_eq!(ids_of(store.preferences_of_item(1)), vec![1]);
    assert_eq!(ids_of(store.preferences_of_item(2)), vec![0]);
    assert_eq!(store.num_preferences(), 3);
    assert!(store.preferences_of_user(0).all(|p| p.value == 1.0));
}

#[test]
fn test_codec_choice_is_observationally_transparent() {
    let reference = binary("null", 2, 3, &SCENARIO);
    for &codec in ID_CODECS {
        let store = binary(codec, 2, 3, &SCENARIO);
        for u in 0..2 {
            assert!(
                store.preferences_of_user(u).eq(reference.preferences_of_user(u)),
                "{}: user {}",
                codec,
                u
            );
        }
        for i in 0..3 {
            assert!(
                store.preferences_of_item(i).eq(reference.preferences_of_item(i)),
                "{}: item {}",
                codec,
                i
            );
        }
        assert_eq!(store.num_preferences(), 3, "{}", codec);
    }
}

#[test]
fn test_unknown_codec_fails_before_any_tuple_is_read() {
    let untouched = std::iter::from_fn(|| -> Option<(u32, u32)> {
        panic!("the tuple stream must not be consumed")
    });
    let err = BinaryPreferenceStore::build(2, 3, untouched, &StoreConfig::with_id_codec("bogus"))
        .unwrap_err();
    assert!(matches!(err, PrefError::UnknownCodec(ref name) if name == "bogus"));
    assert!(err.is_config_error());

    let untouched = std::iter::from_fn(|| -> Option<(u32, u32, f64)> {
        panic!("the tuple stream must not be consumed")
    });
    let config = StoreConfig::with_id_codec("succinct").value_codec("gamma");
    let err = RatingPreferenceStore::build(2, 3, untouched, &config).unwrap_err();
    assert!(matches!(err, PrefError::IncompatibleCodecs { .. }));
}

#[test]
fn test_random_dataset_invariants_for_every_codec() {
    let (tuples, by_user, by_item) = random_tuples(7, 40, 300, 2_000);
    for &codec in ID_CODECS {
        let store = binary(codec, 40, 300, &tuples);
        assert_matches_model(&store, &by_user, &by_item, codec);
    }
}

#[test]
fn test_decode_is_idempotent() {
    let (tuples, _, _) = random_tuples(11, 20, 100, 500);
    let store = binary("optpfd", 20, 100, &tuples);
    for u in 0..20 {
        let first: Vec<IdxPref> = store.preferences_of_user(u).collect();
        let second: Vec<IdxPref> = store.preferences_of_user(u).collect();
        assert_eq!(first, second);
    }
}

#[test]
fn test_duplicates_are_dropped_in_both_views() {
    let tuples = [(0, 1), (0, 1), (1, 0), (0, 1), (1, 0), (0, 0)];
    for &codec in ID_CODECS {
        let store = binary(codec, 2, 2, &tuples);
        assert_eq!(store.num_preferences(), 3, "{}", codec);
        assert_eq!(store.user_ids(0).collect::<Vec<_>>(), vec![0, 1], "{}", codec);
        assert_eq!(store.item_ids(1).collect::<Vec<_>>(), vec![0], "{}", codec);
        assert_eq!(store.item_ids(0).collect::<Vec<_>>(), vec![0, 1], "{}", codec);
    }
}

#[test]
fn test_missing_and_out_of_range_entities_read_empty() {
    let store = binary("gamma", 4, 5, &SCENARIO);
    assert_eq!(store.preferences_of_user(3).len(), 0);
    assert_eq!(store.preferences_of_user(99).len(), 0);
    assert_eq!(store.preferences_of_item(4).len(), 0);
    assert_eq!(store.item_ids(u32::MAX).len(), 0);
    assert_eq!(store.user_preference_count(99), 0);
    assert!(store.preference(99, 0).is_none());
    assert_eq!(store.num_users_with_preferences(), 2);
    assert_eq!(store.users_with_preferences().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(store.items_with_preferences().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn test_out_of_range_tuples_are_rejected() {
    let config = StoreConfig::default();
    let err = BinaryPreferenceStore::build(2, 3, vec![(0, 0), (2, 1)], &config).unwrap_err();
    assert!(matches!(
        err,
        PrefError::IndexOutOfRange { axis: Axis::User, index: 2, len: 2 }
    ));
    let err = BinaryPreferenceStore::build(2, 3, vec![(0, 3)], &config).unwrap_err();
    assert!(matches!(
        err,
        PrefError::IndexOutOfRange { axis: Axis::Item, index: 3, len: 3 }
    ));
}

#[test]
fn test_point_lookup() {
    let store = binary("succinct", 2, 3, &SCENARIO);
    assert_eq!(store.preference(0, 2), Some(IdxPref::new(2, 1.0)));
    assert_eq!(store.preference(0, 1), None);
    assert_eq!(store.preference(1, 1), Some(IdxPref::new(1, 1.0)));
}

#[test]
fn test_empty_store() {
    let store = binary("zeta", 3, 3, &[]);
    assert_eq!(store.num_preferences(), 0);
    assert_eq!(store.num_users_with_preferences(), 0);
    assert!(store.adjacency().slot(Axis::User, 0).is_none());
    assert_eq!(store.summary().bits_per_id(), 0.0);
}

#[test]
fn test_dedicated_thread_pool() {
    let (tuples, by_user, by_item) = random_tuples(3, 30, 80, 600);
    let mut config = StoreConfig::with_id_codec("rice");
    config.threads = Some(2);
    let store = BinaryPreferenceStore::build(30, 80, tuples, &config).unwrap();
    assert_matches_model(&store, &by_user, &by_item, "rice / 2 threads");
}

#[test]
fn test_concurrent_reads_share_one_store() {
    let (tuples, by_user, _) = random_tuples(5, 25, 200, 1_500);
    let store = Arc::new(binary("fastpfor", 25, 200, &tuples));
    std::thread::scope(|scope| {
        for t in 0..4u32 {
            let store = Arc::clone(&store);
            let by_user = &by_user;
            scope.spawn(move || {
                for round in 0..10u32 {
                    let u = (t * 7 + round) % 25;
                    let got: Vec<u32> = store.user_ids(u).collect();
                    let want: Vec<u32> =
                        by_user.get(&u).map(|s| s.iter().copied().collect()).unwrap_or_default();
                    assert_eq!(got, want);
                }
            });
        }
    });
}

#[test]
fn test_summary_and_stats() {
    let (tuples, _, _) = random_tuples(9, 50, 1_000, 4_000);
    let raw = binary("null", 50, 1_000, &tuples);
    let packed = binary("zeta", 50, 1_000, &tuples);

    let raw_summary = raw.summary();
    let packed_summary = packed.summary();
    assert_eq!(raw_summary.num_preferences, packed_summary.num_preferences);
    assert_eq!(raw_summary.bits_per_id(), 32.0);
    assert!(packed_summary.bits_per_id() < 16.0);
    assert!(packed_summary.id_bytes < raw_summary.id_bytes);

    let stats = packed.adjacency().id_stats();
    assert_eq!(stats.values as usize, 2 * packed.num_preferences());
    assert!(stats.fraction_of_uncompressed() < 0.5);
    assert!(packed.adjacency().value_stats().is_none());
}

//==================================================================================
// Rating Store
//==================================================================================

fn random_ratings(seed: u64, num_users: u32, num_items: u32, count: usize) -> Vec<(u32, u32, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let u = rng.random_range(0..num_users);
            let i = rng.random_range(0..num_items);
            let half_stars = rng.random_range(2..=10u32);
            (u, i, half_stars as f64 / 2.0)
        })
        .collect()
}

/// Expected `(user, item) -> rating`, first occurrence wins.
fn rating_model(tuples: &[(u32, u32, f64)]) -> BTreeMap<(u32, u32), f64> {
    let mut model = BTreeMap::new();
    for &(u, i, r) in tuples {
        model.entry((u, i)).or_insert(r);
    }
    model
}

#[test]
fn test_rating_values_follow_their_ids_under_every_value_codec() {
    let tuples = random_ratings(21, 30, 120, 1_500);
    let model = rating_model(&tuples);
    for id_codec in ["gamma", "zeta_2", "null"] {
        for &value_codec in VALUE_CODECS {
            let mut config = StoreConfig::with_id_codec(id_codec).value_codec(value_codec);
            config.rating_scale = 2.0;
            let store = RatingPreferenceStore::build(30, 120, tuples.iter().copied(), &config)
                .unwrap_or_else(|e| panic!("{} / {}: {}", id_codec, value_codec, e));
            let label = format!("{} / {}", id_codec, value_codec);

            assert_eq!(store.num_preferences(), model.len(), "{}", label);
            for u in 0..30 {
                let prefs: Vec<IdxPref> = store.preferences_of_user(u).collect();
                let want: Vec<IdxPref> = model
                    .range((u, 0)..(u + 1, 0))
                    .map(|(&(_, i), &r)| IdxPref::new(i, r))
                    .collect();
                assert_eq!(prefs, want, "{}: user {}", label, u);
                let values: Vec<f64> = store.user_values(u).collect();
                assert_eq!(values, want.iter().map(|p| p.value).collect::<Vec<_>>(), "{}", label);
            }
            for i in 0..120 {
                for p in store.preferences_of_item(i) {
                    assert_eq!(Some(&p.value), model.get(&(p.idx, i)), "{}: item {}", label, i);
                }
                assert_eq!(store.item_values(i).len(), store.item_preference_count(i));
            }
        }
    }
}

#[test]
fn test_rating_point_lookup_and_first_duplicate_wins() {
    let tuples = vec![(0, 1, 4.0), (0, 1, 2.0), (1, 0, 3.0), (0, 0, 5.0)];
    let config = StoreConfig::with_id_codec("zeta").value_codec("gamma");
    let store = RatingPreferenceStore::build(2, 2, tuples, &config).unwrap();

    assert_eq!(store.num_preferences(), 3);
    assert_eq!(store.preference(0, 1), Some(IdxPref::new(1, 4.0)));
    assert_eq!(store.preference(0, 0), Some(IdxPref::new(0, 5.0)));
    assert_eq!(store.preference(1, 1), None);
    assert_eq!(store.item_values(1).collect::<Vec<_>>(), vec![4.0]);
    assert_eq!(store.user_values(0).collect::<Vec<_>>(), vec![5.0, 4.0]);
}

#[test]
fn test_negative_ratings() {
    let tuples = vec![(0, 0, -2.0), (0, 1, 3.0), (1, 1, -0.5)];
    let mut config = StoreConfig::with_id_codec("gamma").value_codec("vbyte");
    config.rating_scale = 2.0;
    let store = RatingPreferenceStore::build(2, 2, tuples.clone(), &config).unwrap();
    assert_eq!(store.user_values(0).collect::<Vec<_>>(), vec![-2.0, 3.0]);
    assert_eq!(store.item_values(1).collect::<Vec<_>>(), vec![3.0, -0.5]);

    let config = StoreConfig::with_id_codec("rice").value_codec("for");
    let store = RatingPreferenceStore::build(2, 2, tuples, &config).unwrap();
    assert_eq!(store.item_values(0).collect::<Vec<_>>(), vec![-2.0]);
}

#[test]
fn test_rating_codec_rejection_matrix() {
    for (ids, values, accepted) in [
        ("gamma", "null", true),
        ("fixed", "null", true),
        ("succinct", "null", true),
        ("ivbyte", "null", true),
        ("fixed", "fixed", false),
        ("fixed", "gamma", false),
        ("gamma", "fixed", false),
        ("gamma", "fixed_4", false),
        ("gamma", "succinct", false),
        ("gamma", "ivbyte", false),
        ("null", "ifor", false),
        ("succinct", "gamma", false),
        ("ifor", "fixed", false),
        ("ivbyte", "vbyte", false),
    ] {
        let config = StoreConfig::with_id_codec(ids).value_codec(values);
        let result = RatingPreferenceStore::build(2, 2, vec![(0, 0, 1.0), (1, 1, 2.0)], &config);
        match result {
            Ok(store) => {
                assert!(accepted, "{} / {} should be rejected", ids, values);
                assert_eq!(store.num_preferences(), 2);
            }
            Err(err) => {
                assert!(!accepted, "{} / {} should be accepted: {}", ids, values, err);
                assert!(err.is_config_error());
            }
        }
    }
}

#[test]
fn test_both_layouts_agree_on_shared_reads() {
    let (pairs, _, _) = random_tuples(5, 25, 60, 400);
    let ratings: Vec<(u32, u32, f64)> = pairs.iter().map(|&(u, i)| (u, i, 3.0)).collect();
    let binary_store = binary("zeta", 25, 60, &pairs);
    let config = StoreConfig::with_id_codec("gamma").value_codec("vbyte");
    let rating_store = RatingPreferenceStore::build(25, 60, ratings, &config).unwrap();

    let a: &dyn PreferenceSource = &binary_store;
    let b: &dyn PreferenceSource = &rating_store;
    assert_eq!(a.num_users(), b.num_users());
    assert_eq!(a.num_items(), b.num_items());
    assert_eq!(a.num_preferences(), b.num_preferences());
    assert_eq!(a.num_users_with_preferences(), b.num_users_with_preferences());
    assert_eq!(a.num_items_with_preferences(), b.num_items_with_preferences());
    assert!(a.users_with_preferences().eq(b.users_with_preferences()));
    assert!(a.items_with_preferences().eq(b.items_with_preferences()));
    for u in 0..25 {
        assert_eq!(a.user_preference_count(u), b.user_preference_count(u));
        assert!(a.user_ids(u).eq(b.user_ids(u)), "user {}", u);
        assert!(a.preferences_of_user(u).map(|p| p.idx).eq(b.user_ids(u)));
    }
    for i in 0..60 {
        assert_eq!(a.item_preference_count(i), b.item_preference_count(i));
        assert!(a.item_ids(i).eq(b.item_ids(i)), "item {}", i);
        assert!(b.preferences_of_item(i).all(|p| p.value == 3.0));
    }
}

//==================================================================================
// Persistence
//==================================================================================

#[test]
fn test_binary_blob_roundtrip_with_and_without_zstd() {
    let (tuples, by_user, by_item) = random_tuples(13, 40, 250, 2_000);
    for codec in ["null", "simple", "zeta_2", "succinct", "fixed"] {
        let store = binary(codec, 40, 250, &tuples);
        for level in [None, Some(3)] {
            let bytes = store.to_bytes(level).unwrap();
            assert_eq!(&bytes[0..4], format::STORE_MAGIC);
            let restored = BinaryPreferenceStore::from_bytes(&bytes).unwrap();
            assert_eq!(restored.summary(), store.summary(), "{} {:?}", codec, level);
            assert_matches_model(&restored, &by_user, &by_item, codec);
        }
    }
}

#[test]
fn test_rating_blob_roundtrip_with_labels() {
    let tuples = random_ratings(17, 10, 20, 150);
    let model = rating_model(&tuples);
    let mut config = StoreConfig::with_id_codec("optpfd").value_codec("rice");
    config.rating_scale = 2.0;
    let store = RatingPreferenceStore::build(10, 20, tuples, &config).unwrap();

    let labels = Labels {
        users: EntityIndex::from_ids((0..10).map(|u| format!("user-{}", u))),
        items: EntityIndex::from_ids((0..20).map(|i| format!("item-{}", i))),
    };
    let mut buf = Vec::new();
    format::write_to(&mut buf, (&store).into(), Some(&labels), Some(5)).unwrap();
    let (restored, restored_labels) = format::read_from(&mut buf.as_slice()).unwrap();

    assert_eq!(restored_labels.as_ref(), Some(&labels));
    let AnyStore::Rating(restored) = restored else {
        panic!("expected a rating store");
    };
    assert_eq!(restored.rating_scale(), 2.0);
    for (&(u, i), &r) in &model {
        assert_eq!(restored.preference(u, i), Some(IdxPref::new(i, r)));
    }
    assert_eq!(restored.num_preferences(), model.len());
}

#[test]
fn test_blob_roundtrip_through_a_file() {
    let store = binary("ifor", 2, 3, &SCENARIO);
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), store.to_bytes(None).unwrap()).unwrap();
    let bytes = std::fs::read(file.path()).unwrap();
    let restored = BinaryPreferenceStore::from_bytes(&bytes).unwrap();
    assert_eq!(restored.user_ids(0).collect::<Vec<_>>(), vec![0, 2]);
}

#[test]
fn test_malformed_blobs_are_format_errors() {
    let store = binary("gamma", 2, 3, &SCENARIO);
    let bytes = store.to_bytes(None).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert!(matches!(BinaryPreferenceStore::from_bytes(&bad_magic), Err(PrefError::Format(_))));

    let mut bad_version = bytes.clone();
    bad_version[4] = 0xFF;
    assert!(matches!(BinaryPreferenceStore::from_bytes(&bad_version), Err(PrefError::Format(_))));

    let truncated = &bytes[..bytes.len() - 1];
    assert!(matches!(BinaryPreferenceStore::from_bytes(truncated), Err(PrefError::Format(_))));

    let mut trailing = bytes.clone();
    trailing.push(0);
    assert!(matches!(BinaryPreferenceStore::from_bytes(&trailing), Err(PrefError::Format(_))));

    assert!(BinaryPreferenceStore::from_bytes(b"PF").is_err());
    assert!(RatingPreferenceStore::from_bytes(&bytes).is_err());

    // Payload bytes are decoded at load time, not on the first read.
    let mut corrupted = bytes.clone();
    let n = corrupted.len();
    corrupted[n - 4..].fill(0);
    assert!(matches!(BinaryPreferenceStore::from_bytes(&corrupted), Err(PrefError::Decode(_))));
}

#[test]
fn test_out_of_range_identifiers_in_blob_are_decode_errors() {
    let store = binary("null", 2, 3, &SCENARIO);
    let bytes = store.to_bytes(None).unwrap();
    assert!(BinaryPreferenceStore::from_bytes(&bytes).is_ok());

    // The last payload is item 2's single user id; point it past the user space.
    let mut out_of_range = bytes.clone();
    let n = out_of_range.len();
    out_of_range[n - 4..].copy_from_slice(&7u32.to_le_bytes());
    let err = BinaryPreferenceStore::from_bytes(&out_of_range).unwrap_err();
    assert!(matches!(err, PrefError::Decode(_)), "{}", err);
}
