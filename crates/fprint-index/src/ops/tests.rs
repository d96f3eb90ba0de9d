//! Tests for the index operators.

use super::*;
use crate::key::deserialize_record;
use fprint_core::record::{DOM_SIZE, R_SIZE};
use fprint_fp::bytes::{record_to_bytes, union_from_bytes, union_to_bytes};

fn patterned(seed: u8, songlen: u32, ncp: usize) -> FPrint {
    let mut r = [0u8; R_SIZE];
    for (i, b) in r.iter_mut().enumerate() {
        *b = ((i as u8).wrapping_mul(13)).wrapping_add(seed);
    }
    let mut dom = [0u8; DOM_SIZE];
    for (i, b) in dom.iter_mut().enumerate() {
        *b = ((i as u8).wrapping_mul(7)).wrapping_add(seed);
    }
    let cprint: Vec<i32> = (0..ncp as i32)
        .map(|i| i.wrapping_mul(37).wrapping_add(seed as i32))
        .collect();
    FPrint::new(songlen, 192, 0, r, dom, cprint)
}

fn record_blob(seed: u8, songlen: u32, ncp: usize) -> Vec<u8> {
    record_to_bytes(&key::compress_record(&patterned(seed, songlen, ncp)))
}

fn singleton_blob(seed: u8, songlen: u32, ncp: usize) -> Vec<u8> {
    let fp = key::compress_record(&patterned(seed, songlen, ncp));
    union_to_bytes(&FPrintUnion::from_record(&fp))
}

#[test]
fn test_strategy_numbers() {
    assert_eq!(Strategy::from_number(3), Some(Strategy::Eq));
    assert_eq!(Strategy::from_number(6), Some(Strategy::Match));
    assert_eq!(Strategy::from_number(12), Some(Strategy::Neq));
    assert_eq!(Strategy::from_number(4), None);
    assert_eq!(Strategy::Eq.number(), 3);
}

#[test]
fn test_union_covers_all_entries() {
    let blobs = [
        singleton_blob(1, 100, 50),
        singleton_blob(2, 140, 80),
        singleton_blob(3, 120, 30),
    ];
    let refs: Vec<&[u8]> = blobs.iter().map(|b| b.as_slice()).collect();
    let merged = gist_union(&refs).unwrap();
    let u = union_from_bytes(&merged).unwrap();

    assert_eq!(u.min_songlen, 100);
    assert_eq!(u.max_songlen, 140);
    // key length equals the longest input
    assert_eq!(u.cprint_len(), 80);

    for blob in &blobs {
        let v = union_from_bytes(blob).unwrap();
        for i in 0..R_SIZE {
            assert_eq!(v.r[i] & u.r[i], v.r[i]);
        }
        for i in 0..DOM_SIZE {
            assert_eq!(v.dom[i] & u.dom[i], v.dom[i]);
        }
    }
}

#[test]
fn test_union_of_empty_vector_fails() {
    assert!(matches!(
        gist_union(&[]),
        Err(IndexError::EmptyEntryVector)
    ));
}

#[test]
fn test_union_is_idempotent() {
    let a = singleton_blob(5, 100, 40);
    let merged = gist_union(&[a.as_slice(), a.as_slice()]).unwrap();
    let again = gist_union(&[merged.as_slice(), a.as_slice()]).unwrap();
    assert!(gist_same(&merged, &again));
}

#[test]
fn test_penalty_zero_for_covered_identical() {
    let key_blob = singleton_blob(4, 150, 60);
    let new_blob = record_blob(4, 150, 60);
    let penalty = gist_penalty(&key_blob, &new_blob);
    assert_eq!(penalty, 0.0);
}

#[test]
fn test_penalty_songlen_growth_dominates() {
    let key_blob = gist_union(&[
        singleton_blob(4, 100, 60).as_slice(),
        singleton_blob(4, 110, 60).as_slice(),
    ])
    .unwrap();
    // inside the envelope with a different fingerprint: match cost only
    let near = record_blob(9, 105, 60);
    // an identical fingerprint far outside: growth cost dominates
    let far = record_blob(4, 200, 60);
    let p_near = gist_penalty(&key_blob, &near);
    let p_far = gist_penalty(&key_blob, &far);
    assert!(p_near <= PENALTY_MATCH_WEIGHT);
    assert!(p_far > PENALTY_SONGLEN_WEIGHT / 2.0);
    assert!(p_far > p_near);
}

#[test]
fn test_penalty_missing_side() {
    let key_blob = singleton_blob(4, 100, 60);
    assert_eq!(gist_penalty(&[], &key_blob), PENALTY_UNMATCHABLE);
    assert_eq!(gist_penalty(&key_blob, &[]), PENALTY_UNMATCHABLE);
}

#[test]
fn test_same_compares_stored_images() {
    let a = singleton_blob(4, 100, 60);
    let b = singleton_blob(4, 100, 60);
    let c = singleton_blob(5, 100, 60);
    let shorter = singleton_blob(4, 100, 30);
    assert!(gist_same(&a, &b));
    assert!(!gist_same(&a, &c));
    assert!(!gist_same(&a, &shorter));
    assert!(!gist_same(&a, &[]));
}

#[test]
fn test_consistent_leaf_strategies() {
    let stored = record_blob(6, 120, 300);
    let query = record_to_bytes(&patterned(6, 120, 300));
    let other = record_to_bytes(&patterned(6, 200, 300));

    let mut recheck = true;
    assert!(gist_consistent(&stored, true, &query, Strategy::Eq, &mut recheck).unwrap());
    assert!(!recheck);

    let mut recheck = true;
    assert!(gist_consistent(&stored, true, &query, Strategy::Match, &mut recheck).unwrap());
    assert!(!recheck);

    let mut recheck = true;
    assert!(!gist_consistent(&stored, true, &query, Strategy::Neq, &mut recheck).unwrap());

    // a duration-gated pair is unequal and unmatched
    let mut recheck = true;
    assert!(!gist_consistent(&stored, true, &other, Strategy::Eq, &mut recheck).unwrap());
    let mut recheck = true;
    assert!(gist_consistent(&stored, true, &other, Strategy::Neq, &mut recheck).unwrap());
}

#[test]
fn test_consistent_node_in_envelope() {
    let node_key = gist_union(&[
        singleton_blob(6, 110, 200).as_slice(),
        singleton_blob(7, 130, 200).as_slice(),
    ])
    .unwrap();
    let query = record_to_bytes(&patterned(6, 110, 200));

    let mut recheck = true;
    let ok = gist_consistent(&node_key, false, &query, Strategy::Match, &mut recheck).unwrap();
    assert!(ok);
    assert!(recheck);
}

#[test]
fn test_consistent_node_near_envelope_short_song() {
    // query at 50s against a [100,110] subtree: within the 0.6 band
    let node_key = gist_union(&[
        singleton_blob(6, 100, 200).as_slice(),
        singleton_blob(6, 110, 200).as_slice(),
    ])
    .unwrap();
    let query = record_to_bytes(&patterned(6, 50, 200));

    let mut recheck = true;
    let ok = gist_consistent(&node_key, false, &query, Strategy::Match, &mut recheck).unwrap();
    assert!(ok);
    assert!(recheck);
}

#[test]
fn test_consistent_node_rejects_distant_envelope() {
    // 0.8 away relative to the subtree minimum: outside every band
    let node_key = gist_union(&[
        singleton_blob(6, 250, 200).as_slice(),
        singleton_blob(6, 260, 200).as_slice(),
    ])
    .unwrap();
    let query = record_to_bytes(&patterned(6, 50, 200));

    let mut recheck = true;
    let ok = gist_consistent(&node_key, false, &query, Strategy::Match, &mut recheck).unwrap();
    assert!(!ok);
    assert!(!recheck);
}

#[test]
fn test_consistent_node_rejects_long_query_outside_envelope() {
    let node_key = gist_union(&[
        singleton_blob(6, 50, 200).as_slice(),
        singleton_blob(6, 60, 200).as_slice(),
    ])
    .unwrap();
    let query = record_to_bytes(&patterned(6, 200, 200));

    let mut recheck = true;
    let ok = gist_consistent(&node_key, false, &query, Strategy::Match, &mut recheck).unwrap();
    assert!(!ok);
    assert!(!recheck);
}

#[test]
fn test_consistent_node_mid_band_boundaries() {
    // 100s query against [105,107]: 4.8% below the minimum, inside the
    // 7% band for songs under 110s
    let node_key = gist_union(&[
        singleton_blob(6, 105, 200).as_slice(),
        singleton_blob(6, 107, 200).as_slice(),
    ])
    .unwrap();
    let query = record_to_bytes(&patterned(6, 100, 200));
    let mut recheck = true;
    assert!(gist_consistent(&node_key, false, &query, Strategy::Match, &mut recheck).unwrap());

    // 100s query against [110,120]: 9.1% below, outside the band
    let node_key = gist_union(&[
        singleton_blob(6, 110, 200).as_slice(),
        singleton_blob(6, 120, 200).as_slice(),
    ])
    .unwrap();
    let mut recheck = true;
    assert!(!gist_consistent(&node_key, false, &query, Strategy::Match, &mut recheck).unwrap());
}

#[test]
fn test_picksplit_rejects_degenerate_vectors() {
    assert!(matches!(
        gist_picksplit(&[], true),
        Err(IndexError::EmptyEntryVector)
    ));
    let one = record_blob(1, 100, 50);
    assert!(matches!(
        gist_picksplit(&[one.as_slice()], true),
        Err(IndexError::SingleEntrySplit)
    ));
}

#[test]
fn test_picksplit_two_entries() {
    let a = record_blob(1, 100, 50);
    let b = record_blob(2, 200, 50);
    let split = gist_picksplit(&[a.as_slice(), b.as_slice()], true).unwrap();
    assert_eq!(split.left, vec![0]);
    assert_eq!(split.right, vec![1]);

    let lk = union_from_bytes(&split.left_key).unwrap();
    let rk = union_from_bytes(&split.right_key).unwrap();
    assert_eq!((lk.min_songlen, lk.max_songlen), (100, 100));
    assert_eq!((rk.min_songlen, rk.max_songlen), (200, 200));
}

#[test]
fn test_picksplit_six_identical_leaves() {
    let blob = record_blob(9, 150, 240);
    let blobs: Vec<&[u8]> = std::iter::repeat(blob.as_slice()).take(6).collect();
    let split = gist_picksplit(&blobs, true).unwrap();

    assert_eq!(split.left.len(), 3);
    assert_eq!(split.right.len(), 3);

    // both keys equal each other and the single merged key
    assert!(gist_same(&split.left_key, &split.right_key));
    let merged = singleton_blob(9, 150, 240);
    assert!(gist_same(&split.left_key, &merged));
}

#[test]
fn test_picksplit_balances_skewed_durations() {
    let blobs = [
        record_blob(1, 100, 100),
        record_blob(2, 200, 100),
        record_blob(3, 200, 100),
        record_blob(4, 200, 100),
    ];
    let refs: Vec<&[u8]> = blobs.iter().map(|b| b.as_slice()).collect();
    let split = gist_picksplit(&refs, true).unwrap();

    assert_eq!(split.left.len() + split.right.len(), 4);
    assert!(split.left.len() >= 2, "left side got {:?}", split.left);
    assert!(split.right.len() >= 2, "right side got {:?}", split.right);
}

#[test]
fn test_picksplit_keys_cover_their_sides() {
    let blobs = [
        record_blob(1, 90, 150),
        record_blob(2, 120, 150),
        record_blob(3, 150, 150),
        record_blob(4, 180, 150),
        record_blob(5, 210, 150),
    ];
    let refs: Vec<&[u8]> = blobs.iter().map(|b| b.as_slice()).collect();
    let split = gist_picksplit(&refs, true).unwrap();

    for (side, key_blob) in [(&split.left, &split.left_key), (&split.right, &split.right_key)] {
        assert!(!side.is_empty());
        let k = union_from_bytes(key_blob).unwrap();
        for &ix in side.iter() {
            let fp = deserialize_record(&blobs[ix]).unwrap();
            assert!(k.min_songlen <= fp.songlen && fp.songlen <= k.max_songlen);
            for i in 0..R_SIZE {
                assert_eq!(fp.r[i] & k.r[i], fp.r[i]);
            }
            for i in 0..DOM_SIZE {
                assert_eq!(fp.dom[i] & k.dom[i], fp.dom[i]);
            }
        }
    }
}

#[test]
fn test_picksplit_internal_keys() {
    // node-level split: entries are union keys with real envelopes
    let mk = |seed: u8, lo: u32, hi: u32| -> Vec<u8> {
        let mut u = FPrintUnion::from_record(&key::compress_record(&patterned(seed, lo, 120)));
        u.set_envelope(lo, hi);
        union_to_bytes(&u)
    };
    let blobs = [mk(1, 80, 100), mk(2, 90, 130), mk(3, 160, 200), mk(4, 170, 220)];
    let refs: Vec<&[u8]> = blobs.iter().map(|b| b.as_slice()).collect();
    let split = gist_picksplit(&refs, false).unwrap();

    assert!(split.left.len() >= 2);
    assert!(split.right.len() >= 2);

    // every child's envelope stays inside its side key's envelope
    for (side, key_blob) in [(&split.left, &split.left_key), (&split.right, &split.right_key)] {
        let k = union_from_bytes(key_blob).unwrap();
        for &ix in side.iter() {
            let child = union_from_bytes(&blobs[ix]).unwrap();
            assert!(k.min_songlen <= child.min_songlen);
            assert!(k.max_songlen >= child.max_songlen);
        }
    }
}
