//! The index operators.
//!
//! These are the routines a host index calls to maintain and search the
//! tree: building node keys (`union`), costing an insertion (`penalty`),
//! redistributing an overflowing page (`picksplit`), pruning a search
//! (`consistent`), and detecting unchanged keys (`same`). All of them
//! speak the packed blob form and re-slice their inputs defensively.

use crate::key;
use crate::{IndexError, Strategy};
use fprint_core::matching::{is_eq, is_match, is_neq, match_cpfm};
use fprint_core::merge::{
    fprint_merge_one, fprint_merge_one_union, match_fprint_merge, try_match_merges, FPrintUnion,
};
use fprint_core::record::FPrint;
use fprint_fp::bytes;
use std::cmp::Ordering;

/// Penalty returned when either side of the comparison is unusable, so
/// the insertion planner avoids that branch.
pub const PENALTY_UNMATCHABLE: f64 = 1e10;
/// Weight of duration-envelope growth in the penalty. Deliberately
/// dominates the match weight: keys stay duration-clustered first.
pub const PENALTY_SONGLEN_WEIGHT: f64 = 2000.0;
/// Weight of the match distance in the penalty.
pub const PENALTY_MATCH_WEIGHT: f64 = 100.0;
/// Pairwise score above which an all-equal-duration page is still split
/// by similarity instead of down the middle.
pub const ALLEQUAL_MATCH_CUTOFF: f64 = 0.4;
/// Strength of the balance nudge applied while assigning split entries.
pub const WISH_WEIGHT: f64 = 0.1;

/// Build one key covering every entry in `entries`.
///
/// Entries may be leaf keys or node keys; the fold is a pointwise OR with
/// the met duration envelope, so the result's codeword count equals the
/// largest input's (never above [`key::MAX_KEY_CP_LEN`] for stored keys).
pub fn gist_union(entries: &[&[u8]]) -> Result<Vec<u8>, IndexError> {
    let Some((first, rest)) = entries.split_first() else {
        return Err(IndexError::EmptyEntryVector);
    };

    let mut acc = key::deserialize_key(first)?;
    for entry in rest {
        let v = key::deserialize_key(entry)?;
        fprint_merge_one_union(&mut acc, &v);
    }

    Ok(bytes::union_to_bytes(&acc))
}

/// Cost of absorbing record `new` into node key `orig`; lower is better.
pub fn gist_penalty(orig: &[u8], new: &[u8]) -> f64 {
    let orig_key = match key::deserialize_key(orig) {
        Ok(u) => u,
        Err(e) => {
            log::warn!("penalty: unusable node key: {}", e);
            return PENALTY_UNMATCHABLE;
        }
    };
    let new_fp = match key::deserialize_record(new) {
        Ok(fp) => fp,
        Err(e) => {
            log::warn!("penalty: unusable new entry: {}", e);
            return PENALTY_UNMATCHABLE;
        }
    };

    let orig_size = orig_key.max_songlen - orig_key.min_songlen;
    let new_size = orig_key.max_songlen.max(new_fp.songlen)
        - orig_key.min_songlen.min(new_fp.songlen);
    let songlen_diff = if new_size > 0 {
        f64::from(new_size - orig_size) / f64::from(new_size) * PENALTY_SONGLEN_WEIGHT
    } else {
        0.0
    };

    let m = match_fprint_merge(&new_fp, &orig_key);
    let m = if m > 0.0 {
        (1.0 - m) * PENALTY_MATCH_WEIGHT
    } else {
        PENALTY_MATCH_WEIGHT
    };

    m + songlen_diff
}

/// True iff two node keys have identical stored images, letting the host
/// skip rewriting a page whose key did not change.
pub fn gist_same(a: &[u8], b: &[u8]) -> bool {
    match (bytes::peek_cprint_len(a), bytes::peek_cprint_len(b)) {
        (Some(la), Some(lb)) if la == lb => a == b,
        _ => false,
    }
}

/// Search predicate over one tree entry.
///
/// For a leaf key the composite score decides the strategy outright and
/// `recheck` clears: the answer is exact. For a node key the duration
/// envelope and the merge kernel decide whether the subtree can hold a
/// match at all; a rejected node also clears `recheck`.
pub fn gist_consistent(
    entry: &[u8],
    entry_is_leaf: bool,
    query: &[u8],
    strategy: Strategy,
    recheck: &mut bool,
) -> Result<bool, IndexError> {
    let q = match key::deserialize_record(query) {
        Ok(q) => q,
        Err(IndexError::EmptyEntry) => {
            *recheck = false;
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    if entry_is_leaf {
        let leaf = match key::deserialize_record(entry) {
            Ok(fp) => fp,
            Err(IndexError::EmptyEntry) => {
                *recheck = false;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let val = match_cpfm(&q, &leaf);
        *recheck = false;
        return Ok(match strategy {
            Strategy::Eq => is_eq(val),
            Strategy::Neq => is_neq(val),
            Strategy::Match => is_match(val),
        });
    }

    let u = match key::deserialize_key(entry) {
        Ok(u) => u,
        Err(IndexError::EmptyEntry) => {
            *recheck = false;
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    *recheck = true;
    let mut threshold = 0.08;
    let retval;
    if u.min_songlen <= q.songlen && q.songlen <= u.max_songlen {
        if q.songlen > 150 {
            threshold = 0.1;
        } else if q.songlen > 40 && q.songlen < 46 {
            threshold = 0.03;
        }
        retval = match_fprint_merge(&q, &u) > threshold;
    } else if q.songlen < 155 {
        let songlen_diff = if q.songlen < u.min_songlen {
            f64::from(u.min_songlen - q.songlen) / f64::from(u.min_songlen)
        } else {
            f64::from(q.songlen - u.max_songlen) / f64::from(q.songlen)
        };
        let mut accept = false;
        if q.songlen < 61 {
            if (q.songlen < 30 && songlen_diff < 0.8)
                || (q.songlen < 61 && songlen_diff < 0.6)
            {
                accept = match_fprint_merge(&q, &u) > threshold;
            }
        } else if (q.songlen < 110 && songlen_diff < 0.07)
            || (q.songlen < 155 && songlen_diff < 0.05)
        {
            if q.songlen > 150 {
                threshold = 0.15;
            }
            accept = match_fprint_merge(&q, &u) > threshold;
        }
        retval = accept;
    } else {
        // a long query cannot match a subtree of shorter songs
        retval = false;
    }

    if !retval {
        *recheck = false;
    }
    Ok(retval)
}

/// Outcome of a page split: entry indices for each side and the two
/// covering keys, in packed form.
#[derive(Debug)]
pub struct SplitVec {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub left_key: Vec<u8>,
    pub right_key: Vec<u8>,
}

// One deserialized split candidate. Node keys keep a record-shaped view
// of their feature blocks so the pair kernels apply uniformly.
struct SplitItem {
    record: FPrint,
    union_key: Option<FPrintUnion>,
    lo: u32,
    hi: u32,
}

impl SplitItem {
    fn absorb_into(&self, side: &mut FPrintUnion) {
        match &self.union_key {
            Some(u) => fprint_merge_one_union(side, u),
            None => fprint_merge_one(side, &self.record),
        }
    }

    fn as_seed(&self) -> FPrintUnion {
        match &self.union_key {
            Some(u) => u.clone(),
            None => FPrintUnion::from_record(&self.record),
        }
    }
}

struct Match {
    ix1: usize,
    ix2: usize,
    songlen_diff: u32,
    val: f64,
}

fn cmp_matches(a: &Match, b: &Match) -> Ordering {
    a.songlen_diff
        .cmp(&b.songlen_diff)
        .then(a.val.partial_cmp(&b.val).unwrap_or(Ordering::Equal))
}

fn wish(n_left: usize, n_right: usize) -> f64 {
    let d = n_left as i64 - n_right as i64;
    -((d * d * d) as f64 * WISH_WEIGHT)
}

/// Redistribute an overflowing page onto two new ones.
///
/// Seeds are the entries at the duration extremes; the rest are assigned
/// by duration pull first, then by which side they would disturb less,
/// with a cubic nudge toward even page counts. Pages of one entry send
/// the host's descent loop spinning, so both sides always receive at
/// least one entry, and at least two whenever four or more were passed.
pub fn gist_picksplit(entries: &[&[u8]], leaf_split: bool) -> Result<SplitVec, IndexError> {
    let n = entries.len();
    if n == 0 {
        return Err(IndexError::EmptyEntryVector);
    }
    if n == 1 {
        return Err(IndexError::SingleEntrySplit);
    }

    let mut items = Vec::with_capacity(n);
    for entry in entries {
        items.push(deserialize_item(entry, leaf_split)?);
    }

    // Track the duration extremes; the widest-apart entries seed the two
    // sides. No strict winner anywhere means an all-equal page.
    let mut min_songlen = items[0].lo;
    let mut max_songlen = items[0].hi;
    let mut seed_left = 0usize;
    let mut seed_right = 0usize;
    let mut allisequal = true;
    for (i, item) in items.iter().enumerate().skip(1) {
        if min_songlen > item.lo {
            seed_left = i;
            min_songlen = item.lo;
            allisequal = false;
        } else if max_songlen < item.hi {
            seed_right = i;
            max_songlen = item.hi;
            allisequal = false;
        }
    }

    if n == 2 {
        let (l, r) = if allisequal { (0, 1) } else { (seed_left, seed_right) };
        let left_key = items[l].as_seed();
        let right_key = items[r].as_seed();
        log::debug!("picksplit: degenerate two-entry split");
        return Ok(SplitVec {
            left: vec![l],
            right: vec![r],
            left_key: bytes::union_to_bytes(&left_key),
            right_key: bytes::union_to_bytes(&right_key),
        });
    }

    if allisequal {
        // all durations coincide; compare the fingerprints themselves
        let mut matches = Vec::with_capacity(n * (n - 1) / 2);
        for k in 0..n {
            for l in (k + 1)..n {
                matches.push(Match {
                    ix1: k,
                    ix2: l,
                    songlen_diff: 0,
                    val: pair_val(&items[k], &items[l]),
                });
            }
        }
        matches.sort_by(cmp_matches);

        if let Some(last) = matches.last() {
            if last.val > ALLEQUAL_MATCH_CUTOFF {
                // similar enough to cluster: reuse the most-different
                // pair as seeds and fall through to the general split
                seed_left = matches[0].ix1;
                seed_right = matches[0].ix2;
                return general_split(
                    &items,
                    seed_left,
                    seed_right,
                    min_songlen,
                    max_songlen,
                    leaf_split,
                );
            }
        }

        // nothing clusters: split down the middle
        let max_clust_sz = (n + 1) / 2;
        let mut left_key = seed_with_envelope(&items[0], leaf_split, min_songlen, min_songlen);
        let mut right_key =
            seed_with_envelope(&items[n - 1], leaf_split, max_songlen, max_songlen);
        let mut left = vec![0];
        let mut right = vec![n - 1];
        for (k, item) in items.iter().enumerate().take(n - 1).skip(1) {
            if k < max_clust_sz {
                item.absorb_into(&mut left_key);
                left.push(k);
            } else {
                item.absorb_into(&mut right_key);
                right.push(k);
            }
        }
        log::debug!(
            "picksplit: all-equal middle split {}/{}",
            left.len(),
            right.len()
        );
        return finish_split(&items, left, right, left_key, right_key);
    }

    general_split(&items, seed_left, seed_right, min_songlen, max_songlen, leaf_split)
}

fn deserialize_item(entry: &[u8], leaf_split: bool) -> Result<SplitItem, IndexError> {
    if leaf_split {
        let record = key::deserialize_record(entry)?;
        let songlen = record.songlen;
        Ok(SplitItem {
            record,
            union_key: None,
            lo: songlen,
            hi: songlen,
        })
    } else {
        let u = key::deserialize_key(entry)?;
        let record = FPrint::new(
            u.min_songlen,
            u.bit_rate,
            0,
            u.r,
            u.dom,
            u.cprint().to_vec(),
        );
        let (lo, hi) = (u.min_songlen, u.max_songlen);
        Ok(SplitItem {
            record,
            union_key: Some(u),
            lo,
            hi,
        })
    }
}

fn pair_val(a: &SplitItem, b: &SplitItem) -> f64 {
    match &b.union_key {
        Some(u) => match_fprint_merge(&a.record, u),
        None => match_cpfm(&a.record, &b.record),
    }
}

// Leaf seeds anchor one extreme of the envelope; node seeds keep their
// own envelope so every covered record stays covered.
fn seed_with_envelope(item: &SplitItem, leaf_split: bool, lo: u32, hi: u32) -> FPrintUnion {
    let mut k = item.as_seed();
    if leaf_split {
        k.set_envelope(lo, hi);
    }
    k
}

fn general_split(
    items: &[SplitItem],
    seed_left: usize,
    seed_right: usize,
    min_songlen: u32,
    max_songlen: u32,
    leaf_split: bool,
) -> Result<SplitVec, IndexError> {
    let n = items.len();
    let mut left_key = seed_with_envelope(&items[seed_left], leaf_split, min_songlen, min_songlen);
    let mut right_key =
        seed_with_envelope(&items[seed_right], leaf_split, max_songlen, max_songlen);
    let mut left = vec![seed_left];
    let mut right = vec![seed_right];

    // Entries whose duration sits mid-envelope and whose fingerprint fits
    // either side come first; the hard cases are placed last, once the
    // side keys have taken shape.
    let mut matches: Vec<Match> = items
        .iter()
        .enumerate()
        .map(|(k, item)| Match {
            ix1: k,
            ix2: k,
            songlen_diff: (item.hi - min_songlen).min(max_songlen - item.lo),
            val: try_match_merges(&right_key, &left_key, &item.record)
                .min(try_match_merges(&left_key, &right_key, &item.record)),
        })
        .collect();
    matches.sort_by(cmp_matches);

    for m in &matches {
        let k = m.ix1;
        if k == seed_left || k == seed_right {
            continue;
        }
        let item = &items[k];
        let pull_left = item.hi - min_songlen;
        let pull_right = max_songlen - item.lo;
        if pull_left < pull_right {
            item.absorb_into(&mut left_key);
            left.push(k);
        } else if pull_left > pull_right {
            item.absorb_into(&mut right_key);
            right.push(k);
        } else {
            let tmatch_left = try_match_merges(&right_key, &left_key, &item.record);
            let tmatch_right = try_match_merges(&left_key, &right_key, &item.record);
            if tmatch_left < tmatch_right + wish(left.len(), right.len()) {
                item.absorb_into(&mut left_key);
                left.push(k);
            } else if tmatch_left > tmatch_right {
                item.absorb_into(&mut right_key);
                right.push(k);
            } else if left.len() < right.len() {
                item.absorb_into(&mut left_key);
                left.push(k);
            } else {
                item.absorb_into(&mut right_key);
                right.push(k);
            }
        }
    }

    log::debug!(
        "picksplit: general split {}/{} envelope [{},{}]",
        left.len(),
        right.len(),
        min_songlen,
        max_songlen
    );
    finish_split(items, left, right, left_key, right_key)
}

fn finish_split(
    items: &[SplitItem],
    mut left: Vec<usize>,
    mut right: Vec<usize>,
    mut left_key: FPrintUnion,
    mut right_key: FPrintUnion,
) -> Result<SplitVec, IndexError> {
    // Single-entry pages loop the host's descent; pull the most recently
    // assigned entries over. The donor key keeps covering its remaining
    // entries (a union never shrinks), only the taker's key grows.
    while left.len() < 2 && right.len() > 2 {
        let Some(moved) = right.pop() else { break };
        items[moved].absorb_into(&mut left_key);
        left.push(moved);
    }
    while right.len() < 2 && left.len() > 2 {
        let Some(moved) = left.pop() else { break };
        items[moved].absorb_into(&mut right_key);
        right.push(moved);
    }

    Ok(SplitVec {
        left,
        right,
        left_key: bytes::union_to_bytes(&left_key),
        right_key: bytes::union_to_bytes(&right_key),
    })
}

#[cfg(test)]
mod tests;
