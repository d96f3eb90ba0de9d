//! fprint-core — music fingerprint algebra.
//!
//! The fixed-layout fingerprint record, the bit-level and similarity
//! kernels over pairs of records, and the OR-union keys that summarise
//! groups of records for spatial indexing.

pub mod bitops;
pub mod extract;
pub mod matching;
pub mod merge;
pub mod record;

pub use extract::{ExtractError, FingerprintExtractor};
pub use matching::{
    fprint_cmp, fprint_eq, fprint_matches, fprint_neq, is_eq, is_match, is_neq, match_chroma,
    match_chromab, match_chromac, match_chromat, match_cpfm, match_fooid, FP_EXACT_CUTOFF,
    FP_MATCH_CUTOFF,
};
pub use merge::{
    fprint_merge, fprint_merge_one, fprint_merge_one_union, match_fprint_merge, match_merges,
    try_match_merges, FPrintUnion,
};
pub use record::{FPrint, CORRUPT_CPRINT_LEN, DOM_SIZE, KNOWN_CPRINT_LEN, R_SIZE};
