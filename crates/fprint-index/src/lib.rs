//! fprint-index — spatial index over fingerprint records.
//!
//! A Guttman-style R-tree whose page keys are OR-unions of the covered
//! records. The seven operators in [`ops`] do all the work: `compress`
//! bounds what a leaf stores, `union`/`penalty`/`picksplit` maintain the
//! tree, `consistent` prunes searches, `same` detects unchanged keys.
//! [`tree`] is a small in-memory host that drives them.

pub mod config;
pub mod key;
pub mod ops;
pub mod tree;

use fprint_fp::CodecError;
use thiserror::Error;

/// Comparison selected by a search. The numbers are part of the host
/// binding contract and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Same recording (score above the exact cut-off).
    Eq,
    /// Probabilistic match (score above the match cut-off).
    Match,
    /// Not the same recording.
    Neq,
}

impl Strategy {
    pub fn from_number(n: u16) -> Option<Self> {
        match n {
            3 => Some(Strategy::Eq),
            6 => Some(Strategy::Match),
            12 => Some(Strategy::Neq),
            _ => None,
        }
    }

    pub fn number(self) -> u16 {
        match self {
            Strategy::Eq => 3,
            Strategy::Match => 6,
            Strategy::Neq => 12,
        }
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("empty index entry")]
    EmptyEntry,
    #[error("union of an empty entry vector")]
    EmptyEntryVector,
    #[error("cannot split a page holding a single entry")]
    SingleEntrySplit,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub use config::IndexConfig;
pub use ops::{gist_consistent, gist_penalty, gist_picksplit, gist_same, gist_union, SplitVec};
pub use tree::RTreeIndex;
