//! In-memory R-tree host.
//!
//! Drives the operators in [`crate::ops`] the way a database index would:
//! inserts descend along minimal penalty, overflowing pages are
//! redistributed by `picksplit`, node keys grow through `union`, and
//! searches prune subtrees with `consistent`. Pages store packed blobs;
//! every read re-slices defensively.

use crate::config::IndexConfig;
use crate::key;
use crate::ops::{self, SplitVec};
use crate::{IndexError, Strategy};
use fprint_core::merge::FPrintUnion;
use fprint_core::record::FPrint;
use fprint_fp::bytes;

pub struct RTreeIndex {
    root: Node,
    capacity: usize,
    len: usize,
}

enum Node {
    Leaf { entries: Vec<Vec<u8>> },
    Internal { children: Vec<Child> },
}

struct Child {
    key: Vec<u8>,
    node: Node,
}

impl RTreeIndex {
    pub fn new(config: &IndexConfig) -> Self {
        let mut capacity = config.pages.capacity;
        if capacity < 2 {
            log::warn!("page capacity {} too small, using 2", capacity);
            capacity = 2;
        }
        Self {
            root: Node::Leaf { entries: Vec::new() },
            capacity,
            len: 0,
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree; an empty index has depth 1.
    pub fn depth(&self) -> usize {
        let mut d = 1;
        let mut node = &self.root;
        while let Node::Internal { children } = node {
            d += 1;
            match children.first() {
                Some(c) => node = &c.node,
                None => break,
            }
        }
        d
    }

    /// Insert one record. The stored leaf key is the compressed slice of
    /// the record; the caller keeps the original.
    pub fn insert(&mut self, fp: &FPrint) -> Result<(), IndexError> {
        let blob = bytes::record_to_bytes(&key::compress_record(fp));
        if let Some((a, b)) = insert_into(&mut self.root, blob, self.capacity)? {
            self.root = Node::Internal {
                children: vec![a, b],
            };
        }
        self.len += 1;
        Ok(())
    }

    /// Return every stored entry satisfying `strategy` against `query`.
    ///
    /// Leaf answers are exact (the predicate clears the recheck flag);
    /// node keys only bound their subtrees, so rejected subtrees are
    /// provably empty of matches.
    pub fn search(&self, query: &FPrint, strategy: Strategy) -> Result<Vec<FPrint>, IndexError> {
        let qblob = bytes::record_to_bytes(query);
        let mut out = Vec::new();
        search_node(&self.root, &qblob, strategy, &mut out)?;
        Ok(out)
    }
}

/// A record wrapped as the single-entry key it would produce, for
/// widening ancestor keys along the insertion path.
fn singleton_key(blob: &[u8]) -> Result<Vec<u8>, IndexError> {
    let fp = key::deserialize_record(blob)?;
    Ok(bytes::union_to_bytes(&FPrintUnion::from_record(&fp)))
}

fn insert_into(
    node: &mut Node,
    blob: Vec<u8>,
    capacity: usize,
) -> Result<Option<(Child, Child)>, IndexError> {
    match node {
        Node::Leaf { entries } => {
            entries.push(blob);
            if entries.len() <= capacity {
                return Ok(None);
            }
            let refs: Vec<&[u8]> = entries.iter().map(|e| e.as_slice()).collect();
            let split = ops::gist_picksplit(&refs, true)?;
            let taken = std::mem::take(entries);
            Ok(Some(split_leaf(taken, split)))
        }
        Node::Internal { children } => {
            let mut best = 0usize;
            let mut best_penalty = f64::INFINITY;
            for (i, child) in children.iter().enumerate() {
                let penalty = ops::gist_penalty(&child.key, &blob);
                if penalty < best_penalty {
                    best_penalty = penalty;
                    best = i;
                }
            }

            let widened = ops::gist_union(&[
                children[best].key.as_slice(),
                singleton_key(&blob)?.as_slice(),
            ])?;
            if !ops::gist_same(&children[best].key, &widened) {
                children[best].key = widened;
            }

            if let Some((a, b)) = insert_into(&mut children[best].node, blob, capacity)? {
                children.remove(best);
                children.push(a);
                children.push(b);
                if children.len() > capacity {
                    let refs: Vec<&[u8]> = children.iter().map(|c| c.key.as_slice()).collect();
                    let split = ops::gist_picksplit(&refs, false)?;
                    let taken = std::mem::take(children);
                    return Ok(Some(split_internal(taken, split)));
                }
            }
            Ok(None)
        }
    }
}

// The split indices refer to the original entry order; taking through
// Option slots keeps them valid no matter the assignment order.
fn partition<T>(values: Vec<T>, split: &SplitVec) -> (Vec<T>, Vec<T>) {
    let mut slots: Vec<Option<T>> = values.into_iter().map(Some).collect();
    let mut take = |ixs: &[usize]| -> Vec<T> {
        ixs.iter().filter_map(|&i| slots.get_mut(i)?.take()).collect()
    };
    let left = take(&split.left);
    let right = take(&split.right);
    (left, right)
}

fn split_leaf(entries: Vec<Vec<u8>>, split: SplitVec) -> (Child, Child) {
    let (left_entries, right_entries) = partition(entries, &split);
    let left = Child {
        key: split.left_key,
        node: Node::Leaf {
            entries: left_entries,
        },
    };
    let right = Child {
        key: split.right_key,
        node: Node::Leaf {
            entries: right_entries,
        },
    };
    (left, right)
}

fn split_internal(children: Vec<Child>, split: SplitVec) -> (Child, Child) {
    let (left_children, right_children) = partition(children, &split);
    let left = Child {
        key: split.left_key,
        node: Node::Internal {
            children: left_children,
        },
    };
    let right = Child {
        key: split.right_key,
        node: Node::Internal {
            children: right_children,
        },
    };
    (left, right)
}

fn search_node(
    node: &Node,
    qblob: &[u8],
    strategy: Strategy,
    out: &mut Vec<FPrint>,
) -> Result<(), IndexError> {
    match node {
        Node::Leaf { entries } => {
            for entry in entries {
                let mut recheck = true;
                if ops::gist_consistent(entry, true, qblob, strategy, &mut recheck)? {
                    out.push(key::deserialize_record(entry)?);
                }
            }
        }
        Node::Internal { children } => {
            for child in children {
                let mut recheck = true;
                if ops::gist_consistent(&child.key, false, qblob, strategy, &mut recheck)? {
                    search_node(&child.node, qblob, strategy, out)?;
                }
            }
        }
    }
    Ok(())
}
