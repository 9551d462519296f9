//! Merkle tree implementation for committing a transaction batch.
//!
//! Levels are reduced left to right in pairs. A pair `(L, R)` becomes
//! `sha256(L ++ R)` over the hex text of both digests; a trailing orphan on
//! an odd level is promoted to the next level unchanged.

use crate::crypto::{hash_concat, Digest, Hashable};
use crate::error::{CryptoError, Result};
use tracing::debug;

/// Compute the Merkle root of an ordered, non-empty list of leaves
pub fn compute_merkle_root(leaves: &[Digest]) -> Result<Digest> {
    if leaves.is_empty() {
        return Err(CryptoError::EmptyMerkleTree.into());
    }

    let mut current = leaves.to_vec();
    let mut next = Vec::with_capacity(current.len().div_ceil(2));

    while current.len() > 1 {
        reduce_level(&current, &mut next);
        std::mem::swap(&mut current, &mut next);
    }

    current.pop().ok_or_else(|| CryptoError::EmptyMerkleTree.into())
}

/// Write the parent level of `level` into `out`
fn reduce_level(level: &[Digest], out: &mut Vec<Digest>) {
    out.clear();
    for chunk in level.chunks(2) {
        match chunk {
            [left, right] => out.push(hash_concat(&[left.as_str(), right.as_str()])),
            // Odd count: promote the orphan as-is
            [orphan] => out.push(orphan.clone()),
            _ => unreachable!("chunks(2) yields one or two items"),
        }
    }
}

/// A Merkle tree that retains every level, leaves first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a tree from pre-computed leaf digests
    pub fn from_leaves(leaves: &[Digest]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(CryptoError::EmptyMerkleTree.into());
        }

        let mut levels = vec![leaves.to_vec()];
        loop {
            let current = &levels[levels.len() - 1];
            if current.len() == 1 {
                break;
            }
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            reduce_level(current, &mut next);
            debug!(level = levels.len(), nodes = next.len(), "merkle level reduced");
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Build a tree from records, hashing each one's canonical form
    pub fn from_records<T: Hashable>(records: &[T]) -> Result<Self> {
        let leaves: Vec<Digest> = records.iter().map(Hashable::leaf_hash).collect();
        Self::from_leaves(&leaves)
    }

    /// Get the root hash of the tree
    pub fn root(&self) -> &Digest {
        // from_leaves guarantees a final level holding exactly one digest
        &self.levels[self.levels.len() - 1][0]
    }

    /// Number of combination rounds between the leaves and the root
    pub fn height(&self) -> usize {
        self.levels.len() - 1
    }

    /// Get all leaf hashes
    pub fn leaves(&self) -> &[Digest] {
        &self.levels[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// All levels, leaves first and the root level last
    pub fn levels(&self) -> &[Vec<Digest>] {
        &self.levels
    }

    /// Check if the tree contains a specific leaf
    pub fn contains_leaf(&self, leaf: &Digest) -> bool {
        self.levels[0].contains(leaf)
    }
}
