//! Hashing utilities for block assembly.
//!
//! This module provides the canonical-serialization capability used to turn
//! records into Merkle leaves, and an incremental builder used by the miner.

use crate::crypto::{sha256_hex, Digest};
use sha2::{Digest as _, Sha256};

/// Trait for records that can be committed to a Merkle tree
pub trait Hashable {
    /// Stable serialization of this record; equal records yield equal text
    fn canonical_form(&self) -> String;

    /// Compute the leaf digest of this record
    fn leaf_hash(&self) -> Digest {
        sha256_hex(&self.canonical_form())
    }
}

/// Hash builder for incremental hashing.
///
/// Cloning a builder snapshots the internal state, so a shared prefix
/// can be absorbed once and reused for many suffixes.
#[derive(Clone)]
pub struct HashBuilder {
    hasher: Sha256,
}

impl HashBuilder {
    /// Create a new hash builder
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Add a string to the hash
    pub fn update_str(&mut self, data: &str) -> &mut Self {
        self.hasher.update(data.as_bytes());
        self
    }

    /// Add a number in plain base-10 form
    pub fn update_decimal(&mut self, value: u64) -> &mut Self {
        let mut buf = itoa::Buffer::new();
        self.hasher.update(buf.format(value).as_bytes());
        self
    }

    /// Finalize the hash and return the result
    pub fn finalize(self) -> Digest {
        Digest::from_bytes(&self.hasher.finalize())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}
