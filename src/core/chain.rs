//! Chain links between successive assemblies.
//!
//! The previous-block hash is carried as an immutable value: each mined
//! block yields the link the next assembly starts from.

use crate::config::DEFAULT_GENESIS_HASH_LEN;
use crate::core::Block;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The previous-hash a new block will commit to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainLink {
    previous_hash: String,
    height: u64,
}

impl ChainLink {
    /// Link for the first block: a sentinel of ASCII zeros
    pub fn genesis() -> Self {
        Self::genesis_with_len(DEFAULT_GENESIS_HASH_LEN)
    }

    /// Genesis sentinel of an agreed width
    pub fn genesis_with_len(len: usize) -> Self {
        Self {
            previous_hash: "0".repeat(len),
            height: 0,
        }
    }

    /// Resume from a stored tip at a known height
    pub fn resume(tip: &Block, blocks_stored: u64) -> Self {
        Self {
            previous_hash: tip.hash().as_str().to_string(),
            height: blocks_stored,
        }
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    /// Number of blocks already behind this link
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// Advance past a newly mined block
    pub fn advance(&self, block: &Block) -> Self {
        Self {
            previous_hash: block.hash().as_str().to_string(),
            height: self.height + 1,
        }
    }
}

impl fmt::Display for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} <- {}", self.height, self.previous_hash)
    }
}
