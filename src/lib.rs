//! merkle-miner: Merkle commitment and proof-of-work block assembly.
//!
//! Transactions are hashed into leaves, reduced to a Merkle root, and sealed
//! into a block by searching for a nonce whose hash meets a leading-zero
//! difficulty target. Flat JSON stores keep the transaction and block logs.

pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod storage;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::{assemble, Block, BlockAssembler, ChainLink, Transaction};
pub use crate::crypto::{compute_merkle_root, sha256_hex, Digest, MerkleTree, ProofOfWork};
pub use crate::error::{LedgerError, Result};
