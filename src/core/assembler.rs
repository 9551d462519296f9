//! Block assembly: transactions -> leaves -> Merkle root -> mined block.

use crate::core::{validate_batch, Block, ChainLink, Transaction};
use crate::crypto::{MerkleTree, ProofOfWorkMiner};
use crate::error::Result;
use crate::utils::{format_hash_short, format_seconds};
use tracing::{debug, info};

/// Builds and mines blocks with a configured miner
#[derive(Debug, Default)]
pub struct BlockAssembler {
    miner: ProofOfWorkMiner,
}

impl BlockAssembler {
    pub fn new(miner: ProofOfWorkMiner) -> Self {
        Self { miner }
    }

    /// The miner, e.g. to take a stop handle before assembling
    pub fn miner(&self) -> &ProofOfWorkMiner {
        &self.miner
    }

    /// Assemble and mine a block on top of `previous_hash`.
    ///
    /// The batch is validated as a whole first; an invalid record, an empty
    /// batch or an aborted search yields an error and no block.
    pub fn assemble(
        &self,
        previous_hash: &str,
        transactions: Vec<Transaction>,
        difficulty: u32,
    ) -> Result<Block> {
        validate_batch(&transactions)?;

        let tree = MerkleTree::from_records(&transactions)?;
        let merkle_root = tree.root().clone();
        debug!(
            leaves = tree.leaf_count(),
            rounds = tree.height(),
            root = %merkle_root,
            "merkle root computed"
        );

        let result = self
            .miner
            .mine(merkle_root.as_str(), previous_hash, difficulty)?;
        info!(
            nonce = result.nonce,
            hash = %format_hash_short(&result.hash),
            took = %format_seconds(result.duration_seconds),
            transactions = transactions.len(),
            "block assembled"
        );

        Ok(Block::sealed(
            previous_hash.to_string(),
            merkle_root,
            result.proof(),
            difficulty,
            transactions,
        ))
    }

    /// Assemble on a chain link and return the block with the link after it
    pub fn assemble_on(
        &self,
        link: &ChainLink,
        transactions: Vec<Transaction>,
        difficulty: u32,
    ) -> Result<(Block, ChainLink)> {
        let block = self.assemble(link.previous_hash(), transactions, difficulty)?;
        let next = link.advance(&block);
        Ok((block, next))
    }
}

/// Assemble with an unbounded, single-threaded search
pub fn assemble(previous_hash: &str, transactions: Vec<Transaction>, difficulty: u32) -> Result<Block> {
    BlockAssembler::default().assemble(previous_hash, transactions, difficulty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{compute_merkle_root, sha256_hex, Hashable, ProofOfWorkConfig};
    use crate::error::{CryptoError, LedgerError, ValidationError};

    const GENESIS: &str = "000000000000000000000000000000000";
    const ROOT_4190: &str = "9324c224bf48573f8b34cf5c3a281121d8456322ab5b6dd5fda8d5f68685cd7f";

    fn simple_batch(values: &[i64]) -> Vec<Transaction> {
        values.iter().copied().map(Transaction::simple).collect()
    }

    #[test]
    fn test_end_to_end_reference_scenario() {
        let block = assemble(GENESIS, simple_batch(&[4, 1, 9, 0]), 0).unwrap();

        assert_eq!(block.merkle_root().as_str(), ROOT_4190);
        assert_eq!(block.nonce(), 0);
        assert_eq!(block.hash(), &sha256_hex(&format!("{}{}0", ROOT_4190, GENESIS)));
        assert_eq!(block.previous_hash(), GENESIS);
        assert_eq!(block.transactions().len(), 4);
    }

    #[test]
    fn test_difficulty_three() {
        let block = assemble(GENESIS, simple_batch(&[4, 1, 9, 0]), 3).unwrap();
        assert_eq!(block.nonce(), 6109);
        assert_eq!(
            block.hash().as_str(),
            "000cf1a5a2a346f6368b9a9f2fa5e31e1dfa62c7e897c3afd344b42a4750c129"
        );
    }

    #[test]
    fn test_round_trip_recomputes_root() {
        let batch = vec![
            Transaction::transfer("alice", "bob", 10),
            Transaction::simple(42),
            Transaction::transfer("bob", "carol", 3),
        ];
        let block = assemble(GENESIS, batch, 1).unwrap();

        let json = serde_json::to_string(&block).unwrap();
        let stored: Block = serde_json::from_str(&json).unwrap();

        let leaves: Vec<_> = stored.transactions().iter().map(Hashable::leaf_hash).collect();
        assert_eq!(&compute_merkle_root(&leaves).unwrap(), block.merkle_root());
        assert!(stored.verify().is_ok());
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let result = assemble(GENESIS, Vec::new(), 0);
        assert!(matches!(
            result,
            Err(LedgerError::Crypto(CryptoError::EmptyMerkleTree))
        ));
    }

    #[test]
    fn test_invalid_transaction_rejects_whole_batch() {
        let batch = vec![
            Transaction::transfer("alice", "bob", 1),
            Transaction::transfer("", "bob", 1),
        ];
        let result = assemble(GENESIS, batch, 0);
        assert!(matches!(
            result,
            Err(LedgerError::Validation(ValidationError::InvalidTransaction { index: 1, .. }))
        ));
    }

    #[test]
    fn test_bounded_miner_propagates_timeout() {
        let assembler = BlockAssembler::new(ProofOfWorkMiner::new(ProofOfWorkConfig {
            max_attempts: Some(10),
            ..ProofOfWorkConfig::default()
        }));
        let result = assembler.assemble(GENESIS, simple_batch(&[1]), 64);
        assert!(matches!(
            result,
            Err(LedgerError::Validation(ValidationError::MiningTimeout { attempts: 10 }))
        ));
    }

    #[test]
    fn test_assemble_on_threads_links() {
        let assembler = BlockAssembler::default();
        let genesis = ChainLink::genesis();

        let (first, link) = assembler.assemble_on(&genesis, simple_batch(&[4, 1]), 1).unwrap();
        let (second, link) = assembler.assemble_on(&link, simple_batch(&[9, 0]), 1).unwrap();

        assert_eq!(first.previous_hash(), GENESIS);
        assert_eq!(second.previous_hash(), first.hash().as_str());
        assert_eq!(link.previous_hash(), second.hash().as_str());
        assert_eq!(link.height(), 2);
    }

    #[test]
    fn test_single_transaction_root_is_leaf() {
        let block = assemble(GENESIS, simple_batch(&[7]), 0).unwrap();
        assert_eq!(block.merkle_root(), &sha256_hex("7"));
    }
}
