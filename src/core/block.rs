//! Block data structure and self-verification.
//!
//! A block is produced only by the assembler and never changes afterwards;
//! its fields are read through accessors.

use crate::core::Transaction;
use crate::crypto::{block_hash, meets_difficulty, Digest, MerkleTree, ProofOfWork};
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};

/// A mined block linking a transaction batch to its predecessor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Hash of the previous block, or the genesis sentinel
    previous_hash: String,
    /// Merkle root of all transactions in the block
    merkle_root: Digest,
    /// Nonce used for proof-of-work
    nonce: u64,
    /// sha256(merkle_root ++ previous_hash ++ nonce)
    hash: Digest,
    /// Leading-zero count the hash was mined against
    difficulty: u32,
    /// Transactions in presentation order
    transactions: Vec<Transaction>,
}

impl Block {
    pub(crate) fn sealed(
        previous_hash: String,
        merkle_root: Digest,
        proof: ProofOfWork,
        difficulty: u32,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            previous_hash,
            merkle_root,
            nonce: proof.nonce,
            hash: proof.hash,
            difficulty,
            transactions,
        }
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn merkle_root(&self) -> &Digest {
        &self.merkle_root
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &Digest {
        &self.hash
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Rebuild the Merkle tree from the stored transactions
    pub fn merkle_tree(&self) -> Result<MerkleTree> {
        MerkleTree::from_records(&self.transactions)
    }

    /// Verify the Merkle root matches the transactions
    pub fn verify_merkle_root(&self) -> bool {
        self.merkle_tree()
            .map(|tree| tree.root() == &self.merkle_root)
            .unwrap_or(false)
    }

    /// Recompute root and hash and check the difficulty target
    pub fn verify(&self) -> Result<()> {
        for (index, tx) in self.transactions.iter().enumerate() {
            tx.validate(index)?;
        }

        if !self.verify_merkle_root() {
            return Err(ValidationError::InvalidBlock(format!(
                "merkle root {} does not match its transactions",
                self.merkle_root
            ))
            .into());
        }

        let recomputed = block_hash(self.merkle_root.as_str(), &self.previous_hash, self.nonce);
        if recomputed != self.hash {
            return Err(ValidationError::InvalidBlock(format!(
                "stored hash {} differs from recomputed {}",
                self.hash, recomputed
            ))
            .into());
        }

        if !meets_difficulty(&self.hash, self.difficulty) {
            return Err(ValidationError::InvalidBlock(format!(
                "hash {} has fewer than {} leading zeros",
                self.hash, self.difficulty
            ))
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{assemble, ChainLink};
    use crate::crypto::sha256_hex;

    fn reference_block(difficulty: u32) -> Block {
        let txs = [4, 1, 9, 0].into_iter().map(Transaction::simple).collect();
        assemble(ChainLink::genesis().previous_hash(), txs, difficulty).unwrap()
    }

    #[test]
    fn test_reference_block_verifies() {
        let block = reference_block(2);
        assert_eq!(block.nonce(), 20);
        assert!(block.verify_merkle_root());
        assert!(block.verify().is_ok());
    }

    #[test]
    fn test_tampered_transactions_fail() {
        let mut block = reference_block(1);
        block.transactions[2] = Transaction::simple(8);
        assert!(!block.verify_merkle_root());
        assert!(block.verify().is_err());
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let mut block = reference_block(1);
        block.nonce += 1;
        assert!(block.verify().is_err());
    }

    #[test]
    fn test_insufficient_work_fails() {
        let mut block = reference_block(1);
        block.difficulty = 6;
        assert!(block.verify().is_err());
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let block = reference_block(0);
        let value = serde_json::to_value(&block).unwrap();

        assert_eq!(value["previousHash"], "000000000000000000000000000000000");
        assert_eq!(value["merkleRoot"], block.merkle_root().as_str());
        assert_eq!(value["nonce"], 0);
        assert_eq!(value["transactions"], serde_json::json!([4, 1, 9, 0]));

        let back: Block = serde_json::from_value(value).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_link_after_block_uses_hash() {
        let block = reference_block(0);
        assert_eq!(ChainLink::genesis().advance(&block).previous_hash(), block.hash().as_str());
        assert_eq!(
            block.hash(),
            &sha256_hex(&format!("{}{}0", block.merkle_root(), block.previous_hash()))
        );
    }
}
