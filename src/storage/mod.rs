//! Flat append-only record stores for transactions and mined blocks.
//!
//! Both stores are plain JSON files rewritten in full on every append,
//! through a temp file renamed into place.
//! They assume a single writer doing read-then-write; there is no locking.

use crate::core::{validate_batch, Block, ChainLink, Transaction};
use crate::crypto::{Digest, Hashable};
use crate::error::{MismatchIndex, Result, StorageError, ValidationError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One stored transaction with the leaf hash recorded at insert time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub data: Transaction,
    pub hash: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TransactionFile<T> {
    transactions: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTransactionRecord {
    data: Value,
    hash: String,
}

/// One stored block with the time the store accepted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub hash: Digest,
    pub timestamp: DateTime<Utc>,
    pub block: Block,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BlockFile {
    hashes: Vec<BlockRecord>,
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "store file not found, starting empty");
            return Ok(T::default());
        }
        Err(source) => {
            return Err(StorageError::Io {
                path: path.display().to_string(),
                source,
            }
            .into())
        }
    };

    serde_json::from_str(&text).map_err(|source| {
        StorageError::Serialization {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source| StorageError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| StorageError::Serialization {
        path: path.display().to_string(),
        source,
    })?;

    // Write a sibling temp file, then rename it over the store
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json).map_err(|source| StorageError::Io {
        path: temp_path.display().to_string(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(io_err)?;
    Ok(())
}

/// Transaction log: `{"transactions": [{"data": ..., "hash": ...}]}`
#[derive(Debug, Clone)]
pub struct TransactionLog {
    path: PathBuf,
}

impl TransactionLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record, parsing each transaction strictly
    pub fn load(&self) -> Result<Vec<TransactionRecord>> {
        let file: TransactionFile<RawTransactionRecord> = read_json(&self.path)?;
        file.transactions
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                Ok(TransactionRecord {
                    data: Transaction::from_value(&raw.data, index)?,
                    hash: raw.hash,
                })
            })
            .collect()
    }

    /// Stored transactions in order
    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.load()?.into_iter().map(|r| r.data).collect())
    }

    /// Validate a batch and append it; nothing is written if any record is bad
    pub fn append(&self, batch: &[Transaction]) -> Result<Vec<TransactionRecord>> {
        validate_batch(batch)?;

        let mut records = self.load()?;
        let added: Vec<TransactionRecord> = batch
            .iter()
            .map(|tx| TransactionRecord {
                data: tx.clone(),
                hash: tx.leaf_hash().into(),
            })
            .collect();
        records.extend(added.iter().cloned());

        write_json(&self.path, &TransactionFile { transactions: records })?;
        info!(added = added.len(), path = %self.path.display(), "transactions appended");
        Ok(added)
    }

    /// Check every stored hash against its recomputed leaf
    pub fn verify_integrity(&self) -> Result<Vec<Transaction>> {
        let records = self.load()?;
        for (i, record) in records.iter().enumerate() {
            let leaf = record.data.leaf_hash();
            if leaf.as_str() != record.hash {
                return Err(ValidationError::SerializationMismatch {
                    index: MismatchIndex::Position(i),
                    expected: leaf.into(),
                    actual: record.hash.clone(),
                }
                .into());
            }
        }
        Ok(records.into_iter().map(|r| r.data).collect())
    }

    /// Compare the stored log with an expected batch, position by position
    pub fn verify_against(&self, expected: &[Transaction]) -> Result<()> {
        let records = self.load()?;
        if records.len() != expected.len() {
            return Err(ValidationError::SerializationMismatch {
                index: MismatchIndex::Count,
                expected: expected.len().to_string(),
                actual: records.len().to_string(),
            }
            .into());
        }

        for (i, (record, tx)) in records.iter().zip(expected).enumerate() {
            let leaf = tx.leaf_hash();
            if leaf.as_str() != record.hash {
                return Err(ValidationError::SerializationMismatch {
                    index: MismatchIndex::Position(i),
                    expected: leaf.into(),
                    actual: record.hash.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Block log: `{"hashes": [{"hash": ..., "timestamp": ..., "block": {...}}]}`
#[derive(Debug, Clone)]
pub struct BlockLog {
    path: PathBuf,
}

impl BlockLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<BlockRecord>> {
        let file: BlockFile = read_json(&self.path)?;
        Ok(file.hashes)
    }

    /// Append a mined block, stamping it with the current time
    pub fn append(&self, block: &Block) -> Result<BlockRecord> {
        let mut file: BlockFile = read_json(&self.path)?;
        let record = BlockRecord {
            hash: block.hash().clone(),
            timestamp: Utc::now(),
            block: block.clone(),
        };
        file.hashes.push(record.clone());

        write_json(&self.path, &file)?;
        info!(hash = %record.hash, height = file.hashes.len(), "block stored");
        Ok(record)
    }

    /// The link the next block builds on: the stored tip, or genesis
    pub fn last_link(&self, genesis_hash_len: usize) -> Result<ChainLink> {
        let records = self.load()?;
        Ok(match records.last() {
            Some(tip) => ChainLink::resume(&tip.block, records.len() as u64),
            None => ChainLink::genesis_with_len(genesis_hash_len),
        })
    }
}
