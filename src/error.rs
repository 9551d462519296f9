use std::fmt;

// Core error types
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("Empty merkle tree: at least one leaf is required")]
    EmptyMerkleTree,
    #[error("Invalid digest: {value:?} is not 64 lowercase hex characters")]
    InvalidDigest { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid transaction at index {index}: {reason}")]
    InvalidTransaction { index: usize, reason: String },
    #[error("Serialization mismatch at {index}: expected {expected}, found {actual}")]
    SerializationMismatch {
        index: MismatchIndex,
        expected: String,
        actual: String,
    },
    #[error("Mining timeout after {attempts} attempts")]
    MiningTimeout { attempts: u64 },
    #[error("Mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
}

/// Where a stored/expected transaction comparison diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchIndex {
    /// The record counts differ.
    Count,
    /// The record at this position differs.
    Position(usize),
}

impl fmt::Display for MismatchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchIndex::Count => write!(f, "transaction count"),
            MismatchIndex::Position(i) => write!(f, "transaction {}", i),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error on {path}: {source}")]
    Serialization {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {field}")]
    InvalidConfig { field: String },
    #[error("Value out of range for {field}: {value} (expected {range})")]
    ValueOutOfRange {
        field: String,
        value: String,
        range: String,
    },
}

// Result type aliases
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_error_converts() {
        let err: LedgerError = CryptoError::EmptyMerkleTree.into();
        assert!(matches!(err, LedgerError::Crypto(CryptoError::EmptyMerkleTree)));
    }

    #[test]
    fn test_mismatch_display() {
        let err = ValidationError::SerializationMismatch {
            index: MismatchIndex::Position(2),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Serialization mismatch at transaction 2: expected aa, found bb"
        );

        let err = ValidationError::SerializationMismatch {
            index: MismatchIndex::Count,
            expected: "4".to_string(),
            actual: "3".to_string(),
        };
        assert!(err.to_string().contains("transaction count"));
    }

    #[test]
    fn test_transparent_message() {
        let err: LedgerError = ValidationError::MiningTimeout { attempts: 10 }.into();
        assert_eq!(err.to_string(), "Mining timeout after 10 attempts");
    }
}
