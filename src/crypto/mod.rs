//! Cryptographic primitives for block assembly.
//!
//! This module provides the SHA-256 hasher, the Merkle tree reduction
//! and the proof-of-work search used to seal a block.

pub mod hash;
pub mod merkle;
pub mod pow;

// Re-export commonly used types
pub use hash::*;
pub use merkle::*;
pub use pow::*;

use crate::error::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Length of a SHA-256 digest in hex characters
pub const DIGEST_HEX_LEN: usize = 64;

/// A SHA-256 digest rendered as 64 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Parse a digest, rejecting anything but 64 lowercase hex characters
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let well_formed = hex_str.len() == DIGEST_HEX_LEN
            && hex_str
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(CryptoError::InvalidDigest {
                value: hex_str.to_string(),
            }
            .into());
        }
        Ok(Self(hex_str.to_string()))
    }

    /// Wrap the raw output of the hash function
    fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Get the digest as a hex string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Count the leading ASCII `'0'` characters
    pub fn leading_zeros(&self) -> usize {
        self.0.bytes().take_while(|&b| b == b'0').count()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Digest {
    type Error = CryptoError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_hex(&value).map_err(|_| CryptoError::InvalidDigest { value })
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

/// Hash text input with SHA-256 and return the hex digest
pub fn sha256_hex(input: &str) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    Digest::from_bytes(&hasher.finalize())
}

/// Hash the concatenation of several text pieces, with no delimiter
pub fn hash_concat(pieces: &[&str]) -> Digest {
    let mut hasher = Sha256::new();
    for piece in pieces {
        hasher.update(piece.as_bytes());
    }
    Digest::from_bytes(&hasher.finalize())
}
