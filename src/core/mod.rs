//! Core block assembly data structures and logic.
//!
//! This module contains transactions, blocks, the chain link threaded
//! between assemblies, and the assembler that ties them together.

pub mod assembler;
pub mod block;
pub mod chain;
pub mod transaction;

// Re-export commonly used types
pub use assembler::*;
pub use block::*;
pub use chain::*;
pub use transaction::*;
