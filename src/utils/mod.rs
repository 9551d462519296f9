//! Utility functions and helpers for the miner.
//!
//! This module provides formatting helpers for log output and the
//! tracing subscriber setup used by the binary.

/// Formatting utilities
pub mod format;

/// Logging setup
pub mod logging;

/// Re-export submodule contents
pub use format::*;
pub use logging::*;
