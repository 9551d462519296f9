//! Formatting utilities for hashes and mining rates.

use crate::crypto::Digest;

/// Format a hash as a short hex string (first 8 characters)
pub fn format_hash_short(hash: &Digest) -> String {
    let hex = hash.as_str();
    if hex.len() >= 8 {
        format!("{}...", &hex[..8])
    } else {
        hex.to_string()
    }
}

/// Format hash rate (H/s, KH/s, MH/s, GH/s, TH/s)
pub fn format_hash_rate(hash_rate: f64) -> String {
    const UNITS: &[&str] = &["H/s", "KH/s", "MH/s", "GH/s", "TH/s", "PH/s"];
    const THRESHOLD: f64 = 1000.0;

    if hash_rate == 0.0 {
        return "0 H/s".to_string();
    }

    let mut rate = hash_rate;
    let mut unit_index = 0;

    while rate >= THRESHOLD && unit_index < UNITS.len() - 1 {
        rate /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{:.0} {}", rate, UNITS[unit_index])
    } else {
        format!("{:.2} {}", rate, UNITS[unit_index])
    }
}

/// Format a duration in seconds as `1.23s`, or `123ms` below one second
pub fn format_seconds(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else {
        format!("{:.2}s", seconds)
    }
}
