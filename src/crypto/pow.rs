//! Proof of Work implementation for block sealing.
//!
//! A block hash is `sha256(merkle_root ++ previous_hash ++ decimal(nonce))`
//! over plain text with no delimiter. A hash satisfies difficulty `d` when its
//! hex form starts with `d` ASCII `'0'` characters. The search always yields the
//! smallest satisfying nonce, whether it runs on one thread or many.

use crate::crypto::{Digest, HashBuilder};
use crate::error::{Result, ValidationError};
use crate::utils::{format_hash_rate, format_hash_short};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Winning nonce and hash of a proof-of-work search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfWork {
    pub nonce: u64,
    pub hash: Digest,
}

/// Compute the block hash for a given nonce
pub fn block_hash(merkle_root: &str, previous_hash: &str, nonce: u64) -> Digest {
    let mut builder = HashBuilder::new();
    builder
        .update_str(merkle_root)
        .update_str(previous_hash)
        .update_decimal(nonce);
    builder.finalize()
}

/// Check if a hash starts with `difficulty` hex zeros
pub fn meets_difficulty(hash: &Digest, difficulty: u32) -> bool {
    hash.leading_zeros() >= difficulty as usize
}

/// Validate a claimed nonce against the difficulty target
pub fn validate_proof_of_work(
    merkle_root: &str,
    previous_hash: &str,
    nonce: u64,
    difficulty: u32,
) -> bool {
    meets_difficulty(&block_hash(merkle_root, previous_hash, nonce), difficulty)
}

/// Search nonces from zero upwards until the hash meets the difficulty.
///
/// There is no attempt cap: large difficulties may never return. Use
/// [`ProofOfWorkMiner`] for a cancellable or bounded search.
pub fn proof_of_work(merkle_root: &str, previous_hash: &str, difficulty: u32) -> ProofOfWork {
    let mut prefix = HashBuilder::new();
    prefix.update_str(merkle_root).update_str(previous_hash);

    let mut nonce = 0u64;
    loop {
        let hash = hash_with_nonce(&prefix, nonce);
        if meets_difficulty(&hash, difficulty) {
            return ProofOfWork { nonce, hash };
        }
        nonce = nonce.wrapping_add(1);
    }
}

fn hash_with_nonce(prefix: &HashBuilder, nonce: u64) -> Digest {
    let mut builder = prefix.clone();
    builder.update_decimal(nonce);
    builder.finalize()
}

/// Expected number of attempts for a given difficulty (16^d, saturating)
pub fn calculate_expected_attempts(difficulty: u32) -> u64 {
    16u64.checked_pow(difficulty).unwrap_or(u64::MAX)
}

/// Proof of Work configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfWorkConfig {
    /// Only nonces below this bound are tried
    pub max_attempts: Option<u64>,
    /// Mining timeout in seconds
    pub timeout_seconds: Option<u64>,
    /// Number of mining threads
    pub threads: usize,
    /// Progress update interval in milliseconds
    pub progress_interval_ms: u64,
}

impl Default for ProofOfWorkConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            timeout_seconds: None,
            threads: 1,
            progress_interval_ms: 1000,
        }
    }
}

/// Mining progress information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningProgress {
    /// Current nonce being tested
    pub current_nonce: u64,
    /// Total attempts made
    pub attempts: u64,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
    /// Elapsed time in seconds
    pub elapsed_seconds: f64,
    /// Estimated time remaining in seconds
    pub estimated_remaining_seconds: Option<f64>,
    /// Target difficulty
    pub target_difficulty: u32,
}

/// Result of a successful mining operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningResult {
    /// The winning nonce
    pub nonce: u64,
    /// The resulting hash
    pub hash: Digest,
    /// Total attempts made
    pub attempts: u64,
    /// Time taken in seconds
    pub duration_seconds: f64,
    /// Average hash rate
    pub hash_rate: f64,
}

impl MiningResult {
    pub fn proof(&self) -> ProofOfWork {
        ProofOfWork {
            nonce: self.nonce,
            hash: self.hash.clone(),
        }
    }
}

/// Shareable handle that cancels a running search
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Request cancellation; the search notices it before its next attempt
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
enum Halt {
    Cancelled,
    DeadlinePassed,
}

/// Proof of Work miner
#[derive(Debug)]
pub struct ProofOfWorkMiner {
    config: ProofOfWorkConfig,
    stop_requested: Arc<AtomicBool>,
    current_nonce: Arc<AtomicU64>,
    total_attempts: Arc<AtomicU64>,
}

/// State shared by every search lane of one mining run
struct Search<'a, F> {
    prefix: HashBuilder,
    difficulty: u32,
    stride: u64,
    started: Instant,
    deadline: Option<Instant>,
    max_attempts: Option<u64>,
    progress_interval: Duration,
    on_progress: &'a F,
    stop_requested: &'a AtomicBool,
    current_nonce: &'a AtomicU64,
    attempts: &'a AtomicU64,
    // u64::MAX means nothing found yet
    best: AtomicU64,
    halt: OnceLock<Halt>,
}

impl<F> Search<'_, F>
where
    F: Fn(&MiningProgress) + Sync,
{
    /// Scan `lane`, `lane + stride`, `lane + 2 * stride`, ... in ascending order
    fn run_lane(&self, lane: u64) {
        let mut nonce = lane;
        let mut last_progress = Instant::now();

        loop {
            // Some lane already won with a smaller nonce
            if nonce >= self.best.load(Ordering::SeqCst) || self.halt.get().is_some() {
                return;
            }
            if self.stop_requested.load(Ordering::SeqCst) {
                let _ = self.halt.set(Halt::Cancelled);
                return;
            }
            // Lane has covered its share of [0, max)
            if self.max_attempts.is_some_and(|max| nonce >= max) {
                return;
            }
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    let _ = self.halt.set(Halt::DeadlinePassed);
                    return;
                }
            }

            let hash = hash_with_nonce(&self.prefix, nonce);
            let attempts = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            self.current_nonce.store(nonce, Ordering::Relaxed);

            if meets_difficulty(&hash, self.difficulty) {
                self.best.fetch_min(nonce, Ordering::SeqCst);
                return;
            }

            if lane == 0 && last_progress.elapsed() >= self.progress_interval {
                let progress = self.progress(nonce, attempts);
                debug!(
                    nonce = progress.current_nonce,
                    attempts = progress.attempts,
                    rate = %format_hash_rate(progress.hash_rate),
                    "mining in progress"
                );
                (self.on_progress)(&progress);
                last_progress = Instant::now();
            }

            nonce = match nonce.checked_add(self.stride) {
                Some(next) => next,
                None => return,
            };
        }
    }

    fn progress(&self, nonce: u64, attempts: u64) -> MiningProgress {
        let elapsed = self.started.elapsed().as_secs_f64();
        let hash_rate = rate(attempts, elapsed);
        let estimated_remaining_seconds = (hash_rate > 0.0).then(|| {
            let remaining = calculate_expected_attempts(self.difficulty).saturating_sub(attempts);
            remaining as f64 / hash_rate
        });

        MiningProgress {
            current_nonce: nonce,
            attempts,
            hash_rate,
            elapsed_seconds: elapsed,
            estimated_remaining_seconds,
            target_difficulty: self.difficulty,
        }
    }
}

fn rate(attempts: u64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds > 0.0 {
        attempts as f64 / elapsed_seconds
    } else {
        0.0
    }
}

impl ProofOfWorkMiner {
    /// Create a new PoW miner with configuration
    pub fn new(config: ProofOfWorkConfig) -> Self {
        Self {
            config,
            stop_requested: Arc::new(AtomicBool::new(false)),
            current_nonce: Arc::new(AtomicU64::new(0)),
            total_attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &ProofOfWorkConfig {
        &self.config
    }

    /// Get a handle that cancels this miner from another thread or task
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop_requested))
    }

    /// Stop the current mining operation
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Clear a previous stop request so the miner can be reused
    pub fn reset(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    /// Attempts made by the current or last run
    pub fn attempts(&self) -> u64 {
        self.total_attempts.load(Ordering::SeqCst)
    }

    /// Nonce most recently tested
    pub fn current_nonce(&self) -> u64 {
        self.current_nonce.load(Ordering::Relaxed)
    }

    /// Find the smallest nonce whose block hash meets `difficulty`
    pub fn mine(&self, merkle_root: &str, previous_hash: &str, difficulty: u32) -> Result<MiningResult> {
        self.mine_with_progress(merkle_root, previous_hash, difficulty, |_| {})
    }

    /// Like [`mine`](Self::mine), reporting progress at the configured interval
    pub fn mine_with_progress<F>(
        &self,
        merkle_root: &str,
        previous_hash: &str,
        difficulty: u32,
        on_progress: F,
    ) -> Result<MiningResult>
    where
        F: Fn(&MiningProgress) + Sync,
    {
        self.current_nonce.store(0, Ordering::SeqCst);
        self.total_attempts.store(0, Ordering::SeqCst);

        let threads = self.config.threads.max(1);
        let started = Instant::now();
        let mut prefix = HashBuilder::new();
        prefix.update_str(merkle_root).update_str(previous_hash);

        let search = Search {
            prefix,
            difficulty,
            stride: threads as u64,
            started,
            deadline: self
                .config
                .timeout_seconds
                .map(|secs| started + Duration::from_secs(secs)),
            max_attempts: self.config.max_attempts,
            progress_interval: Duration::from_millis(self.config.progress_interval_ms),
            on_progress: &on_progress,
            stop_requested: &self.stop_requested,
            current_nonce: &self.current_nonce,
            attempts: &self.total_attempts,
            best: AtomicU64::new(u64::MAX),
            halt: OnceLock::new(),
        };

        debug!(difficulty, threads, "starting proof-of-work search");
        if threads == 1 {
            search.run_lane(0);
        } else {
            std::thread::scope(|scope| {
                for lane in 0..threads as u64 {
                    let search = &search;
                    scope.spawn(move || search.run_lane(lane));
                }
            });
        }

        let attempts = self.total_attempts.load(Ordering::SeqCst);
        let duration_seconds = started.elapsed().as_secs_f64();

        if let Some(halt) = search.halt.get() {
            warn!(attempts, ?halt, "proof-of-work search aborted");
            return Err(match halt {
                Halt::Cancelled => ValidationError::MiningCancelled { attempts },
                Halt::DeadlinePassed => ValidationError::MiningTimeout { attempts },
            }
            .into());
        }

        let nonce = search.best.load(Ordering::SeqCst);
        if nonce == u64::MAX {
            // Every lane exhausted the nonce range without a hit
            return Err(ValidationError::MiningTimeout { attempts }.into());
        }

        let hash = hash_with_nonce(&search.prefix, nonce);
        let hash_rate = rate(attempts, duration_seconds);
        info!(
            nonce,
            hash = %format_hash_short(&hash),
            attempts,
            rate = %format_hash_rate(hash_rate),
            "proof of work found"
        );

        Ok(MiningResult {
            nonce,
            hash,
            attempts,
            duration_seconds,
            hash_rate,
        })
    }
}

impl Default for ProofOfWorkMiner {
    fn default() -> Self {
        Self::new(ProofOfWorkConfig::default())
    }
}
