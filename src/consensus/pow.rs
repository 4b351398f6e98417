// Proof of Work implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::core::{Block, Hash256, opt_hash_bytes, sha256_concat};
use crate::error::{LedgerError, Result};

/// Default difficulty: leading zero bits required in a block hash
pub const DEFAULT_TARGET_BITS: u32 = 16;

/// How often the cancel flag is polled
const CANCEL_POLL_INTERVAL: u64 = 1024;

/// Attempts between two progress log lines
const PROGRESS_INTERVAL: u64 = 100_000;

fn is_progress_point(attempts: u64) -> bool {
    attempts > 0 && attempts % PROGRESS_INTERVAL == 0
}

/// Difficulty target `1 << (256 - bits)` as a big-endian 256-bit integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub bits: u32,
    value: Hash256,
}

impl Target {
    /// `bits` must lie in `1..=255`
    pub fn from_bits(bits: u32) -> Result<Self> {
        if !(1..=255).contains(&bits) {
            return Err(LedgerError::Config(format!(
                "target bits must be within 1..=255, got {}",
                bits
            )));
        }
        let shift = (256 - bits) as usize;
        let mut value = [0u8; 32];
        value[31 - shift / 8] = 1 << (shift % 8);
        Ok(Self {
            bits,
            value: Hash256::new(value),
        })
    }

    pub fn as_hash(&self) -> &Hash256 {
        &self.value
    }

    /// Check if a hash meets this target (hash < target, both big-endian)
    pub fn is_met_by(&self, hash: &Hash256) -> bool {
        hash.as_bytes() < self.value.as_bytes()
    }
}

/// Proof-of-work search and verification at a fixed difficulty
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    pub target: Target,
    /// Highest nonce tried before giving up
    pub max_nonce: u64,
}

impl ProofOfWork {
    pub fn new(bits: u32, max_nonce: u64) -> Result<Self> {
        Ok(Self {
            target: Target::from_bits(bits)?,
            max_nonce,
        })
    }

    /// SHA256 of prev hash, transactions hash, timestamp, bits and nonce
    /// (the three integers as 8-byte big-endian)
    pub fn candidate_hash(&self, block: &Block, nonce: u64) -> Hash256 {
        let tx_hash = block.hash_transactions();
        let timestamp = block.timestamp.to_be_bytes();
        let bits = (self.target.bits as i64).to_be_bytes();
        let nonce = nonce.to_be_bytes();
        sha256_concat([
            opt_hash_bytes(&block.prev_hash),
            tx_hash.as_bytes().as_slice(),
            timestamp.as_slice(),
            bits.as_slice(),
            nonce.as_slice(),
        ])
    }

    /// Search nonces from 0 up to `max_nonce`
    pub fn run(&self, block: &Block) -> Result<MiningResult> {
        self.search(block, None)
    }

    /// Like `run`, but stops with `MiningCancelled` once `cancel` is set
    pub fn run_cancellable(&self, block: &Block, cancel: &AtomicBool) -> Result<MiningResult> {
        self.search(block, Some(cancel))
    }

    fn search(&self, block: &Block, cancel: Option<&AtomicBool>) -> Result<MiningResult> {
        let start_time = Instant::now();

        // Only the nonce varies, so everything before it is hashed once
        let tx_hash = block.hash_transactions();
        let mut prefix = Vec::with_capacity(32 + 32 + 16);
        prefix.extend_from_slice(opt_hash_bytes(&block.prev_hash));
        prefix.extend_from_slice(tx_hash.as_bytes());
        prefix.extend_from_slice(&block.timestamp.to_be_bytes());
        prefix.extend_from_slice(&(self.target.bits as i64).to_be_bytes());

        let mut attempts = 0u64;
        for nonce in 0..=self.max_nonce {
            if nonce % CANCEL_POLL_INTERVAL == 0 && cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return Err(LedgerError::MiningCancelled);
            }
            if is_progress_point(attempts) {
                let elapsed = start_time.elapsed();
                log::debug!(
                    "Mining attempts: {} ({:.1} KH/s)",
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }

            let hash = sha256_concat([prefix.as_slice(), nonce.to_be_bytes().as_slice()]);
            attempts += 1;

            if self.target.is_met_by(&hash) {
                return Ok(MiningResult {
                    nonce,
                    hash,
                    attempts,
                    duration: start_time.elapsed(),
                });
            }
        }

        Err(LedgerError::MiningExhausted {
            max_nonce: self.max_nonce,
        })
    }

    /// Recompute the hash at the block's own nonce and compare against the target
    pub fn validate(&self, block: &Block) -> bool {
        self.target.is_met_by(&self.candidate_hash(block, block.nonce))
    }
}

/// Mining result
#[derive(Debug, Clone)]
pub struct MiningResult {
    pub nonce: u64,
    pub hash: Hash256,
    /// Number of hashes computed
    pub attempts: u64,
    pub duration: Duration,
}

impl MiningResult {
    /// Calculate hash rate (hashes per second)
    pub fn hash_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}
