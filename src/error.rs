// Error types for the ledger

use std::path::PathBuf;

use thiserror::Error;

use crate::consensus::ValidationError;
use crate::core::Hash256;

/// Failure to decode persisted bytes into a ledger record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    Truncated,
    #[error("invalid hash length: expected 0 or 32, got {0}")]
    InvalidHashLength(usize),
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),
    #[error("declared length {0} exceeds remaining input")]
    LengthOverflow(u64),
}

/// Failure of the backing key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("a ledger already exists at {}", .0.display())]
    LedgerAlreadyExists(PathBuf),

    #[error("no ledger found at {}", .0.display())]
    LedgerNotFound(PathBuf),

    #[error("corrupt record: {0}")]
    Codec(#[from] CodecError),

    #[error("nonce space exhausted after {max_nonce} without meeting target")]
    MiningExhausted { max_nonce: u64 },

    #[error("mining cancelled")]
    MiningCancelled,

    #[error("insufficient funds: have {available}, need {requested}")]
    InsufficientFunds { available: u64, requested: u64 },

    /// Another append moved the tip between sealing and persisting
    #[error("tip moved: block built on {}, tip is now {}", fmt_tip(.expected), fmt_tip(.actual))]
    StaleTip {
        expected: Option<Hash256>,
        actual: Option<Hash256>,
    },

    #[error("block {0} referenced but not stored")]
    MissingBlock(Hash256),

    #[error("invalid block: {0}")]
    InvalidBlock(#[from] ValidationError),

    #[error("sum of output values overflows u64")]
    ValueOverflow,

    #[error("refusing to mine a block without transactions")]
    EmptyBlock,

    #[error("invalid configuration: {0}")]
    Config(String),
}

fn fmt_tip(tip: &Option<Hash256>) -> String {
    tip.map(|h| h.to_hex()).unwrap_or_else(|| "<none>".to_string())
}

pub type Result<T> = std::result::Result<T, LedgerError>;
