// Block validation

use crate::consensus::pow::ProofOfWork;
use crate::core::{Block, Transaction};

/// Validation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Block hash doesn't meet PoW target
    InvalidProofOfWork,
    /// Stored hash differs from the recomputed proof-of-work hash
    HashMismatch,
    /// Block has no transactions
    NoTransactions,
    /// First transaction is not coinbase
    MissingCoinbase,
    /// Coinbase transaction in non-first position
    CoinbaseNotFirst,
    /// Non-coinbase transaction has no inputs or outputs
    EmptyTransaction,
    /// Transaction id doesn't match its content
    InvalidTransactionId,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ValidationError::InvalidProofOfWork => write!(f, "Invalid proof of work"),
            ValidationError::HashMismatch => write!(f, "Stored hash does not match block content"),
            ValidationError::NoTransactions => write!(f, "Block has no transactions"),
            ValidationError::MissingCoinbase => write!(f, "Missing coinbase transaction"),
            ValidationError::CoinbaseNotFirst => write!(f, "Coinbase not in first position"),
            ValidationError::EmptyTransaction => write!(f, "Empty transaction"),
            ValidationError::InvalidTransactionId => write!(f, "Transaction id does not match content"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Block validator
pub struct BlockValidator<'a> {
    pow: &'a ProofOfWork,
}

impl<'a> BlockValidator<'a> {
    pub fn new(pow: &'a ProofOfWork) -> Self {
        Self { pow }
    }

    /// Validate a complete block
    pub fn validate_block(&self, block: &Block) -> Result<(), ValidationError> {
        if !self.pow.validate(block) {
            return Err(ValidationError::InvalidProofOfWork);
        }
        if self.pow.candidate_hash(block, block.nonce) != block.hash {
            return Err(ValidationError::HashMismatch);
        }

        let (first, rest) = block
            .transactions
            .split_first()
            .ok_or(ValidationError::NoTransactions)?;

        if !first.is_coinbase() {
            return Err(ValidationError::MissingCoinbase);
        }
        if rest.iter().any(Transaction::is_coinbase) {
            return Err(ValidationError::CoinbaseNotFirst);
        }

        for tx in &block.transactions {
            self.validate_transaction(tx)?;
        }

        Ok(())
    }

    /// Structural checks only; spends are not resolved against the chain
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<(), ValidationError> {
        if tx.compute_id() != tx.id {
            return Err(ValidationError::InvalidTransactionId);
        }
        if !tx.is_coinbase() && (tx.inputs.is_empty() || tx.outputs.is_empty()) {
            return Err(ValidationError::EmptyTransaction);
        }
        Ok(())
    }
}
