// Append-only UTXO ledger sealed by proof of work, persisted in sled

pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod error;
pub mod ledger;
pub mod storage;

// Re-exports for convenience
pub use cli::{Cli, CliHandler};
pub use config::LedgerConfig;
pub use consensus::{BlockValidator, ProofOfWork, Target, ValidationError};
pub use crate::core::{Block, Hash256, Serializable, Transaction, TxInput, TxOutput};
pub use error::{CodecError, LedgerError, Result, StoreError};
pub use ledger::{BlockIter, Ledger, OutPoint, SpendableOutputs, UnspentTransaction, UtxoQuery};
pub use storage::{BlockStore, MemoryStore, SledStore};
