// Consensus and validation logic

pub mod pow;
pub mod validation;

pub use pow::{DEFAULT_TARGET_BITS, MiningResult, ProofOfWork, Target};
pub use validation::{BlockValidator, ValidationError};
