// Ledger configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consensus::{DEFAULT_TARGET_BITS, ProofOfWork};
use crate::error::{LedgerError, Result};

/// Reward paid by each coinbase transaction
pub const DEFAULT_SUBSIDY: u64 = 10;

/// Settings of one ledger instance; every field has a default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory of the sled database
    pub data_dir: PathBuf,
    /// Proof-of-work difficulty, fixed for the lifetime of the ledger
    pub target_bits: u32,
    /// Nonce search bound per block
    pub max_nonce: u64,
    pub subsidy: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            target_bits: DEFAULT_TARGET_BITS,
            max_nonce: i64::MAX as u64,
            subsidy: DEFAULT_SUBSIDY,
        }
    }
}

impl LedgerConfig {
    /// Load settings from a JSON file; missing fields keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            LedgerError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.proof_of_work()?;
        Ok(config)
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Proof of work for these settings; rejects out-of-range `target_bits`
    pub fn proof_of_work(&self) -> Result<ProofOfWork> {
        ProofOfWork::new(self.target_bits, self.max_nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "utxo-ledger-{}-{}.json",
            name,
            hex::encode(rand::random::<[u8; 8]>())
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.target_bits, 16);
        assert_eq!(config.subsidy, 10);
        assert!(config.proof_of_work().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let path = temp_file("partial", r#"{ "target_bits": 12, "data_dir": "/tmp/ledger" }"#);
        let config = LedgerConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.target_bits, 12);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ledger"));
        assert_eq!(config.subsidy, DEFAULT_SUBSIDY);
    }

    #[test]
    fn test_load_rejects_bad_difficulty() {
        let path = temp_file("bad-bits", r#"{ "target_bits": 0 }"#);
        let result = LedgerConfig::load(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = LedgerConfig::load("/nonexistent/utxo-ledger.json");
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }
}
