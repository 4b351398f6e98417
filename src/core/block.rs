// Block data structures

use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::serialize::{read_array, read_count, read_hash, read_opt_hash, write_opt_hash, write_varint};
use crate::core::{Hash256, Serializable, Transaction, sha256_concat};
use crate::error::CodecError;

/// Coinbase data of every genesis block
pub const GENESIS_COINBASE_DATA: &str = "Genesis: an append-only ledger sealed by proof of work";

/// A sealed batch of transactions linked to its predecessor by hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Creation time, seconds since the Unix epoch
    pub timestamp: i64,
    /// First entry is the coinbase for blocks mined with a reward
    pub transactions: Vec<Transaction>,
    /// Hash of the previous block, `None` only for the genesis block
    pub prev_hash: Option<Hash256>,
    /// Nonce found by proof of work
    pub nonce: u64,
    /// Proof-of-work hash, also the storage key. Zero until mined.
    pub hash: Hash256,
}

impl Block {
    /// Create an unmined block stamped with the current time
    pub fn new(transactions: Vec<Transaction>, prev_hash: Option<Hash256>) -> Self {
        Self {
            timestamp: now(),
            transactions,
            prev_hash,
            nonce: 0,
            hash: Hash256::zero(),
        }
    }

    /// Create the unmined genesis block around its coinbase
    pub fn genesis(coinbase: Transaction) -> Self {
        Self::new(vec![coinbase], None)
    }

    /// SHA256 over the concatenated transaction ids, in block order
    ///
    /// This is a flat commitment, not a Merkle tree: any change to the
    /// transaction list changes it, but no membership proof can be derived
    /// for a single transaction.
    pub fn hash_transactions(&self) -> Hash256 {
        sha256_concat(self.transactions.iter().map(|tx| tx.id.as_bytes().as_slice()))
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_none()
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

impl Serializable for Block {
    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        write_opt_hash(buf, &self.prev_hash);
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf.extend_from_slice(self.hash.as_bytes());

        write_varint(buf, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.write_to(buf);
        }
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let timestamp = i64::from_le_bytes(read_array(cursor)?);
        let prev_hash = read_opt_hash(cursor)?;
        let nonce = u64::from_le_bytes(read_array(cursor)?);
        let hash = read_hash(cursor)?;

        let tx_count = read_count(cursor)?;
        let mut transactions = Vec::with_capacity(tx_count);
        for _ in 0..tx_count {
            transactions.push(Transaction::read_from(cursor)?);
        }

        Ok(Self {
            timestamp,
            transactions,
            prev_hash,
            nonce,
            hash,
        })
    }
}
