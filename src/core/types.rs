// Basic types for the ledger

use std::fmt;

use crate::error::CodecError;

/// 256-bit hash type (32 bytes)
/// Used for block hashes and transaction ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Create a new Hash256 from a byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a Hash256 from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, CodecError> {
        let bytes: [u8; 32] = slice
            .try_into()
            .map_err(|_| CodecError::InvalidHashLength(slice.len()))?;
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// All-zero hash, the placeholder of a block that has not been mined yet
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Bytes of an optional hash; `None` is the empty byte sequence
pub fn opt_hash_bytes(hash: &Option<Hash256>) -> &[u8] {
    match hash {
        Some(h) => h.as_bytes(),
        None => &[],
    }
}
