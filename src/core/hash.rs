// Hashing utilities

use sha2::{Digest, Sha256};

use crate::core::Hash256;

/// Single SHA256 hash
pub fn sha256(data: &[u8]) -> Hash256 {
    Hash256::new(Sha256::digest(data).into())
}

/// SHA256 over several byte slices, equivalent to hashing their concatenation
pub fn sha256_concat<'a, I>(parts: I) -> Hash256
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash256::new(hasher.finalize().into())
}
