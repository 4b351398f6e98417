// Storage layer: the key-value contract the ledger persists through

mod memory;
mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Key of the tip pointer inside the `Meta` bucket
pub const TIP_KEY: &[u8] = b"tip";

/// Namespaces of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Block hash -> encoded block
    Blocks,
    /// Singleton records such as the tip pointer
    Meta,
}

/// Outcome of an atomic block commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// Block and tip were written together
    Applied,
    /// The tip no longer matched; nothing was written
    Conflict { actual: Option<Vec<u8>> },
}

/// Key-value persistence required by the ledger
///
/// Reads see only committed state. `commit_block` is the single write
/// transaction: it stores the block record and moves the tip in one atomic
/// step, guarded by a compare-and-swap on the current tip, and serializes
/// with every other commit on the same store.
pub trait BlockStore: Send + Sync {
    fn get(&self, bucket: Bucket, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// `expected_tip = None` requires that no tip exists yet
    fn commit_block(
        &self,
        hash: &[u8],
        block: &[u8],
        expected_tip: Option<&[u8]>,
    ) -> StoreResult<Commit>;

    fn get_tip(&self) -> StoreResult<Option<Vec<u8>>> {
        self.get(Bucket::Meta, TIP_KEY)
    }
}

impl<S: BlockStore + ?Sized> BlockStore for std::sync::Arc<S> {
    fn get(&self, bucket: Bucket, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(bucket, key)
    }

    fn commit_block(
        &self,
        hash: &[u8],
        block: &[u8],
        expected_tip: Option<&[u8]>,
    ) -> StoreResult<Commit> {
        (**self).commit_block(hash, block, expected_tip)
    }
}
