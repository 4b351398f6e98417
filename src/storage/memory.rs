// In-process block store

use std::collections::HashMap;
use std::sync::RwLock;

use super::{Bucket, BlockStore, Commit, StoreResult, TIP_KEY};
use crate::error::StoreError;

#[derive(Default)]
struct Buckets {
    blocks: HashMap<Vec<u8>, Vec<u8>>,
    meta: HashMap<Vec<u8>, Vec<u8>>,
}

impl Buckets {
    fn bucket(&self, bucket: Bucket) -> &HashMap<Vec<u8>, Vec<u8>> {
        match bucket {
            Bucket::Blocks => &self.blocks,
            Bucket::Meta => &self.meta,
        }
    }
}

/// Volatile store; one lock covers both buckets so commits are atomic
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Buckets>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryStore {
    fn get(&self, bucket: Bucket, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.bucket(bucket).get(key).cloned())
    }

    fn commit_block(
        &self,
        hash: &[u8],
        block: &[u8],
        expected_tip: Option<&[u8]>,
    ) -> StoreResult<Commit> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let current = inner.meta.get(TIP_KEY);
        if current.map(Vec::as_slice) != expected_tip {
            return Ok(Commit::Conflict {
                actual: current.cloned(),
            });
        }
        inner.blocks.insert(hash.to_vec(), block.to_vec());
        inner.meta.insert(TIP_KEY.to_vec(), hash.to_vec());
        Ok(Commit::Applied)
    }
}
