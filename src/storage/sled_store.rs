// Block store backed by sled

use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};

use super::{Bucket, BlockStore, Commit, StoreResult, TIP_KEY};

/// sled database with one tree per bucket
pub struct SledStore {
    db: Db,
    blocks: Tree,
    meta: Tree,
}

impl SledStore {
    /// Open (or create) a database directory
    ///
    /// Commits flush synchronously, so no background flusher is started and
    /// the directory lock is released as soon as the last handle drops.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::Config::new()
            .path(path)
            .flush_every_ms(None)
            .open()?;
        Self::from_db(db)
    }

    /// Whether `path` holds a database created by `open`
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().join("db").is_file()
    }

    /// Create an in-memory database (for testing)
    pub fn temporary() -> StoreResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let blocks = db.open_tree("blocks")?;
        let meta = db.open_tree("meta")?;
        Ok(Self { db, blocks, meta })
    }

    fn tree(&self, bucket: Bucket) -> &Tree {
        match bucket {
            Bucket::Blocks => &self.blocks,
            Bucket::Meta => &self.meta,
        }
    }
}

impl BlockStore for SledStore {
    fn get(&self, bucket: Bucket, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.tree(bucket).get(key)?.map(|v| v.to_vec()))
    }

    fn commit_block(
        &self,
        hash: &[u8],
        block: &[u8],
        expected_tip: Option<&[u8]>,
    ) -> StoreResult<Commit> {
        let result = (&self.blocks, &self.meta).transaction(|(blocks, meta)| {
            let current = meta.get(TIP_KEY)?;
            if current.as_deref() != expected_tip {
                return Err(ConflictableTransactionError::Abort(
                    current.map(|v| v.to_vec()),
                ));
            }
            blocks.insert(hash, block)?;
            meta.insert(TIP_KEY, hash)?;
            Ok(())
        });

        match result {
            Ok(()) => {
                self.db.flush()?;
                Ok(Commit::Applied)
            }
            Err(TransactionError::Abort(actual)) => Ok(Commit::Conflict { actual }),
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }
}
