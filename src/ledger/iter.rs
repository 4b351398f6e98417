// Chain traversal from the tip back to genesis

use std::iter::FusedIterator;

use crate::core::{Block, Hash256, Serializable};
use crate::error::{LedgerError, Result};
use crate::storage::{BlockStore, Bucket};

/// Iterator over the chain from the tip back to genesis
///
/// Ends right after yielding the block without a predecessor, or after the
/// first error. Independent iterators over the same store see the same
/// sequence since stored blocks never change.
pub struct BlockIter<'a, S: ?Sized> {
    store: &'a S,
    cursor: Cursor,
}

enum Cursor {
    /// Start at whatever tip the store holds when iteration begins
    StoredTip,
    At(Hash256),
    Done,
}

impl<'a, S: BlockStore + ?Sized> BlockIter<'a, S> {
    pub fn new(store: &'a S, tip: Option<Hash256>) -> Self {
        let cursor = match tip {
            Some(hash) => Cursor::At(hash),
            None => Cursor::Done,
        };
        Self { store, cursor }
    }

    /// Iterate from the tip committed in `store` at the first call to `next`
    pub fn from_stored_tip(store: &'a S) -> Self {
        Self {
            store,
            cursor: Cursor::StoredTip,
        }
    }

    /// Hash of the block the next call will load, once known
    pub fn current_hash(&self) -> Option<&Hash256> {
        match &self.cursor {
            Cursor::At(hash) => Some(hash),
            Cursor::StoredTip | Cursor::Done => None,
        }
    }
}

impl<'a, S: BlockStore + ?Sized> Iterator for BlockIter<'a, S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Done => return None,
            Cursor::At(hash) => hash,
            Cursor::StoredTip => match stored_tip(self.store).transpose()? {
                Ok(hash) => hash,
                Err(e) => return Some(Err(e)),
            },
        };

        let block = load_block(self.store, &hash);
        if let Ok(Block {
            prev_hash: Some(prev),
            ..
        }) = &block
        {
            self.cursor = Cursor::At(*prev);
        }
        Some(block)
    }
}

impl<'a, S: BlockStore + ?Sized> FusedIterator for BlockIter<'a, S> {}

/// Tip pointer currently committed in `store`
pub(crate) fn stored_tip<S: BlockStore + ?Sized>(store: &S) -> Result<Option<Hash256>> {
    match store.get_tip()? {
        Some(bytes) => Ok(Some(Hash256::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn load_block<S: BlockStore + ?Sized>(store: &S, hash: &Hash256) -> Result<Block> {
    match store.get(Bucket::Blocks, hash.as_bytes())? {
        Some(bytes) => Ok(Block::deserialize(&bytes)?),
        None => Err(LedgerError::MissingBlock(*hash)),
    }
}
