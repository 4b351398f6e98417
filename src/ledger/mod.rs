// The ledger: chain tip, mining and queries over a block store

mod iter;
mod transfer;
mod utxo;

pub use iter::BlockIter;
pub use utxo::{
    OutPoint, SpendableOutputs, UnspentTransaction, UtxoQuery, scan_unspent, select_spendable, total_value,
};

use std::sync::atomic::AtomicBool;
use std::sync::{PoisonError, RwLock};

use crate::config::LedgerConfig;
use crate::consensus::{BlockValidator, MiningResult, ProofOfWork, ValidationError};
use crate::core::{Block, GENESIS_COINBASE_DATA, Hash256, Serializable, Transaction, opt_hash_bytes};
use crate::error::{LedgerError, Result};
use crate::storage::{BlockStore, Commit, SledStore};

/// Handle to one persisted chain
///
/// Any number of threads may query concurrently. Appends are serialized:
/// each block commits only if the tip it was built on is still current.
pub struct Ledger<S: BlockStore = SledStore> {
    store: S,
    config: LedgerConfig,
    pow: ProofOfWork,
    tip: RwLock<Hash256>,
}

impl Ledger<SledStore> {
    /// Create a new ledger under `config.data_dir`, rewarding `address` in the genesis block
    pub fn create(config: LedgerConfig, address: &str) -> Result<Self> {
        let store = SledStore::open(&config.data_dir)?;
        Self::create_with_store(store, config, address)
    }

    /// Open the existing ledger under `config.data_dir`
    pub fn open(config: LedgerConfig) -> Result<Self> {
        if !SledStore::exists(&config.data_dir) {
            return Err(LedgerError::LedgerNotFound(config.data_dir));
        }
        let store = SledStore::open(&config.data_dir)?;
        Self::open_with_store(store, config)
    }
}

impl<S: BlockStore> Ledger<S> {
    /// Mine and persist a genesis block in an empty store
    pub fn create_with_store(store: S, config: LedgerConfig, address: &str) -> Result<Self> {
        let pow = config.proof_of_work()?;
        if store.get_tip()?.is_some() {
            return Err(LedgerError::LedgerAlreadyExists(config.data_dir));
        }

        let coinbase = Transaction::coinbase(address, Some(GENESIS_COINBASE_DATA), config.subsidy);
        let genesis = seal(&pow, Block::genesis(coinbase))?;

        match store.commit_block(genesis.hash.as_bytes(), &genesis.serialize(), None)? {
            Commit::Applied => {}
            Commit::Conflict { .. } => return Err(LedgerError::LedgerAlreadyExists(config.data_dir)),
        }
        log::info!("Created ledger with genesis block {}", genesis.hash);

        Ok(Self {
            store,
            config,
            pow,
            tip: RwLock::new(genesis.hash),
        })
    }

    /// Attach to a store that already holds a chain
    pub fn open_with_store(store: S, config: LedgerConfig) -> Result<Self> {
        let pow = config.proof_of_work()?;
        let tip = match iter::stored_tip(&store)? {
            Some(tip) => tip,
            None => return Err(LedgerError::LedgerNotFound(config.data_dir)),
        };
        log::info!("Opened ledger at tip {}", tip);

        Ok(Self {
            store,
            config,
            pow,
            tip: RwLock::new(tip),
        })
    }

    /// Tip as last observed by this handle
    ///
    /// Reads and queries go through the store, so appends made by another
    /// handle on the same store are visible to them even before this value
    /// catches up.
    pub fn tip(&self) -> Hash256 {
        *self.tip.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Blocks from the stored tip back to genesis
    pub fn iter(&self) -> BlockIter<'_, S> {
        BlockIter::from_stored_tip(&self.store)
    }

    pub fn get_block(&self, hash: &Hash256) -> Result<Block> {
        iter::load_block(&self.store, hash)
    }

    /// Mine `transactions` on top of the current tip and append the block
    pub fn mine(&self, transactions: Vec<Transaction>) -> Result<Block> {
        let block = self.prepare_block(transactions, None)?;
        self.append_block(&block)?;
        Ok(block)
    }

    /// Like `mine`, aborting the nonce search once `cancel` is set
    pub fn mine_cancellable(&self, transactions: Vec<Transaction>, cancel: &AtomicBool) -> Result<Block> {
        let block = self.prepare_block(transactions, Some(cancel))?;
        self.append_block(&block)?;
        Ok(block)
    }

    /// Mine `transactions` behind a coinbase that pays the subsidy to `miner`
    pub fn mine_with_reward(&self, miner: &str, transactions: Vec<Transaction>) -> Result<Block> {
        let mut all = Vec::with_capacity(transactions.len() + 1);
        all.push(Transaction::coinbase(miner, None, self.config.subsidy));
        all.extend(transactions);
        self.mine(all)
    }

    /// Build and seal a block on the stored tip without persisting it
    ///
    /// No lock is held during the nonce search.
    pub fn prepare_block(
        &self,
        transactions: Vec<Transaction>,
        cancel: Option<&AtomicBool>,
    ) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::EmptyBlock);
        }
        let tip = self.stored_tip()?;
        let block = Block::new(transactions, Some(tip));
        match cancel {
            Some(cancel) => seal_with(&self.pow, block, |b| self.pow.run_cancellable(b, cancel)),
            None => seal(&self.pow, block),
        }
    }

    /// Persist a sealed block and advance the tip in one store transaction
    ///
    /// Fails with `StaleTip` when the tip is no longer the block's
    /// predecessor; the store is then left exactly as it was.
    pub fn append_block(&self, block: &Block) -> Result<()> {
        BlockValidator::new(&self.pow).validate_block(block)?;

        let mut tip = self.tip.write().unwrap_or_else(PoisonError::into_inner);
        let outcome = self.store.commit_block(
            block.hash.as_bytes(),
            &block.serialize(),
            block.prev_hash.as_ref().map(|h| h.as_bytes().as_slice()),
        )?;

        match outcome {
            Commit::Applied => {
                *tip = block.hash;
                log::info!(
                    "Appended block {} ({} transactions, nonce {})",
                    block.hash,
                    block.transactions.len(),
                    block.nonce
                );
                Ok(())
            }
            Commit::Conflict { actual } => {
                let actual = actual.map(|bytes| Hash256::from_slice(&bytes)).transpose()?;
                if let Some(current) = actual {
                    *tip = current;
                }
                log::warn!(
                    "Rejected block {}: built on {:?}, tip is {:?}",
                    block.hash,
                    block.prev_hash.map(|h| h.to_hex()),
                    actual.map(|h| h.to_hex())
                );
                Err(LedgerError::StaleTip {
                    expected: block.prev_hash,
                    actual,
                })
            }
        }
    }

    /// Sum of the unspent outputs locked to `address`
    ///
    /// Fails with `ValueOverflow` instead of wrapping.
    pub fn balance(&self, address: &str) -> Result<u64> {
        total_value(&self.find_utxo(address)?)
    }

    /// Re-validate every block from tip to genesis; returns the chain length
    pub fn verify_chain(&self) -> Result<usize> {
        let validator = BlockValidator::new(&self.pow);
        let tip = self.stored_tip()?;
        let mut expected = Some(tip);
        let mut count = 0;

        for block in BlockIter::new(&self.store, Some(tip)) {
            let block = block?;
            if Some(block.hash) != expected {
                return Err(ValidationError::HashMismatch.into());
            }
            validator.validate_block(&block)?;
            expected = block.prev_hash;
            count += 1;
        }

        Ok(count)
    }
}

impl<S: BlockStore> Ledger<S> {
    fn stored_tip(&self) -> Result<Hash256> {
        iter::stored_tip(&self.store)?
            .ok_or_else(|| LedgerError::LedgerNotFound(self.config.data_dir.clone()))
    }
}

impl<S: BlockStore> UtxoQuery for Ledger<S> {
    fn find_unspent_transactions(&self, address: &str) -> Result<Vec<UnspentTransaction>> {
        scan_unspent(self.iter(), address)
    }
}

fn seal(pow: &ProofOfWork, block: Block) -> Result<Block> {
    seal_with(pow, block, |b| pow.run(b))
}

/// Run the nonce search and stamp the result onto the block
fn seal_with<F>(pow: &ProofOfWork, mut block: Block, search: F) -> Result<Block>
where
    F: FnOnce(&Block) -> Result<MiningResult>,
{
    let result = search(&block)?;
    log::debug!(
        "Mined {} after {} attempts in {:?} ({:.0} H/s) over prev {}",
        result.hash,
        result.attempts,
        result.duration,
        result.hash_rate(),
        hex::encode(opt_hash_bytes(&block.prev_hash))
    );
    block.nonce = result.nonce;
    block.hash = result.hash;

    if !pow.validate(&block) {
        return Err(ValidationError::InvalidProofOfWork.into());
    }
    Ok(block)
}
