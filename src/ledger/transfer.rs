// Building and mining value transfers

use crate::core::{Block, Transaction, TxInput, TxOutput};
use crate::error::{LedgerError, Result};
use crate::ledger::{Ledger, UtxoQuery};
use crate::storage::BlockStore;

impl<S: BlockStore> Ledger<S> {
    /// Build a transaction moving `amount` from `from` to `to`
    ///
    /// Spends the outputs chosen by `find_spendable_outputs` and returns any
    /// excess to `from` as a change output. Nothing is written.
    pub fn new_transfer(&self, from: &str, to: &str, amount: u64) -> Result<Transaction> {
        let spendable = self.find_spendable_outputs(from, amount)?;
        if spendable.accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                available: spendable.accumulated,
                requested: amount,
            });
        }

        let inputs = spendable
            .outpoints
            .iter()
            .map(|op| TxInput::new(op.txid, i64::from(op.index), from))
            .collect();

        let mut outputs = vec![TxOutput::new(amount, to)];
        let change = spendable.accumulated - amount;
        if change > 0 {
            outputs.push(TxOutput::new(change, from));
        }

        Ok(Transaction::new(inputs, outputs))
    }

    /// Transfer `amount` and mine it in a block whose reward goes to `from`
    pub fn send(&self, from: &str, to: &str, amount: u64) -> Result<Block> {
        let transfer = self.new_transfer(from, to, amount)?;
        self.mine_with_reward(from, vec![transfer])
    }
}
