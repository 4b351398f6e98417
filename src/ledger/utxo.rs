// Unspent output derivation by full chain scan
//
// No UTXO index is kept: every query walks the chain from tip to genesis.
// `UtxoQuery` is the boundary a cached index would implement instead.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::core::{Block, Hash256, Transaction, TxOutput};
use crate::error::{LedgerError, Result};

/// Reference to one output of one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// A transaction holding at least one unspent output for the scanned address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentTransaction {
    pub transaction: Transaction,
    /// Indices of the outputs still unspent and locked to the address, ascending
    pub outputs: Vec<u32>,
}

impl UnspentTransaction {
    pub fn unspent_outputs(&self) -> impl Iterator<Item = (u32, &TxOutput)> + '_ {
        self.outputs
            .iter()
            .filter_map(|&i| self.transaction.outputs.get(i as usize).map(|out| (i, out)))
    }
}

/// Result of spendable-output selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpendableOutputs {
    /// May fall short of the requested amount; callers must check
    pub accumulated: u64,
    pub outpoints: Vec<OutPoint>,
}

/// Collect unspent outputs of `address` from blocks given newest first
///
/// Within a block transactions are visited last to first, and a
/// transaction's inputs are recorded as spends before its own outputs are
/// checked, so every spend is known before the older output it consumes is
/// reached.
pub fn scan_unspent<I>(blocks: I, address: &str) -> Result<Vec<UnspentTransaction>>
where
    I: IntoIterator<Item = Result<Block>>,
{
    let mut spent: HashMap<Hash256, HashSet<i64>> = HashMap::new();
    let mut unspent = Vec::new();
    let mut scanned = 0usize;

    for block in blocks {
        let block = block?;
        scanned += 1;

        for tx in block.transactions.into_iter().rev() {
            if !tx.is_coinbase() {
                for input in tx.inputs.iter().filter(|input| input.unlocks(address)) {
                    if let Some(prev) = input.prev_tx_id {
                        spent.entry(prev).or_default().insert(input.output_index);
                    }
                }
            }

            let spent_here = spent.get(&tx.id);
            let outputs: Vec<u32> = (0u32..)
                .zip(&tx.outputs)
                .filter(|(index, out)| {
                    let is_spent = spent_here.is_some_and(|s| s.contains(&i64::from(*index)));
                    !is_spent && out.is_locked_to(address)
                })
                .map(|(index, _)| index)
                .collect();

            if !outputs.is_empty() {
                unspent.push(UnspentTransaction {
                    transaction: tx,
                    outputs,
                });
            }
        }
    }

    log::debug!(
        "Scanned {} blocks: {} transactions with unspent outputs for {}",
        scanned,
        unspent.len(),
        address
    );
    Ok(unspent)
}

/// Accumulate outputs in scan order until the total reaches `amount`
pub fn select_spendable(
    unspent: &[UnspentTransaction],
    address: &str,
    amount: u64,
) -> Result<SpendableOutputs> {
    let mut selected = SpendableOutputs::default();

    for utx in unspent {
        for (index, out) in utx.unspent_outputs() {
            if selected.accumulated >= amount {
                return Ok(selected);
            }
            if out.is_locked_to(address) {
                selected.accumulated = selected
                    .accumulated
                    .checked_add(out.value)
                    .ok_or(LedgerError::ValueOverflow)?;
                selected.outpoints.push(OutPoint::new(utx.transaction.id, index));
            }
        }
    }

    Ok(selected)
}

/// Checked sum of output values
pub fn total_value<'a, I>(outputs: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a TxOutput>,
{
    outputs.into_iter().try_fold(0u64, |acc, out| {
        acc.checked_add(out.value).ok_or(LedgerError::ValueOverflow)
    })
}

/// Balance and spend queries over unspent outputs
pub trait UtxoQuery {
    /// Transactions with outputs locked to `address` that no input has consumed
    fn find_unspent_transactions(&self, address: &str) -> Result<Vec<UnspentTransaction>>;

    /// Unspent outputs locked to `address`
    fn find_utxo(&self, address: &str) -> Result<Vec<TxOutput>> {
        Ok(self
            .find_unspent_transactions(address)?
            .iter()
            .flat_map(|utx| utx.unspent_outputs())
            .filter(|(_, out)| out.is_locked_to(address))
            .map(|(_, out)| out.clone())
            .collect())
    }

    /// Outputs of `address` whose values first reach `amount`, in scan order
    fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<SpendableOutputs> {
        let unspent = self.find_unspent_transactions(address)?;
        select_spendable(&unspent, address, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TxInput;

    /// Chain given oldest first, handed to the scan newest first
    fn scan(chain: &[Vec<Transaction>], address: &str) -> Vec<UnspentTransaction> {
        let blocks = chain
            .iter()
            .rev()
            .map(|txs| Ok(Block::new(txs.clone(), None)));
        scan_unspent(blocks, address).unwrap()
    }

    fn total(unspent: &[UnspentTransaction]) -> u64 {
        unspent
            .iter()
            .flat_map(|utx| utx.unspent_outputs())
            .map(|(_, out)| out.value)
            .sum()
    }

    fn pay(from: &str, prev: &Transaction, index: i64, outputs: Vec<TxOutput>) -> Transaction {
        Transaction::new(vec![TxInput::new(prev.id, index, from)], outputs)
    }

    #[test]
    fn test_coinbase_only_chain() {
        let chain: Vec<Vec<Transaction>> = (0..4)
            .map(|_| vec![Transaction::coinbase("alice", None, 10)])
            .collect();
        let unspent = scan(&chain, "alice");
        assert_eq!(unspent.len(), 4);
        assert_eq!(total(&unspent), 40);
        assert!(scan(&chain, "bob").is_empty());
    }

    #[test]
    fn test_spent_output_is_not_resurfaced() {
        let cb = Transaction::coinbase("alice", None, 10);
        let spend = pay("alice", &cb, 0, vec![TxOutput::new(4, "bob"), TxOutput::new(6, "alice")]);
        let chain = vec![vec![cb.clone()], vec![spend.clone()]];

        let alice = scan(&chain, "alice");
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].transaction.id, spend.id);
        assert_eq!(alice[0].outputs, vec![1]);
        assert!(alice.iter().all(|utx| utx.transaction.id != cb.id));

        let bob = scan(&chain, "bob");
        assert_eq!(bob[0].outputs, vec![0]);
        assert_eq!(total(&bob), 4);
    }

    #[test]
    fn test_spend_within_same_block() {
        let cb = Transaction::coinbase("alice", None, 10);
        let spend = pay("alice", &cb, 0, vec![TxOutput::new(10, "bob")]);
        let chain = vec![vec![cb, spend]];

        assert!(scan(&chain, "alice").is_empty());
        assert_eq!(total(&scan(&chain, "bob")), 10);
    }

    #[test]
    fn test_partial_spend_of_multi_output_transaction() {
        let cb = Transaction::coinbase("alice", None, 10);
        let split = pay(
            "alice",
            &cb,
            0,
            vec![TxOutput::new(3, "alice"), TxOutput::new(7, "alice")],
        );
        let spend_second = pay("alice", &split, 1, vec![TxOutput::new(7, "carol")]);
        let chain = vec![vec![cb], vec![split.clone()], vec![spend_second]];

        let alice = scan(&chain, "alice");
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].transaction.id, split.id);
        assert_eq!(alice[0].outputs, vec![0]);
        assert_eq!(total(&alice), 3);
    }

    #[test]
    fn test_foreign_unlock_does_not_mark_spent() {
        // Bob cannot consume Alice's output by naming it
        let cb = Transaction::coinbase("alice", None, 10);
        let theft = pay("bob", &cb, 0, vec![TxOutput::new(10, "bob")]);
        let chain = vec![vec![cb.clone()], vec![theft]];

        let alice = scan(&chain, "alice");
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].transaction.id, cb.id);
    }

    #[test]
    fn test_select_minimum_prefix_in_scan_order() {
        // Blocks mined oldest to newest with outputs 4, 6, 5: the scan sees 5 first
        let chain: Vec<Vec<Transaction>> = [4, 6, 5]
            .into_iter()
            .map(|v| vec![Transaction::coinbase("x", None, v)])
            .collect();
        let unspent = scan(&chain, "x");

        let selected = select_spendable(&unspent, "x", 9).unwrap();
        assert_eq!(selected.accumulated, 11);
        assert_eq!(
            selected.outpoints,
            vec![
                OutPoint::new(chain[2][0].id, 0),
                OutPoint::new(chain[1][0].id, 0)
            ]
        );
    }

    #[test]
    fn test_select_within_one_transaction() {
        let cb = Transaction::coinbase("x", None, 15);
        let split = pay(
            "x",
            &cb,
            0,
            vec![TxOutput::new(4, "x"), TxOutput::new(6, "x"), TxOutput::new(5, "x")],
        );
        let unspent = scan(&[vec![cb], vec![split.clone()]], "x");

        let selected = select_spendable(&unspent, "x", 9).unwrap();
        assert_eq!(selected.accumulated, 10);
        assert_eq!(
            selected.outpoints,
            vec![OutPoint::new(split.id, 0), OutPoint::new(split.id, 1)]
        );
    }

    #[test]
    fn test_select_insufficient_and_zero() {
        let chain = vec![vec![Transaction::coinbase("x", None, 4)]];
        let unspent = scan(&chain, "x");

        let selected = select_spendable(&unspent, "x", 9).unwrap();
        assert_eq!(selected.accumulated, 4);
        assert_eq!(selected.outpoints.len(), 1);

        assert_eq!(select_spendable(&unspent, "x", 0).unwrap(), SpendableOutputs::default());
    }

    #[test]
    fn test_values_beyond_u64_are_reported() {
        let chain = vec![
            vec![Transaction::coinbase("x", None, u64::MAX)],
            vec![Transaction::coinbase("x", None, 2)],
        ];
        let unspent = scan(&chain, "x");

        assert!(matches!(
            select_spendable(&unspent, "x", u64::MAX),
            Err(LedgerError::ValueOverflow)
        ));
        // Selection that stops before the large output is unaffected
        assert_eq!(select_spendable(&unspent, "x", 2).unwrap().accumulated, 2);

        let outputs: Vec<TxOutput> = unspent
            .iter()
            .flat_map(|utx| utx.unspent_outputs())
            .map(|(_, out)| out.clone())
            .collect();
        assert!(matches!(total_value(&outputs), Err(LedgerError::ValueOverflow)));
        assert_eq!(total_value(&outputs[..1]).unwrap(), 2);
    }

    #[test]
    fn test_scan_propagates_errors() {
        let blocks = vec![Err(LedgerError::MissingBlock(Hash256::zero()))];
        assert!(scan_unspent(blocks, "x").is_err());
    }
}
