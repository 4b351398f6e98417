// Transaction data structures
//
// Spend authorization is literal string equality between an input's unlock
// key and the referenced output's lock key. It is not a signature scheme and
// offers no security; a key pair with sign/verify belongs behind the
// `unlocks` / `is_locked_to` predicates.

use std::io::Cursor;

use crate::core::serialize::{
    read_array, read_count, read_hash, read_opt_hash, read_var_str, write_opt_hash,
    write_var_str, write_varint,
};
use crate::core::{Hash256, Serializable, sha256};
use crate::error::CodecError;

/// Output index carried by a coinbase input
pub const COINBASE_OUTPUT_INDEX: i64 = -1;

/// Transaction input - references one output of a previous transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Id of the previous transaction, `None` for a coinbase input
    pub prev_tx_id: Option<Hash256>,
    /// Index of the output in the previous transaction
    pub output_index: i64,
    /// Must equal the referenced output's lock key
    pub unlock_key: String,
}

impl TxInput {
    pub fn new(prev_tx_id: Hash256, output_index: i64, unlock_key: impl Into<String>) -> Self {
        Self {
            prev_tx_id: Some(prev_tx_id),
            output_index,
            unlock_key: unlock_key.into(),
        }
    }

    /// Create a coinbase input (block reward); the unlock key carries free-form data
    pub fn coinbase(data: impl Into<String>) -> Self {
        Self {
            prev_tx_id: None,
            output_index: COINBASE_OUTPUT_INDEX,
            unlock_key: data.into(),
        }
    }

    /// Check if this is a coinbase input
    pub fn is_coinbase(&self) -> bool {
        self.prev_tx_id.is_none() && self.output_index == COINBASE_OUTPUT_INDEX
    }

    /// Whether this input was authorized by `address`
    pub fn unlocks(&self, address: &str) -> bool {
        self.unlock_key == address
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        write_opt_hash(buf, &self.prev_tx_id);
        buf.extend_from_slice(&self.output_index.to_le_bytes());
        write_var_str(buf, &self.unlock_key);
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let prev_tx_id = read_opt_hash(cursor)?;
        let output_index = i64::from_le_bytes(read_array(cursor)?);
        let unlock_key = read_var_str(cursor)?;
        Ok(Self {
            prev_tx_id,
            output_index,
            unlock_key,
        })
    }
}

/// Transaction output - an indivisible amount locked to an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub lock_key: String,
}

impl TxOutput {
    pub fn new(value: u64, lock_key: impl Into<String>) -> Self {
        Self {
            value,
            lock_key: lock_key.into(),
        }
    }

    /// Whether `address` can spend this output
    pub fn is_locked_to(&self, address: &str) -> bool {
        self.lock_key == address
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_var_str(buf, &self.lock_key);
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let value = u64::from_le_bytes(read_array(cursor)?);
        let lock_key = read_var_str(cursor)?;
        Ok(Self { value, lock_key })
    }
}

/// Transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Hash of the encoded inputs and outputs
    pub id: Hash256,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Create a transaction and compute its id
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: Hash256::zero(),
            inputs,
            outputs,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// Create a coinbase transaction paying `value` to `to`
    ///
    /// Without `data` the input carries 20 random bytes so that repeated
    /// rewards to the same address still get distinct ids.
    pub fn coinbase(to: &str, data: Option<&str>, value: u64) -> Self {
        let data = match data {
            Some(d) => d.to_string(),
            None => hex::encode(rand::random::<[u8; 20]>()),
        };
        Self::new(vec![TxInput::coinbase(data)], vec![TxOutput::new(value, to)])
    }

    /// Check if this is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// SHA256 over the encoded inputs and outputs (the id field is excluded)
    pub fn compute_id(&self) -> Hash256 {
        let mut buf = Vec::new();
        self.write_body(&mut buf);
        sha256(&buf)
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.inputs.len() as u64);
        for input in &self.inputs {
            input.write_to(buf);
        }
        write_varint(buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(buf);
        }
    }
}

impl Serializable for Transaction {
    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.id.as_bytes());
        self.write_body(buf);
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let id = read_hash(cursor)?;

        let input_count = read_count(cursor)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TxInput::read_from(cursor)?);
        }

        let output_count = read_count(cursor)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TxOutput::read_from(cursor)?);
        }

        Ok(Self {
            id,
            inputs,
            outputs,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::Rng;

    fn random_string(rng: &mut impl Rng) -> String {
        let len = rng.gen_range(0..24);
        (0..len).map(|_| rng.gen_range('a'..='z')).collect()
    }

    pub(crate) fn random_transaction(rng: &mut impl Rng) -> Transaction {
        let inputs = (0..rng.gen_range(0..4))
            .map(|_| {
                if rng.gen_bool(0.2) {
                    TxInput::coinbase(random_string(rng))
                } else {
                    TxInput::new(
                        Hash256::new(rand::random()),
                        rng.gen_range(0..8),
                        random_string(rng),
                    )
                }
            })
            .collect();
        let outputs = (0..rng.gen_range(0..4))
            .map(|_| TxOutput::new(rng.gen_range(0..u64::MAX), random_string(rng)))
            .collect();
        Transaction::new(inputs, outputs)
    }

    #[test]
    fn test_coinbase_input() {
        let input = TxInput::coinbase("reward");
        assert!(input.is_coinbase());
        assert_eq!(input.prev_tx_id, None);
        assert_eq!(input.output_index, -1);
    }

    #[test]
    fn test_coinbase_transaction() {
        let tx = Transaction::coinbase("alice", None, 10);
        assert!(tx.is_coinbase());
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs, vec![TxOutput::new(10, "alice")]);
    }

    #[test]
    fn test_coinbase_ids_are_unique_without_data() {
        let a = Transaction::coinbase("alice", None, 10);
        let b = Transaction::coinbase("alice", None, 10);
        assert_ne!(a.id, b.id);

        let c = Transaction::coinbase("alice", Some("fixed"), 10);
        let d = Transaction::coinbase("alice", Some("fixed"), 10);
        assert_eq!(c.id, d.id);
    }

    #[test]
    fn test_not_coinbase() {
        let spend = Transaction::new(
            vec![TxInput::new(Hash256::new([1; 32]), 0, "alice")],
            vec![TxOutput::new(5, "bob")],
        );
        assert!(!spend.is_coinbase());

        // Sentinel index alone is not enough
        let odd = Transaction::new(
            vec![TxInput::new(Hash256::new([1; 32]), -1, "alice")],
            vec![],
        );
        assert!(!odd.is_coinbase());

        // Two coinbase-shaped inputs
        let two = Transaction::new(
            vec![TxInput::coinbase("a"), TxInput::coinbase("b")],
            vec![],
        );
        assert!(!two.is_coinbase());
    }

    #[test]
    fn test_id_excludes_id_field_and_tracks_content() {
        let tx = Transaction::new(
            vec![TxInput::new(Hash256::new([1; 32]), 0, "alice")],
            vec![TxOutput::new(5, "bob")],
        );
        let mut altered = tx.clone();
        altered.id = Hash256::new([7; 32]);
        assert_eq!(altered.compute_id(), tx.id);

        altered.outputs[0].value = 6;
        assert_ne!(altered.compute_id(), tx.id);
    }

    #[test]
    fn test_lock_predicates() {
        let input = TxInput::new(Hash256::zero(), 0, "alice");
        assert!(input.unlocks("alice"));
        assert!(!input.unlocks("bob"));

        let output = TxOutput::new(1, "bob");
        assert!(output.is_locked_to("bob"));
        assert!(!output.is_locked_to("alice"));
    }

    #[test]
    fn test_transaction_serialization_randomized() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let tx = random_transaction(&mut rng);
            let bytes = tx.serialize();
            assert_eq!(Transaction::deserialize(&bytes).unwrap(), tx);
            assert_eq!(tx.serialize(), bytes);
        }
    }

    #[test]
    fn test_empty_transaction_serialization() {
        let tx = Transaction::new(vec![], vec![]);
        assert_eq!(Transaction::deserialize(&tx.serialize()).unwrap(), tx);
    }

    #[test]
    fn test_truncated_transaction() {
        let tx = Transaction::coinbase("alice", Some("data"), 10);
        let bytes = tx.serialize();
        for len in 0..bytes.len() {
            assert!(Transaction::deserialize(&bytes[..len]).is_err(), "len {}", len);
        }

        let mut extra = bytes.clone();
        extra.push(0);
        assert_eq!(
            Transaction::deserialize(&extra),
            Err(CodecError::TrailingBytes(1))
        );
    }
}
