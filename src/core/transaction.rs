// A transaction here is a single transfer: sender pays receiver `amount`.
// Its id is a content hash over the four value fields, so the id can be
// recomputed from the record at any time and any edit to those fields shows.

use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, sha256_hex};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Sender used by value-creating transactions
pub const COINBASE_SENDER: &str = "0";
/// Signature placeholder carried by the genesis reward
pub const GENESIS_SIGNATURE: &str = "GENESIS";
/// Signature placeholder carried by block rewards
pub const COINBASE_SIGNATURE: &str = "COINBASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    sender: String,
    receiver: String,
    amount: u64,
    timestamp: i64,
    tx_id: String,
    signature: Option<String>,
}

impl Transaction {
    /// Unsigned transfer stamped with the current time.
    pub fn new(sender: &str, receiver: &str, amount: u64) -> Result<Transaction> {
        Self::with_timestamp(sender, receiver, amount, current_timestamp()?)
    }

    pub fn with_timestamp(
        sender: &str,
        receiver: &str,
        amount: u64,
        timestamp: i64,
    ) -> Result<Transaction> {
        if sender.is_empty() || receiver.is_empty() {
            return Err(BlockchainError::MalformedTransaction(
                "sender and receiver must be non-empty".to_string(),
            ));
        }
        Ok(Transaction {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            timestamp,
            tx_id: Self::compute_id(sender, receiver, amount, timestamp),
            signature: None,
        })
    }

    /// Reward paid to `miner` by a mined block.
    pub fn new_coinbase(miner: &str, reward: u64, timestamp: i64) -> Result<Transaction> {
        let mut tx = Self::with_timestamp(COINBASE_SENDER, miner, reward, timestamp)?;
        tx.signature = Some(COINBASE_SIGNATURE.to_string());
        Ok(tx)
    }

    /// Reward paid by the genesis block.
    pub fn new_genesis(miner: &str, reward: u64, timestamp: i64) -> Result<Transaction> {
        let mut tx = Self::with_timestamp(COINBASE_SENDER, miner, reward, timestamp)?;
        tx.signature = Some(GENESIS_SIGNATURE.to_string());
        Ok(tx)
    }

    /// SHA-256 over `sender ‖ receiver ‖ amount ‖ timestamp` in that fixed order.
    pub fn compute_id(sender: &str, receiver: &str, amount: u64, timestamp: i64) -> String {
        let contents = format!("{sender}{receiver}{amount}{timestamp}");
        sha256_hex(contents.as_bytes())
    }

    pub fn recompute_id(&self) -> String {
        Self::compute_id(&self.sender, &self.receiver, self.amount, self.timestamp)
    }

    /// Stored id still matches the value fields.
    pub fn has_valid_id(&self) -> bool {
        self.tx_id == self.recompute_id()
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }

    /// Bytes the wallet signs: sorted-key JSON of everything but the signature.
    pub fn signing_payload(&self) -> Vec<u8> {
        json!({
            "sender": self.sender,
            "receiver": self.receiver,
            "amount": self.amount,
            "timestamp": self.timestamp,
            "tx_id": self.tx_id,
        })
        .to_string()
        .into_bytes()
    }

    /// Full record as a sorted-key JSON value; feeds the block hash.
    pub fn to_canonical_value(&self) -> Value {
        json!({
            "sender": self.sender,
            "receiver": self.receiver,
            "amount": self.amount,
            "timestamp": self.timestamp,
            "tx_id": self.tx_id,
            "signature": self.signature,
        })
    }

    pub fn set_signature(&mut self, signature: String) {
        self.signature = Some(signature);
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_receiver(&self) -> &str {
        self.receiver.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_id(&self) -> &str {
        self.tx_id.as_str()
    }

    pub fn get_signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn tamper_amount(&mut self, amount: u64) {
        self.amount = amount;
    }
}
