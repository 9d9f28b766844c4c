use crate::core::{MerkleProof, MerkleTree, Transaction};
use crate::error::Result;
use crate::utils::sha256_hex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `previous_hash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A block as stored and exchanged: the field set doubles as the snapshot record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    previous_hash: String,
    merkle_root: String,
    nonce: u64,
    timestamp: i64,
    hash: String,
    transactions: Vec<Transaction>,
}

impl Block {
    /// Unmined block with nonce 0. Merkle root and hash are fixed from the
    /// transactions as given.
    pub fn new(
        index: u64,
        previous_hash: String,
        transactions: Vec<Transaction>,
        timestamp: i64,
    ) -> Block {
        let mut block = Block {
            index,
            previous_hash,
            merkle_root: String::new(),
            nonce: 0,
            timestamp,
            hash: String::new(),
            transactions,
        };
        block.merkle_root = block.calculate_merkle_root();
        block.hash = block.calculate_hash();
        block
    }

    /// Height 0, zero previous hash, single reward transaction, no proof of work.
    pub fn genesis(reward: Transaction, timestamp: i64) -> Block {
        Block::new(0, GENESIS_PREVIOUS_HASH.to_string(), vec![reward], timestamp)
    }

    pub fn transaction_ids(&self) -> Vec<&str> {
        self.transactions.iter().map(|tx| tx.get_id()).collect()
    }

    pub fn calculate_merkle_root(&self) -> String {
        MerkleTree::from_ids(&self.transaction_ids()).root()
    }

    /// SHA-256 over the sorted-key compact JSON of every field except `hash`.
    pub fn calculate_hash(&self) -> String {
        sha256_hex(self.canonical_value().to_string().as_bytes())
    }

    fn canonical_value(&self) -> Value {
        let transactions: Vec<Value> = self
            .transactions
            .iter()
            .map(Transaction::to_canonical_value)
            .collect();
        json!({
            "index": self.index,
            "previous_hash": self.previous_hash,
            "transactions": transactions,
            "timestamp": self.timestamp,
            "nonce": self.nonce,
            "merkle_root": self.merkle_root,
        })
    }

    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    pub fn verify_merkle_root(&self) -> bool {
        self.merkle_root == self.calculate_merkle_root()
    }

    pub fn merkle_proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        MerkleTree::from_ids(&self.transaction_ids()).proof(transaction_index)
    }

    /// Set a candidate nonce and refresh the hash. Only the miner calls this.
    pub(crate) fn set_nonce(&mut self, nonce: u64) -> &str {
        self.nonce = nonce;
        self.hash = self.calculate_hash();
        self.hash.as_str()
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_merkle_root(&self) -> &str {
        self.merkle_root.as_str()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    #[cfg(test)]
    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, previous_hash: &str) {
        self.previous_hash = previous_hash.to_string();
    }
}
