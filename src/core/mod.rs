//! Core ledger functionality
//!
//! Transactions, the Merkle commitment, blocks, proof-of-work and the chain
//! manager that ties them to the UTXO set and the memory pool.

pub mod block;
pub mod chain;
pub mod merkle;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH};
pub use chain::ChainManager;
pub use merkle::{merkle_root, MerkleProof, MerkleTree, ProofElement};
pub use proof_of_work::{meets_difficulty, CancelToken, MiningOutcome, ProofOfWork};
pub use transaction::{Transaction, COINBASE_SENDER, COINBASE_SIGNATURE, GENESIS_SIGNATURE};
