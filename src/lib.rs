//! # Crypto Ledger - My Minimal Proof-of-Work Ledger
//!
//! A small cryptocurrency ledger I built in Rust to get the core ideas right.
//! When I come back to this code, here's what I need to remember:
//!
//! ## What I Built
//! - **Transactions**: single transfers whose id is a hash of their own fields
//! - **Merkle Commitment**: every block commits to its transaction ids, with proofs
//! - **UTXO Set**: balances are derived from unspent outputs, applied atomically per block
//! - **Mempool**: pending transfers, screened for double-spends before mining
//! - **Proof of Work**: cancellable nonce search with a bounded nonce space
//! - **Chain Manager**: genesis, mining, external blocks, validation, snapshots
//! - **Node + Miner**: one lock around the ledger, mining without holding it
//!
//! ## How I Organized My Code
//! - `core/`: blocks, transactions, merkle tree, proof of work, the chain manager
//! - `storage/`: UTXO set, memory pool, snapshot persistence (sled and JSON)
//! - `wallet/`: ECDSA P-256 keys, addresses, signing, the verifier keyring
//! - `network/`: wire messages, transports, the shared node, the miner thread
//! - `notifications/`: double-spend, invalid-chain and reorg alerts
//! - `config/`: settings from defaults, TOML and the environment
//! - `utils/`: hashing, encoding and timestamp helpers
//! - `cli/`: command-line interface
//!
//! ## Key Design Decisions I Made
//! - A block joins the chain only if all of its UTXO effects apply
//! - Signature checks sit behind the `SignatureVerifier` trait
//! - Alerts are fire-and-forget so they never block a ledger mutation
//!
//! ## When I Need to Understand Something
//! 1. Start with `main.rs` to see the CLI commands
//! 2. Look at `core/chain.rs` for the main ledger logic
//! 3. Check `storage/utxo_set.rs` for how value moves
//! 4. Review `network/node.rs` for the locking story

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod notifications;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::LedgerConfig;
pub use core::{
    merkle_root, meets_difficulty, Block, CancelToken, ChainManager, MerkleProof, MerkleTree,
    MiningOutcome, ProofOfWork, Transaction, COINBASE_SENDER, GENESIS_PREVIOUS_HASH,
};
pub use error::{BlockchainError, ErrorKind, IntegrityViolation, Result};
pub use network::{ChannelTransport, Message, Miner, Node, NullTransport, Transport};
pub use notifications::{Alert, AlertKind, AlertLog, AlertSink, AlertSystem, NullAlertSink};
pub use storage::{
    ChainSnapshot, JsonFileStore, MemoryPool, SledStore, SnapshotStore, UTXOSet, Utxo,
};
pub use utils::{current_timestamp, sha256_digest, sha256_hex};
pub use wallet::{
    convert_address, hash_pub_key, validate_address, Keyring, SignatureVerifier, Wallet, Wallets,
};
