//! Ledger state and persistence
//!
//! The UTXO set and the memory pool hold the mutable ledger state owned by
//! the chain manager. Snapshots are how the chain leaves the process, either
//! into sled or into a JSON file.

pub mod memory_pool;
pub mod snapshot;
pub mod utxo_set;

pub use memory_pool::{MemoryPool, ScreeningReport};
pub use snapshot::{ChainSnapshot, JsonFileStore, SledStore, SnapshotStore};
pub use utxo_set::{UTXOSet, Utxo};
