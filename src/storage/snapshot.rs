// A snapshot is the chain as an ordered list of block records. The ledger
// only produces and consumes snapshots; where they live is up to the store.

use crate::core::Block;
use crate::error::{BlockchainError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const BLOCKS_TREE: &str = "blocks";
const TIP_BLOCK_HASH_KEY: &str = "tip_block_hash";
const BLOCK_COUNT_KEY: &str = "block_count";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub blocks: Vec<Block>,
}

impl ChainSnapshot {
    pub fn new(blocks: Vec<Block>) -> ChainSnapshot {
        ChainSnapshot { blocks }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<ChainSnapshot> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn tip_hash(&self) -> Option<&str> {
        self.blocks.last().map(|block| block.get_hash())
    }
}

pub trait SnapshotStore {
    fn save(&self, snapshot: &ChainSnapshot) -> Result<()>;
    /// `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<ChainSnapshot>>;
}

/// Blocks in a sled tree keyed by big-endian height, so iteration is chain order.
pub struct SledStore {
    db: sled::Db,
    blocks: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SledStore> {
        let db = sled::open(path.as_ref())
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        Ok(SledStore { db, blocks })
    }

    /// The underlying database, shared with the wallet store.
    pub fn get_db(&self) -> &sled::Db {
        &self.db
    }

    fn stored_count(&self) -> Result<u64> {
        match self.blocks.get(BLOCK_COUNT_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    BlockchainError::Database("Invalid block count record".to_string())
                })?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }
}

impl SnapshotStore for SledStore {
    fn save(&self, snapshot: &ChainSnapshot) -> Result<()> {
        let records = snapshot
            .blocks
            .iter()
            .map(|block| Ok((block.get_index().to_be_bytes(), serde_json::to_vec(block)?)))
            .collect::<Result<Vec<_>>>()?;
        let count = snapshot.blocks.len() as u64;
        let previous_count = self.stored_count()?;
        let tip_hash = snapshot.tip_hash().unwrap_or_default().to_string();

        // Whole chain, tip and count land together or not at all
        self.blocks
            .transaction(|tx_db| {
                for (key, value) in &records {
                    tx_db.insert(&key[..], value.as_slice())?;
                }
                for stale in count..previous_count {
                    tx_db.remove(&stale.to_be_bytes()[..])?;
                }
                tx_db.insert(TIP_BLOCK_HASH_KEY, tip_hash.as_bytes())?;
                tx_db.insert(BLOCK_COUNT_KEY, &count.to_be_bytes()[..])?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError| {
                BlockchainError::Database(format!("Failed to save chain: {e}"))
            })?;
        self.blocks.flush()?;
        info!("Saved {count} blocks to sled");
        Ok(())
    }

    fn load(&self) -> Result<Option<ChainSnapshot>> {
        let count = self.stored_count()?;
        if count == 0 {
            return Ok(None);
        }
        let mut blocks = Vec::with_capacity(count as usize);
        for height in 0..count {
            let bytes = self.blocks.get(height.to_be_bytes())?.ok_or_else(|| {
                BlockchainError::Database(format!("Block {height} missing from store"))
            })?;
            blocks.push(serde_json::from_slice::<Block>(bytes.as_ref())?);
        }
        Ok(Some(ChainSnapshot { blocks }))
    }
}

/// Pretty-printed JSON file, the format `export` writes.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> JsonFileStore {
        JsonFileStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn get_path(&self) -> &Path {
        self.path.as_path()
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&self, snapshot: &ChainSnapshot) -> Result<()> {
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, snapshot.to_json()?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<ChainSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(Some(ChainSnapshot::from_json(&raw)?))
    }
}
