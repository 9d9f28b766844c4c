use crate::core::{Block, CancelToken, ChainManager, MiningOutcome, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::{Message, Transport};
use crate::storage::ChainSnapshot;
use log::{info, warn};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// A ledger shared between the query path, the miner thread and inbound
/// message handling.
///
/// Chain, UTXO set and mempool sit behind one lock, so a reader sees a block
/// either with all of its UTXO effects or not at all. Queries take the read
/// lock and may run side by side.
#[derive(Clone)]
pub struct Node {
    addr: String,
    ledger: Arc<RwLock<ChainManager>>,
    transport: Arc<dyn Transport>,
}

impl Node {
    pub fn new(addr: &str, manager: ChainManager, transport: Arc<dyn Transport>) -> Node {
        Node {
            addr: addr.to_string(),
            ledger: Arc::new(RwLock::new(manager)),
            transport,
        }
    }

    pub fn get_addr(&self) -> &str {
        self.addr.as_str()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ChainManager>> {
        self.ledger.read().map_err(|_| {
            BlockchainError::ConcurrencyViolation("ledger lock poisoned".to_string())
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ChainManager>> {
        self.ledger.write().map_err(|_| {
            BlockchainError::ConcurrencyViolation("ledger lock poisoned".to_string())
        })
    }

    /// Admit a locally created transaction and pass it on to peers.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<()> {
        self.write()?.submit_transaction(tx.clone())?;
        if let Err(e) = self.transport.broadcast_transaction(&tx) {
            warn!("Failed to broadcast transaction {}: {e}", tx.get_id());
        }
        Ok(())
    }

    /// Transaction from a peer: same admission as a local one, not re-broadcast.
    pub fn receive_transaction(&self, tx: Transaction) -> Result<()> {
        self.write()?.submit_transaction(tx)
    }

    pub fn receive_block(&self, block: Block) -> Result<()> {
        self.write()?.accept_block(block)
    }

    pub fn handle_message(&self, message: Message) -> Result<()> {
        match message {
            Message::Transaction {
                addr_from,
                transaction,
            } => {
                info!(
                    "{} received transaction {} from {addr_from}",
                    self.addr,
                    transaction.get_id()
                );
                self.receive_transaction(transaction)
            }
            Message::Block { addr_from, block } => {
                info!(
                    "{} received block {} from {addr_from}",
                    self.addr,
                    block.get_index()
                );
                self.receive_block(block)
            }
        }
    }

    pub fn handle_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.handle_message(Message::from_bytes(bytes)?)
    }

    /// Mine one block without holding the lock during the nonce search.
    ///
    /// The candidate is assembled under the read lock, searched with no lock
    /// held and committed under the write lock. If another block landed in
    /// between, the commit fails with `StaleCandidate` and nothing changes.
    pub fn mine_once(&self, miner_address: &str, cancel: &CancelToken) -> Result<Block> {
        let (mut candidate, pow) = {
            let ledger = self.read()?;
            (
                ledger.prepare_candidate(miner_address)?,
                ProofOfWork::from_config(ledger.get_config()),
            )
        };
        let height = candidate.get_index();

        match pow.mine(&mut candidate, cancel) {
            MiningOutcome::Found { .. } => {}
            MiningOutcome::Cancelled { attempts } => {
                return Err(BlockchainError::MiningCancelled { height, attempts })
            }
            MiningOutcome::Exhausted { attempts } => {
                return Err(BlockchainError::NonceExhausted { height, attempts })
            }
        }

        let block = self.write()?.commit_block(candidate)?;
        if let Err(e) = self.transport.broadcast_block(&block) {
            warn!("Failed to broadcast block {}: {e}", block.get_index());
        }
        Ok(block)
    }

    pub fn create_genesis(&self, miner_address: &str) -> Result<Block> {
        self.write()?.create_genesis(miner_address)
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        Ok(self.read()?.get_balance(address))
    }

    pub fn is_chain_valid(&self) -> Result<bool> {
        Ok(self.read()?.is_chain_valid())
    }

    pub fn detect_reorg(&self) -> Result<bool> {
        Ok(self.write()?.detect_reorg())
    }

    pub fn height(&self) -> Result<Option<u64>> {
        Ok(self.read()?.height())
    }

    pub fn tip_hash(&self) -> Result<Option<String>> {
        Ok(self.read()?.tip_hash().map(str::to_string))
    }

    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.read()?.pending().len())
    }

    pub fn snapshot(&self) -> Result<ChainSnapshot> {
        Ok(self.read()?.snapshot())
    }

    pub fn mining_poll_interval(&self) -> Result<Duration> {
        Ok(Duration::from_millis(
            self.read()?.get_config().mining_poll_interval_ms,
        ))
    }
}
