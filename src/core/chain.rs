// The chain manager owns everything that has to change together: the block
// list, the UTXO set that reflects those blocks and the pool of transactions
// waiting for one. A block only becomes visible together with its UTXO
// effects, so nothing outside can observe one without the other.

use crate::config::LedgerConfig;
use crate::core::{
    meets_difficulty, Block, CancelToken, MiningOutcome, ProofOfWork, Transaction,
    COINBASE_SIGNATURE, GENESIS_PREVIOUS_HASH,
};
use crate::error::{BlockchainError, IntegrityViolation, Result};
use crate::notifications::{AlertKind, AlertSink};
use crate::storage::{ChainSnapshot, MemoryPool, UTXOSet, Utxo};
use crate::utils::current_timestamp;
use crate::wallet::SignatureVerifier;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

pub struct ChainManager {
    config: LedgerConfig,
    chain: Vec<Block>,
    utxo_set: UTXOSet,
    mempool: MemoryPool,
    // ids of every transaction already in a block
    confirmed: HashSet<String>,
    verifier: Arc<dyn SignatureVerifier>,
    alerts: Arc<dyn AlertSink>,
    last_observed_tip: Option<String>,
}

impl ChainManager {
    /// A manager in the empty state. Nothing can be mined until `create_genesis`.
    pub fn new(
        config: LedgerConfig,
        verifier: Arc<dyn SignatureVerifier>,
        alerts: Arc<dyn AlertSink>,
    ) -> ChainManager {
        ChainManager {
            config,
            chain: Vec::new(),
            utxo_set: UTXOSet::new(),
            mempool: MemoryPool::new(),
            confirmed: HashSet::new(),
            verifier,
            alerts,
            last_observed_tip: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.chain.is_empty()
    }

    /// Block 0: one reward transaction, zero previous hash, no proof of work.
    pub fn create_genesis(&mut self, miner_address: &str) -> Result<Block> {
        if self.is_active() {
            return Err(BlockchainError::InvalidState(
                "genesis block already exists".to_string(),
            ));
        }
        let timestamp = current_timestamp()?;
        let reward = Transaction::new_genesis(miner_address, self.config.genesis_reward, timestamp)?;
        let genesis = Block::genesis(reward, timestamp);
        info!("Creating genesis block for address: {miner_address}");
        self.append_block(genesis.clone())?;
        Ok(genesis)
    }

    /// Admit a transaction to the mempool. Locally created and network
    /// received transactions both come through here.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<()> {
        if self.confirmed.contains(tx.get_id()) {
            return Err(BlockchainError::DuplicateTransaction(tx.get_id().to_string()));
        }
        let id = tx.get_id().to_string();
        match self
            .mempool
            .admit(tx, &self.utxo_set, self.verifier.as_ref())
        {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Rejected transaction {id}: {e}");
                Err(e)
            }
        }
    }

    /// Assemble an unmined block on top of the current tip: the reward first,
    /// then up to `max_block_transactions` screened pending transactions.
    pub fn prepare_candidate(&self, miner_address: &str) -> Result<Block> {
        self.ensure_consistent()?;
        let tip = self.chain.last().ok_or_else(|| {
            BlockchainError::InvalidState("no genesis block; create the chain first".to_string())
        })?;
        if self.mempool.is_empty() && !self.config.mine_empty_blocks {
            return Err(BlockchainError::NoPendingWork);
        }

        let report = self.mempool.screen(&self.utxo_set, self.alerts.as_ref());
        if !report.double_spends.is_empty() {
            debug!(
                "{} pending transactions held back as double-spends",
                report.double_spends.len()
            );
        }

        // strictly increasing, so consecutive rewards to one miner never share an id
        let timestamp = current_timestamp()?.max(tip.get_timestamp().saturating_add(1));
        let reward = Transaction::new_coinbase(miner_address, self.config.block_reward, timestamp)?;
        let mut transactions = Vec::with_capacity(self.config.max_block_transactions + 1);
        transactions.push(reward);
        transactions.extend(
            report
                .valid
                .into_iter()
                .take(self.config.max_block_transactions),
        );

        Ok(Block::new(
            tip.get_index() + 1,
            tip.get_hash().to_string(),
            transactions,
            timestamp,
        ))
    }

    /// Append a block this node mined from `prepare_candidate`.
    ///
    /// Fails with `StaleCandidate` if the tip moved while the nonce search ran.
    pub fn commit_block(&mut self, block: Block) -> Result<Block> {
        self.ensure_consistent()?;
        let height = block.get_index();
        match self.chain.last() {
            Some(tip) if tip.get_hash() == block.get_previous_hash() && tip.get_index() + 1 == height => {}
            Some(_) => return Err(BlockchainError::StaleCandidate { height }),
            None => {
                return Err(BlockchainError::InvalidState(
                    "no genesis block; create the chain first".to_string(),
                ))
            }
        }
        if !ProofOfWork::verify(&block, self.config.difficulty) {
            return Err(BlockchainError::InvalidProof { height });
        }

        self.append_block(block.clone())?;
        // Our own block moving the tip is not a reorganization
        self.last_observed_tip = Some(block.get_hash().to_string());
        info!(
            "Successfully mined block {}: {} ({} transactions)",
            height,
            block.get_hash(),
            block.get_transactions().len()
        );
        Ok(block)
    }

    /// Prepare, search and commit in one call.
    ///
    /// Any failure leaves chain, UTXO set and mempool exactly as they were.
    pub fn mine_block(&mut self, miner_address: &str, cancel: &CancelToken) -> Result<Block> {
        let mut candidate = self.prepare_candidate(miner_address)?;
        let height = candidate.get_index();
        match ProofOfWork::from_config(&self.config).mine(&mut candidate, cancel) {
            MiningOutcome::Found { .. } => self.commit_block(candidate),
            MiningOutcome::Cancelled { attempts } => {
                Err(BlockchainError::MiningCancelled { height, attempts })
            }
            MiningOutcome::Exhausted { attempts } => {
                Err(BlockchainError::NonceExhausted { height, attempts })
            }
        }
    }

    /// Validate and append a block produced elsewhere. No check is skipped
    /// for blocks that arrive over the network.
    pub fn accept_block(&mut self, block: Block) -> Result<()> {
        self.ensure_consistent()?;
        let height = block.get_index();
        let tip = self.chain.last().ok_or_else(|| {
            BlockchainError::InvalidState("no genesis block to build on".to_string())
        })?;
        if height != tip.get_index() + 1 {
            return Err(BlockchainError::InvalidBlock(format!(
                "expected height {}, got {height}",
                tip.get_index() + 1
            )));
        }
        if block.get_previous_hash() != tip.get_hash() {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {height} does not extend tip {}",
                tip.get_hash()
            )));
        }
        self.check_timestamp(&block, tip.get_timestamp())?;
        self.check_reward(&block)?;

        let mut seen = HashSet::new();
        for tx in block.get_transactions() {
            if !tx.has_valid_id() {
                return Err(BlockchainError::MalformedTransaction(format!(
                    "tx_id {} in block {height} does not match its contents",
                    tx.get_id()
                )));
            }
            if self.confirmed.contains(tx.get_id()) || !seen.insert(tx.get_id()) {
                return Err(BlockchainError::DuplicateTransaction(tx.get_id().to_string()));
            }
        }
        if !block.verify_merkle_root() {
            return Err(BlockchainError::InvalidBlock(format!(
                "merkle root of block {height} does not match its transactions"
            )));
        }
        if !ProofOfWork::verify(&block, self.config.difficulty) {
            return Err(BlockchainError::InvalidProof { height });
        }
        if let Some(tx) = block
            .get_transactions()
            .iter()
            .skip(1)
            .find(|tx| !self.verifier.verify(tx))
        {
            return Err(BlockchainError::InvalidSignature(tx.get_id().to_string()));
        }

        let hash = block.get_hash().to_string();
        self.append_block(block)?;
        info!("Accepted block {height}: {hash}");
        Ok(())
    }

    // Strictly after the parent and no further ahead of our clock than the
    // configured drift.
    fn check_timestamp(&self, block: &Block, parent_timestamp: i64) -> Result<()> {
        let height = block.get_index();
        let timestamp = block.get_timestamp();
        if timestamp <= parent_timestamp {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {height} timestamp {timestamp} is not after its parent's {parent_timestamp}"
            )));
        }
        let drift = i64::try_from(self.config.max_future_drift_ms).unwrap_or(i64::MAX);
        let latest = current_timestamp()?.saturating_add(drift);
        if timestamp > latest {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {height} timestamp {timestamp} is more than {}ms in the future",
                self.config.max_future_drift_ms
            )));
        }
        Ok(())
    }

    // Exactly one reward, first in the block, of the configured amount.
    fn check_reward(&self, block: &Block) -> Result<()> {
        let height = block.get_index();
        let transactions = block.get_transactions();
        let reward = transactions.first().ok_or_else(|| {
            BlockchainError::InvalidBlock(format!("block {height} has no transactions"))
        })?;
        if !reward.is_coinbase()
            || reward.get_signature() != Some(COINBASE_SIGNATURE)
            || reward.get_amount() != self.config.block_reward
        {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {height} must open with a {} reward",
                self.config.block_reward
            )));
        }
        if transactions.iter().skip(1).any(Transaction::is_coinbase) {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {height} carries more than one coinbase transaction"
            )));
        }
        Ok(())
    }

    // The one place a block joins the chain. Its transactions are applied in
    // order to a copy of the UTXO set; only when all of them succeed are the
    // block and the new set swapped in together. Pending transfers the new
    // balances can no longer fund are rejected with a double-spend alert.
    fn append_block(&mut self, block: Block) -> Result<()> {
        let mut working = self.utxo_set.clone();
        for tx in block.get_transactions() {
            working.apply(tx)?;
        }
        working.mark_block_applied();

        let ids: Vec<String> = block
            .get_transactions()
            .iter()
            .map(|tx| tx.get_id().to_string())
            .collect();
        self.chain.push(block);
        self.utxo_set = working;

        let pruned = self.mempool.prune(&ids);
        self.confirmed.extend(ids);
        let evicted = self.mempool.evict_unfundable(&self.utxo_set);
        for tx in &evicted {
            self.alerts.notify(
                AlertKind::DoubleSpend,
                &format!(
                    "Rejected pending transaction {}: {} can no longer cover {} after block {}",
                    tx.get_id(),
                    tx.get_sender(),
                    tx.get_amount(),
                    self.chain.len() - 1
                ),
            );
        }
        debug!(
            "Mempool: {} confirmed, {} evicted, {} pending",
            pruned,
            evicted.len(),
            self.mempool.len()
        );
        Ok(())
    }

    /// Walk the chain from block 1 and stop at the first block that fails.
    pub fn validate_chain(&self) -> Result<()> {
        match validate_blocks(&self.chain, self.config.difficulty) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("{e}");
                self.alerts.notify(AlertKind::ChainInvalid, &e.to_string());
                Err(e)
            }
        }
    }

    pub fn is_chain_valid(&self) -> bool {
        self.validate_chain().is_ok()
    }

    /// Same walk as `validate_chain`, over a chain this node does not own.
    pub fn validate_snapshot(snapshot: &ChainSnapshot, difficulty: usize) -> Result<()> {
        validate_blocks(&snapshot.blocks, difficulty)
    }

    /// True when the tip differs from the one seen at the previous call.
    /// The first call only records the tip.
    pub fn detect_reorg(&mut self) -> bool {
        let current = self.tip_hash().map(str::to_string);
        let changed = match (&self.last_observed_tip, &current) {
            (Some(observed), Some(tip)) => observed != tip,
            _ => false,
        };
        if changed {
            let detail = format!(
                "chain tip changed from {} to {}",
                self.last_observed_tip.as_deref().unwrap_or_default(),
                current.as_deref().unwrap_or_default()
            );
            warn!("{detail}");
            self.alerts.notify(AlertKind::Reorg, &detail);
        }
        self.last_observed_tip = current;
        changed
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot::new(self.chain.clone())
    }

    /// Rebuild a manager from a snapshot. The genesis record is checked on
    /// its own; every later block goes through `accept_block`.
    pub fn restore(
        config: LedgerConfig,
        snapshot: ChainSnapshot,
        verifier: Arc<dyn SignatureVerifier>,
        alerts: Arc<dyn AlertSink>,
    ) -> Result<ChainManager> {
        let mut manager = ChainManager::new(config, verifier, alerts);
        let mut blocks = snapshot.blocks.into_iter();
        let genesis = match blocks.next() {
            Some(genesis) => genesis,
            None => return Ok(manager),
        };
        check_genesis(&genesis)?;
        manager.append_block(genesis)?;
        for block in blocks {
            manager.accept_block(block)?;
        }
        info!("Restored chain with {} blocks", manager.len());
        Ok(manager)
    }

    fn ensure_consistent(&self) -> Result<()> {
        if cfg!(debug_assertions) && self.utxo_set.applied_blocks() != self.chain.len() as u64 {
            return Err(BlockchainError::ConcurrencyViolation(format!(
                "UTXO set reflects {} blocks but the chain has {}",
                self.utxo_set.applied_blocks(),
                self.chain.len()
            )));
        }
        Ok(())
    }

    pub fn find_transaction(&self, tx_id: &str) -> Option<(u64, &Transaction)> {
        self.chain.iter().find_map(|block| {
            block
                .get_transactions()
                .iter()
                .find(|tx| tx.get_id() == tx_id)
                .map(|tx| (block.get_index(), tx))
        })
    }

    pub fn get_block(&self, height: u64) -> Option<&Block> {
        usize::try_from(height)
            .ok()
            .and_then(|index| self.chain.get(index))
    }

    pub fn get_blocks(&self) -> &[Block] {
        self.chain.as_slice()
    }

    pub fn tip(&self) -> Option<&Block> {
        self.chain.last()
    }

    pub fn tip_hash(&self) -> Option<&str> {
        self.chain.last().map(|block| block.get_hash())
    }

    /// Index of the tip, `None` before genesis.
    pub fn height(&self) -> Option<u64> {
        self.chain.last().map(|block| block.get_index())
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn pending(&self) -> &[Transaction] {
        self.mempool.get_all()
    }

    pub fn get_balance(&self, address: &str) -> u64 {
        self.utxo_set.get_balance(address)
    }

    pub fn utxos_of(&self, address: &str) -> &[Utxo] {
        self.utxo_set.get_utxos(address)
    }

    pub fn get_utxo_set(&self) -> &UTXOSet {
        &self.utxo_set
    }

    pub fn get_config(&self) -> &LedgerConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn chain_mut(&mut self) -> &mut Vec<Block> {
        &mut self.chain
    }
}

fn check_genesis(genesis: &Block) -> Result<()> {
    if genesis.get_index() != 0 || genesis.get_previous_hash() != GENESIS_PREVIOUS_HASH {
        return Err(BlockchainError::ChainIntegrity {
            height: 0,
            violation: IntegrityViolation::BrokenLink,
        });
    }
    if !genesis.has_valid_hash() {
        return Err(BlockchainError::ChainIntegrity {
            height: 0,
            violation: IntegrityViolation::HashMismatch,
        });
    }
    if !genesis.verify_merkle_root() {
        return Err(BlockchainError::ChainIntegrity {
            height: 0,
            violation: IntegrityViolation::MerkleMismatch,
        });
    }
    match genesis.get_transactions() {
        [reward] if reward.is_coinbase() && reward.has_valid_id() => Ok(()),
        _ => Err(BlockchainError::InvalidBlock(
            "genesis must hold exactly one reward transaction".to_string(),
        )),
    }
}

// Genesis carries no proof of work and has nothing to link to, so the walk
// starts at block 1.
fn validate_blocks(blocks: &[Block], difficulty: usize) -> Result<()> {
    for pair in blocks.windows(2) {
        let (previous, block) = (&pair[0], &pair[1]);
        let violation = if !block.has_valid_hash() {
            Some(IntegrityViolation::HashMismatch)
        } else if block.get_previous_hash() != previous.get_hash() {
            Some(IntegrityViolation::BrokenLink)
        } else if !block.verify_merkle_root() {
            Some(IntegrityViolation::MerkleMismatch)
        } else if !meets_difficulty(block.get_hash(), difficulty) {
            Some(IntegrityViolation::InsufficientWork)
        } else {
            None
        };
        if let Some(violation) = violation {
            return Err(BlockchainError::ChainIntegrity {
                height: block.get_index(),
                violation,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::AlertLog;
    use crate::testnet::test_utils::{
        active_manager, manager_with_alerts, test_config, AcceptAll, MINER,
    };

    #[test]
    fn test_genesis_only_from_empty() {
        let mut manager = ChainManager::new(test_config(), Arc::new(AcceptAll), Arc::new(AlertLog::new(10)));
        assert!(!manager.is_active());
        let genesis = manager.create_genesis(MINER).unwrap();
        assert_eq!(genesis.get_index(), 0);
        assert_eq!(genesis.get_previous_hash(), GENESIS_PREVIOUS_HASH);
        assert_eq!(manager.get_balance(MINER), 50);

        let err = manager.create_genesis(MINER).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidState(_)));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_mining_requires_genesis() {
        let mut manager = ChainManager::new(test_config(), Arc::new(AcceptAll), Arc::new(AlertLog::new(10)));
        let err = manager.mine_block(MINER, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidState(_)));
    }

    #[test]
    fn test_mining_with_empty_mempool_is_no_pending_work() {
        let mut manager = active_manager();
        let err = manager.mine_block(MINER, &CancelToken::new()).unwrap_err();
        assert_eq!(err, BlockchainError::NoPendingWork);
        assert!(err.is_recoverable());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_mine_block_applies_transactions_in_order() {
        let mut manager = active_manager();
        let tx = Transaction::new(MINER, "Bob", 20).unwrap();
        manager.submit_transaction(tx.clone()).unwrap();

        let block = manager.mine_block(MINER, &CancelToken::new()).unwrap();
        assert_eq!(block.get_index(), 1);
        assert_eq!(block.get_transactions().len(), 2);
        assert!(block.get_transactions()[0].is_coinbase());
        assert!(block.get_hash().starts_with('0'));

        // 50 - 20 + 5 reward
        assert_eq!(manager.get_balance(MINER), 35);
        assert_eq!(manager.get_balance("Bob"), 20);
        assert!(manager.pending().is_empty());
        assert_eq!(manager.find_transaction(tx.get_id()).map(|(h, _)| h), Some(1));
        assert!(manager.is_chain_valid());
    }

    #[test]
    fn test_batch_cap_leaves_rest_pending() {
        let mut config = test_config();
        config.max_block_transactions = 2;
        let mut manager = manager_with_alerts(config, Arc::new(AlertLog::new(10)));
        for i in 0..3 {
            let tx = Transaction::with_timestamp(MINER, "Bob", 1, i).unwrap();
            manager.submit_transaction(tx).unwrap();
        }
        let block = manager.mine_block(MINER, &CancelToken::new()).unwrap();
        assert_eq!(block.get_transactions().len(), 3);
        assert_eq!(manager.pending().len(), 1);
    }

    #[test]
    fn test_confirmed_transaction_cannot_be_resubmitted() {
        let mut manager = active_manager();
        let tx = Transaction::new(MINER, "Bob", 1).unwrap();
        manager.submit_transaction(tx.clone()).unwrap();
        manager.mine_block(MINER, &CancelToken::new()).unwrap();
        let err = manager.submit_transaction(tx).unwrap_err();
        assert!(matches!(err, BlockchainError::DuplicateTransaction(_)));
    }

    #[test]
    fn test_cancelled_mining_leaves_state_unchanged() {
        let mut config = test_config();
        config.difficulty = 64;
        let mut manager = manager_with_alerts(config, Arc::new(AlertLog::new(10)));
        manager
            .submit_transaction(Transaction::new(MINER, "Bob", 1).unwrap())
            .unwrap();
        let token = CancelToken::new();
        token.cancel();

        let err = manager.mine_block(MINER, &token).unwrap_err();
        assert!(matches!(err, BlockchainError::MiningCancelled { height: 1, .. }));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.pending().len(), 1);
        assert_eq!(manager.get_balance(MINER), 50);
    }

    #[test]
    fn test_exhausted_nonce_space_is_recoverable() {
        let mut config = test_config();
        config.difficulty = 64;
        config.max_nonce = 100;
        let mut manager = manager_with_alerts(config, Arc::new(AlertLog::new(10)));
        manager
            .submit_transaction(Transaction::new(MINER, "Bob", 1).unwrap())
            .unwrap();
        let err = manager.mine_block(MINER, &CancelToken::new()).unwrap_err();
        assert_eq!(err, BlockchainError::NonceExhausted { height: 1, attempts: 100 });
        assert!(err.is_recoverable());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_stale_candidate_is_rejected() {
        let mut manager = active_manager();
        manager
            .submit_transaction(Transaction::new(MINER, "Bob", 1).unwrap())
            .unwrap();
        let mut stale = manager.prepare_candidate(MINER).unwrap();
        manager.mine_block(MINER, &CancelToken::new()).unwrap();

        ProofOfWork::from_config(manager.get_config()).mine(&mut stale, &CancelToken::new());
        let err = manager.commit_block(stale).unwrap_err();
        assert_eq!(err, BlockchainError::StaleCandidate { height: 1 });
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_tampered_block_reports_its_height() {
        let alerts = Arc::new(AlertLog::new(10));
        let mut manager = manager_with_alerts(test_config(), alerts.clone());
        for amount in [3, 4] {
            manager
                .submit_transaction(Transaction::new(MINER, "Bob", amount).unwrap())
                .unwrap();
            manager.mine_block(MINER, &CancelToken::new()).unwrap();
        }
        assert!(manager.is_chain_valid());

        manager.chain_mut()[1].transactions_mut()[1].tamper_amount(40);
        assert!(!manager.is_chain_valid());
        assert_eq!(
            manager.validate_chain().unwrap_err(),
            BlockchainError::ChainIntegrity {
                height: 1,
                violation: IntegrityViolation::HashMismatch,
            }
        );
        assert!(alerts.count(AlertKind::ChainInvalid) >= 1);
    }

    #[test]
    fn test_broken_link_is_detected() {
        let mut manager = active_manager();
        manager
            .submit_transaction(Transaction::new(MINER, "Bob", 1).unwrap())
            .unwrap();
        manager.mine_block(MINER, &CancelToken::new()).unwrap();

        let mut blocks = manager.snapshot().blocks;
        blocks[1].set_previous_hash(&"f".repeat(64));
        let pow = ProofOfWork::new(1, 1 << 32, 10_000);
        pow.mine(&mut blocks[1], &CancelToken::new());

        let err = ChainManager::validate_snapshot(&ChainSnapshot::new(blocks), 1).unwrap_err();
        assert_eq!(
            err,
            BlockchainError::ChainIntegrity {
                height: 1,
                violation: IntegrityViolation::BrokenLink,
            }
        );
    }

    #[test]
    fn test_detect_reorg() {
        let alerts = Arc::new(AlertLog::new(10));
        let mut manager = manager_with_alerts(test_config(), alerts.clone());
        assert!(!manager.detect_reorg());
        assert!(!manager.detect_reorg());

        // A block from elsewhere moves the tip
        let mut other = active_manager_from(&manager);
        other
            .submit_transaction(Transaction::new(MINER, "Bob", 1).unwrap())
            .unwrap();
        let block = other.mine_block(MINER, &CancelToken::new()).unwrap();
        manager.accept_block(block).unwrap();

        assert!(manager.detect_reorg());
        assert!(!manager.detect_reorg());
        assert_eq!(alerts.count(AlertKind::Reorg), 1);
    }

    #[test]
    fn test_own_mining_is_not_a_reorg() {
        let mut manager = active_manager();
        manager.detect_reorg();
        manager
            .submit_transaction(Transaction::new(MINER, "Bob", 1).unwrap())
            .unwrap();
        manager.mine_block(MINER, &CancelToken::new()).unwrap();
        assert!(!manager.detect_reorg());
    }

    #[test]
    fn test_accept_block_rejects_wrong_reward() {
        let mut manager = active_manager();
        let tip = manager.tip().unwrap().clone();
        let greedy = Transaction::new_coinbase(MINER, 500, tip.get_timestamp() + 1).unwrap();
        let mut block = Block::new(1, tip.get_hash().to_string(), vec![greedy], tip.get_timestamp() + 1);
        ProofOfWork::from_config(manager.get_config()).mine(&mut block, &CancelToken::new());

        let err = manager.accept_block(block).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidBlock(_)));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_accept_block_rejects_missing_work() {
        let mut config = test_config();
        config.difficulty = 3;
        let mut manager = manager_with_alerts(config, Arc::new(AlertLog::new(10)));
        let tip = manager.tip().unwrap().clone();
        let reward = Transaction::new_coinbase(MINER, 5, tip.get_timestamp() + 1).unwrap();
        let mut block = Block::new(1, tip.get_hash().to_string(), vec![reward], tip.get_timestamp() + 1);
        // find a nonce whose hash fails the difficulty
        let mut nonce = 0;
        while meets_difficulty(block.set_nonce(nonce), 3) {
            nonce += 1;
        }
        let err = manager.accept_block(block).unwrap_err();
        assert_eq!(err, BlockchainError::InvalidProof { height: 1 });
    }

    #[test]
    fn test_snapshot_restore_rebuilds_state() {
        let mut manager = active_manager();
        manager
            .submit_transaction(Transaction::new(MINER, "Bob", 7).unwrap())
            .unwrap();
        manager.mine_block(MINER, &CancelToken::new()).unwrap();

        let restored = ChainManager::restore(
            test_config(),
            manager.snapshot(),
            Arc::new(AcceptAll),
            Arc::new(AlertLog::new(10)),
        )
        .unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.tip_hash(), manager.tip_hash());
        assert_eq!(restored.get_balance("Bob"), 7);
        assert_eq!(restored.get_balance(MINER), manager.get_balance(MINER));
        assert!(restored.is_chain_valid());
    }

    #[test]
    fn test_restore_rejects_forged_genesis() {
        let manager = active_manager();
        let mut blocks = manager.snapshot().blocks;
        blocks[0].transactions_mut()[0].tamper_amount(1_000_000);
        let err = ChainManager::restore(
            test_config(),
            ChainSnapshot::new(blocks),
            Arc::new(AcceptAll),
            Arc::new(AlertLog::new(10)),
        )
        .err()
        .unwrap();
        assert_eq!(err.height(), Some(0));
    }

    fn mined_peer_block(manager: &ChainManager, timestamp: i64) -> Block {
        let tip = manager.tip().unwrap();
        let reward = Transaction::new_coinbase("peer", 5, timestamp).unwrap();
        let mut block = Block::new(1, tip.get_hash().to_string(), vec![reward], timestamp);
        ProofOfWork::from_config(manager.get_config()).mine(&mut block, &CancelToken::new());
        block
    }

    #[test]
    fn test_accept_block_rejects_far_future_timestamp() {
        let mut manager = active_manager();
        let block = mined_peer_block(&manager, i64::MAX);

        let err = manager.accept_block(block).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidBlock(_)));
        assert_eq!(manager.len(), 1);

        manager
            .submit_transaction(Transaction::new(MINER, "Bob", 1).unwrap())
            .unwrap();
        let block = manager.mine_block(MINER, &CancelToken::new()).unwrap();
        assert_eq!(block.get_index(), 1);
    }

    #[test]
    fn test_accept_block_rejects_timestamp_not_after_parent() {
        let mut manager = active_manager();
        let parent_timestamp = manager.tip().unwrap().get_timestamp();
        let block = mined_peer_block(&manager, parent_timestamp);

        let err = manager.accept_block(block).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidBlock(_)));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_candidate_on_latest_possible_timestamp() {
        let mut config = test_config();
        config.max_future_drift_ms = u64::MAX;
        let mut manager = manager_with_alerts(config, Arc::new(AlertLog::new(10)));
        let block = mined_peer_block(&manager, i64::MAX);
        manager.accept_block(block).unwrap();

        manager
            .submit_transaction(Transaction::new(MINER, "Bob", 1).unwrap())
            .unwrap();
        let candidate = manager.prepare_candidate(MINER).unwrap();
        assert_eq!(candidate.get_timestamp(), i64::MAX);
    }

    #[test]
    fn test_unfundable_pending_transfer_is_rejected_with_alert() {
        let alerts = Arc::new(AlertLog::new(10));
        let mut manager = manager_with_alerts(test_config(), alerts.clone());
        let first = Transaction::with_timestamp(MINER, "Bob", 30, 1).unwrap();
        let second = Transaction::with_timestamp(MINER, "Carol", 30, 2).unwrap();
        manager.submit_transaction(first).unwrap();
        manager.submit_transaction(second.clone()).unwrap();

        manager.mine_block(MINER, &CancelToken::new()).unwrap();

        // 50 - 30 + 5 reward cannot cover the second transfer
        assert_eq!(manager.get_balance(MINER), 25);
        assert!(manager.pending().is_empty());
        // one alert from screening, one from the rejection
        assert_eq!(alerts.count(AlertKind::DoubleSpend), 2);
        let history = alerts.history();
        assert!(history
            .last()
            .unwrap()
            .detail
            .contains(second.get_id()));
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_desynchronized_utxo_set_is_a_concurrency_violation() {
        let mut manager = active_manager();
        manager
            .submit_transaction(Transaction::new(MINER, "Bob", 1).unwrap())
            .unwrap();
        manager.utxo_set.mark_block_applied();

        let err = manager.mine_block(MINER, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, BlockchainError::ConcurrencyViolation(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Concurrency);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.pending().len(), 1);
    }

    fn active_manager_from(source: &ChainManager) -> ChainManager {
        ChainManager::restore(
            source.get_config().clone(),
            source.snapshot(),
            Arc::new(AcceptAll),
            Arc::new(AlertLog::new(10)),
        )
        .unwrap()
    }
}
