use crate::config::LedgerConfig;
use crate::core::Block;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const PROGRESS_LOG_INTERVAL: u64 = 1_000_000;

/// Shared stop flag for a nonce search. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How a nonce search ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    Found {
        nonce: u64,
        hash: String,
        attempts: u64,
    },
    Cancelled {
        attempts: u64,
    },
    Exhausted {
        attempts: u64,
    },
}

/// Hex-prefix proof of work: a hash is valid when it starts with
/// `difficulty` '0' characters.
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    difficulty: usize,
    max_nonce: u64,
    check_interval: u64,
}

impl ProofOfWork {
    pub fn new(difficulty: usize, max_nonce: u64, check_interval: u64) -> ProofOfWork {
        ProofOfWork {
            difficulty,
            max_nonce,
            check_interval: check_interval.max(1),
        }
    }

    pub fn from_config(config: &LedgerConfig) -> ProofOfWork {
        Self::new(
            config.difficulty,
            config.max_nonce,
            config.cancel_check_interval,
        )
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    /// Scan nonces from 0 upward until the hash meets the difficulty.
    ///
    /// On `Found` the block carries the winning nonce and hash. On any other
    /// outcome the block's nonce and hash are left at whatever was tried last
    /// and the block must not be committed.
    pub fn mine(&self, block: &mut Block, cancel: &CancelToken) -> MiningOutcome {
        let height = block.get_index();
        info!(
            "Mining block {} at difficulty {}",
            height, self.difficulty
        );
        let mut attempts: u64 = 0;
        for nonce in 0..self.max_nonce {
            if attempts % self.check_interval == 0 && cancel.is_cancelled() {
                info!("Mining of block {} cancelled after {} attempts", height, attempts);
                return MiningOutcome::Cancelled { attempts };
            }
            attempts += 1;
            if meets_difficulty(block.set_nonce(nonce), self.difficulty) {
                let hash = block.get_hash().to_string();
                info!(
                    "Mined block {} with nonce {} after {} attempts: {}",
                    height, nonce, attempts, hash
                );
                return MiningOutcome::Found {
                    nonce,
                    hash,
                    attempts,
                };
            }
            if attempts % PROGRESS_LOG_INTERVAL == 0 {
                debug!("Block {}: {} nonces tried", height, attempts);
            }
        }
        info!(
            "Nonce space exhausted for block {} after {} attempts",
            height, attempts
        );
        MiningOutcome::Exhausted { attempts }
    }

    /// Stored hash equals the recomputed hash and meets `difficulty`.
    pub fn verify(block: &Block, difficulty: usize) -> bool {
        block.has_valid_hash() && meets_difficulty(block.get_hash(), difficulty)
    }
}

pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}
