use crate::core::CancelToken;
use crate::error::{BlockchainError, Result};
use crate::network::Node;
use log::{error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Longest a stopped miner can sleep before noticing
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Continuous mining on a dedicated thread.
///
/// The loop mines whenever there is pending work and otherwise sleeps for
/// the configured poll interval. `stop` cancels the token the nonce search
/// polls, then joins the thread.
pub struct Miner {
    miner_address: String,
    cancel: CancelToken,
    blocks_mined: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl Miner {
    pub fn start(node: Node, miner_address: &str) -> Result<Miner> {
        let poll_interval = node.mining_poll_interval()?;
        let cancel = CancelToken::new();
        let blocks_mined = Arc::new(AtomicU64::new(0));

        let address = miner_address.to_string();
        let token = cancel.clone();
        let counter = Arc::clone(&blocks_mined);
        let handle = thread::Builder::new()
            .name(format!("miner-{}", node.get_addr()))
            .spawn(move || mine_continuously(node, &address, &token, &counter, poll_interval))
            .map_err(|e| BlockchainError::Io(format!("Failed to spawn miner thread: {e}")))?;

        info!("Miner {miner_address} started mining");
        Ok(Miner {
            miner_address: miner_address.to_string(),
            cancel,
            blocks_mined,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Miner {} thread panicked", self.miner_address);
            }
            info!("Miner {} stopped mining", self.miner_address);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::SeqCst)
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn mine_continuously(
    node: Node,
    miner_address: &str,
    cancel: &CancelToken,
    blocks_mined: &AtomicU64,
    poll_interval: Duration,
) {
    while !cancel.is_cancelled() {
        match node.mine_once(miner_address, cancel) {
            Ok(block) => {
                blocks_mined.fetch_add(1, Ordering::SeqCst);
                info!(
                    "Miner {miner_address} successfully mined block {}",
                    block.get_index()
                );
            }
            Err(BlockchainError::NoPendingWork) => sleep_unless_cancelled(cancel, poll_interval),
            Err(BlockchainError::MiningCancelled { .. }) => break,
            Err(e) if e.is_recoverable() => {
                warn!("Miner {miner_address} failed to mine block: {e}");
                sleep_unless_cancelled(cancel, poll_interval);
            }
            Err(e) => {
                error!("Miner {miner_address} giving up: {e}");
                break;
            }
        }
    }
}

fn sleep_unless_cancelled(cancel: &CancelToken, duration: Duration) {
    let deadline = Instant::now() + duration;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
