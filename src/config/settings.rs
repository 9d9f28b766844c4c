use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

const DIFFICULTY_KEY: &str = "LEDGER_DIFFICULTY";
const DATA_DIR_KEY: &str = "LEDGER_DATA_DIR";
const BLOCK_REWARD_KEY: &str = "LEDGER_BLOCK_REWARD";
const MAX_BLOCK_TRANSACTIONS_KEY: &str = "LEDGER_MAX_BLOCK_TRANSACTIONS";

/// Leading hex zeros a block hash needs by default
pub const DEFAULT_DIFFICULTY: usize = 4;
/// Non-coinbase transactions taken from the mempool per block
pub const DEFAULT_MAX_BLOCK_TRANSACTIONS: usize = 10;
/// Exclusive upper bound of the nonce search
pub const DEFAULT_MAX_NONCE: u64 = 1 << 32;
/// Attempts between two polls of the cancellation token
pub const DEFAULT_CANCEL_CHECK_INTERVAL: u64 = 10_000;
pub const DEFAULT_GENESIS_REWARD: u64 = 50;
pub const DEFAULT_BLOCK_REWARD: u64 = 5;
pub const DEFAULT_MINING_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_ALERT_HISTORY: usize = 1_000;
/// How far past local time an accepted block may be stamped
pub const DEFAULT_MAX_FUTURE_DRIFT_MS: u64 = 2 * 60 * 60 * 1_000;
const DEFAULT_DATA_DIR: &str = "data";

/// Every tunable number the ledger uses.
///
/// Missing fields in a TOML file fall back to the defaults above, so a file
/// only has to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub difficulty: usize,
    pub max_block_transactions: usize,
    pub max_nonce: u64,
    pub cancel_check_interval: u64,
    pub genesis_reward: u64,
    pub block_reward: u64,
    /// Allow a coinbase-only block when nothing is pending
    pub mine_empty_blocks: bool,
    pub mining_poll_interval_ms: u64,
    pub alert_history: usize,
    pub max_future_drift_ms: u64,
    pub data_dir: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_block_transactions: DEFAULT_MAX_BLOCK_TRANSACTIONS,
            max_nonce: DEFAULT_MAX_NONCE,
            cancel_check_interval: DEFAULT_CANCEL_CHECK_INTERVAL,
            genesis_reward: DEFAULT_GENESIS_REWARD,
            block_reward: DEFAULT_BLOCK_REWARD,
            mine_empty_blocks: false,
            mining_poll_interval_ms: DEFAULT_MINING_POLL_INTERVAL_MS,
            alert_history: DEFAULT_ALERT_HISTORY,
            max_future_drift_ms: DEFAULT_MAX_FUTURE_DRIFT_MS,
            data_dir: DEFAULT_DATA_DIR.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Defaults plus environment overrides.
    pub fn new() -> Result<LedgerConfig> {
        let mut config = LedgerConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<LedgerConfig> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<LedgerConfig> {
        let config: LedgerConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var(DIFFICULTY_KEY) {
            self.difficulty = parse_env(DIFFICULTY_KEY, &value)?;
        }
        if let Ok(value) = env::var(BLOCK_REWARD_KEY) {
            self.block_reward = parse_env(BLOCK_REWARD_KEY, &value)?;
        }
        if let Ok(value) = env::var(MAX_BLOCK_TRANSACTIONS_KEY) {
            self.max_block_transactions = parse_env(MAX_BLOCK_TRANSACTIONS_KEY, &value)?;
        }
        if let Ok(dir) = env::var(DATA_DIR_KEY) {
            self.data_dir = dir;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        // A SHA-256 hex digest only has 64 characters
        if self.difficulty > 64 {
            return Err(BlockchainError::Config(format!(
                "difficulty {} exceeds the 64 hex characters of a hash",
                self.difficulty
            )));
        }
        if self.max_block_transactions == 0 {
            return Err(BlockchainError::Config(
                "max_block_transactions must be at least 1".to_string(),
            ));
        }
        if self.cancel_check_interval == 0 {
            return Err(BlockchainError::Config(
                "cancel_check_interval must be at least 1".to_string(),
            ));
        }
        if self.max_nonce == 0 {
            return Err(BlockchainError::Config(
                "max_nonce must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Configuration tuned for tests: trivial difficulty and a short poll.
    pub fn for_testing(difficulty: usize) -> LedgerConfig {
        LedgerConfig {
            difficulty,
            mining_poll_interval_ms: 20,
            ..LedgerConfig::default()
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| BlockchainError::Config(format!("{key} has invalid value '{value}'")))
}
