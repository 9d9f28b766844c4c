//! Configuration management
//!
//! Difficulty, batch cap, nonce bound, rewards and the other numbers the
//! ledger runs on, loaded from defaults, an optional TOML file and the
//! environment.

pub mod settings;

pub use settings::{
    LedgerConfig, DEFAULT_ALERT_HISTORY, DEFAULT_BLOCK_REWARD, DEFAULT_CANCEL_CHECK_INTERVAL,
    DEFAULT_DIFFICULTY, DEFAULT_GENESIS_REWARD, DEFAULT_MAX_BLOCK_TRANSACTIONS,
    DEFAULT_MAX_FUTURE_DRIFT_MS, DEFAULT_MAX_NONCE,
};
