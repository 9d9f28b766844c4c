//! Test utilities for ledger testing

use crate::config::LedgerConfig;
use crate::core::{ChainManager, Transaction};
use crate::notifications::{AlertLog, AlertSink};
use crate::wallet::SignatureVerifier;
use std::sync::Arc;

/// Miner address used across unit tests
pub const MINER: &str = "miner";

/// Verifier that trusts every signature
pub struct AcceptAll;

impl SignatureVerifier for AcceptAll {
    fn verify(&self, _tx: &Transaction) -> bool {
        true
    }
}

/// Verifier that trusts nothing
pub struct RejectAll;

impl SignatureVerifier for RejectAll {
    fn verify(&self, _tx: &Transaction) -> bool {
        false
    }
}

/// Difficulty 1 keeps the nonce search to a handful of attempts
pub fn test_config() -> LedgerConfig {
    LedgerConfig::for_testing(1)
}

/// Manager past genesis, with `MINER` holding the genesis reward
pub fn manager_with_alerts(config: LedgerConfig, alerts: Arc<dyn AlertSink>) -> ChainManager {
    let mut manager = ChainManager::new(config, Arc::new(AcceptAll), alerts);
    manager
        .create_genesis(MINER)
        .expect("genesis on an empty manager");
    manager
}

pub fn active_manager() -> ChainManager {
    manager_with_alerts(test_config(), Arc::new(AlertLog::new(100)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_manager() {
        let manager = active_manager();
        assert_eq!(manager.height(), Some(0));
        assert_eq!(manager.get_balance(MINER), 50);
        assert!(manager.is_chain_valid());
    }
}
