use crate::core::Transaction;
use crate::wallet::wallet::{address_from_public_key, verify_signature};
use log::debug;
use std::collections::HashMap;
use std::sync::RwLock;

/// The one question the ledger asks of the signing side.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, tx: &Transaction) -> bool;
}

/// ( K -> address, V => public key )
///
/// Verifies a transaction against the key registered for its sender.
/// Unknown senders never verify.
#[derive(Default)]
pub struct Keyring {
    keys: RwLock<HashMap<String, Vec<u8>>>,
}

impl Keyring {
    pub fn new() -> Keyring {
        Keyring::default()
    }

    /// Register `public_key` under the address it derives to and return that address.
    pub fn register(&self, public_key: &[u8]) -> String {
        let address = address_from_public_key(public_key);
        match self.keys.write() {
            Ok(mut keys) => {
                keys.insert(address.clone(), public_key.to_vec());
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on keyring");
            }
        }
        address
    }

    pub fn contains(&self, address: &str) -> bool {
        match self.keys.read() {
            Ok(keys) => keys.contains_key(address),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.read().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignatureVerifier for Keyring {
    fn verify(&self, tx: &Transaction) -> bool {
        let keys = match self.keys.read() {
            Ok(keys) => keys,
            Err(_) => {
                log::error!("Failed to acquire read lock on keyring");
                return false;
            }
        };
        match keys.get(tx.get_sender()) {
            Some(public_key) => verify_signature(tx, public_key),
            None => {
                debug!("No public key registered for {}", tx.get_sender());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    #[test]
    fn test_registered_sender_verifies() {
        let keyring = Keyring::new();
        let wallet = Wallet::new().unwrap();
        let address = keyring.register(wallet.get_public_key());
        assert_eq!(address, wallet.get_address());
        assert!(keyring.contains(&address));

        let tx = wallet.create_transaction("Bob", 3).unwrap();
        assert!(keyring.verify(&tx));
    }

    #[test]
    fn test_unknown_sender_fails() {
        let keyring = Keyring::new();
        let wallet = Wallet::new().unwrap();
        let tx = wallet.create_transaction("Bob", 3).unwrap();
        assert!(!keyring.verify(&tx));
    }

    #[test]
    fn test_unsigned_transaction_fails() {
        let keyring = Keyring::new();
        let wallet = Wallet::new().unwrap();
        let address = keyring.register(wallet.get_public_key());
        let tx = Transaction::new(&address, "Bob", 3).unwrap();
        assert!(!keyring.verify(&tx));
    }
}
