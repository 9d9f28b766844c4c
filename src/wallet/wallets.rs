use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::{Keyring, Wallet};
use log::info;
use std::collections::HashMap;

pub const WALLET_TREE: &str = "wallets";

/// ( K -> address, V => Wallet ), mirrored into a sled tree on every change.
pub struct Wallets {
    tree: sled::Tree,
    wallets: HashMap<String, Wallet>,
}

impl Wallets {
    pub fn open(db: &sled::Db) -> Result<Wallets> {
        let tree = db
            .open_tree(WALLET_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open wallet tree: {e}")))?;

        let mut wallets = HashMap::new();
        for item in tree.iter() {
            let (k, v) = item.map_err(|e| {
                BlockchainError::Database(format!("Failed to iterate wallet tree: {e}"))
            })?;
            let address = String::from_utf8(k.to_vec()).map_err(|e| {
                BlockchainError::Serialization(format!("Invalid wallet address key: {e}"))
            })?;
            let wallet: Wallet = deserialize(v.as_ref())?;
            wallets.insert(address, wallet);
        }
        Ok(Wallets { tree, wallets })
    }

    pub fn create_wallet(&mut self) -> Result<String> {
        let wallet = Wallet::new()?;
        let address = wallet.get_address();
        self.tree.insert(address.as_bytes(), serialize(&wallet)?)?;
        self.tree.flush()?;
        info!("Created wallet {address}");
        self.wallets.insert(address.clone(), wallet);
        Ok(address)
    }

    pub fn get_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.wallets.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn get_wallet(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    /// Verifier that knows every key held here.
    pub fn keyring(&self) -> Keyring {
        let keyring = Keyring::new();
        for wallet in self.wallets.values() {
            keyring.register(wallet.get_public_key());
        }
        keyring
    }
}
