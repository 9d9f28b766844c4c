//! Wallet management and signature verification
//!
//! Key generation, address derivation and transaction signing live here.
//! The ledger itself only ever calls `SignatureVerifier::verify`.

pub mod keyring;
#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use keyring::{Keyring, SignatureVerifier};
pub use wallet::{
    address_from_public_key, convert_address, hash_pub_key, validate_address, verify_signature,
    Wallet, ADDRESS_CHECK_SUM_LEN,
};
pub use wallets::{Wallets, WALLET_TREE};
