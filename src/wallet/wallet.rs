use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::{
    base58_decode, base58_encode, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, ripemd160_digest, sha256_digest,
};
use data_encoding::HEXLOWER;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use serde::{Deserialize, Serialize};

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;

/// An ECDSA P-256 key pair and the address derived from it.
#[derive(Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        Self::from_pkcs8(new_key_pair()?)
    }

    pub fn from_pkcs8(pkcs8: Vec<u8>) -> Result<Wallet> {
        let rng = SystemRandom::new();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|e| {
                    BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
                })?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_address(&self) -> String {
        address_from_public_key(self.public_key.as_slice())
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }

    /// Sign the canonical payload and store the hex signature on `tx`.
    pub fn sign(&self, tx: &mut Transaction) -> Result<()> {
        if tx.get_sender() != self.get_address() {
            return Err(BlockchainError::Crypto(format!(
                "Wallet {} cannot sign for sender {}",
                self.get_address(),
                tx.get_sender()
            )));
        }
        let signature = ecdsa_p256_sha256_sign_digest(self.pkcs8.as_slice(), &tx.signing_payload())?;
        tx.set_signature(HEXLOWER.encode(signature.as_slice()));
        Ok(())
    }

    /// Build, stamp and sign a transfer from this wallet.
    pub fn create_transaction(&self, receiver: &str, amount: u64) -> Result<Transaction> {
        let mut tx = Transaction::new(&self.get_address(), receiver, amount)?;
        self.sign(&mut tx)?;
        Ok(tx)
    }
}

/// Check the hex signature on `tx` against `public_key`.
pub fn verify_signature(tx: &Transaction, public_key: &[u8]) -> bool {
    let signature = match tx.get_signature() {
        Some(signature) => signature,
        None => return false,
    };
    let signature = match HEXLOWER.decode(signature.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    ecdsa_p256_sha256_sign_verify(public_key, signature.as_slice(), &tx.signing_payload())
}

pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = sha256_digest(pub_key);
    ripemd160_digest(pub_key_sha256.as_slice())
}

pub fn address_from_public_key(public_key: &[u8]) -> String {
    convert_address(hash_pub_key(public_key).as_slice())
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = sha256_digest(payload);
    let second_sha = sha256_digest(first_sha.as_slice());
    second_sha[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

pub fn validate_address(address: &str) -> bool {
    let payload = match base58_decode(address) {
        Ok(payload) => payload,
        Err(_) => return false,
    };
    if payload.len() < ADDRESS_CHECK_SUM_LEN + 1 {
        return false;
    }
    let (body, actual_checksum) = payload.split_at(payload.len() - ADDRESS_CHECK_SUM_LEN);
    checksum(body).as_slice() == actual_checksum
}

/// version + pub_key_hash + checksum, base58 encoded
pub fn convert_address(pub_hash_key: &[u8]) -> String {
    let mut payload: Vec<u8> = vec![VERSION];
    payload.extend(pub_hash_key);
    let checksum = checksum(payload.as_slice());
    payload.extend(checksum.as_slice());
    base58_encode(payload.as_slice())
}
