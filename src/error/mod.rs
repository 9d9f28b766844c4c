//! Error handling for the ledger
//!
//! Every failure the ledger can report is a `BlockchainError`. Each variant
//! belongs to one `ErrorKind`, which is what callers branch on when deciding
//! whether an outcome is an expected rejection or a reason to stop trusting
//! the chain.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Broad classes of ledger failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad signature, insufficient balance, malformed or duplicate transaction
    Validation,
    /// Nonce space exhausted, cancelled search, invalid proof
    Consensus,
    /// Hash or link mismatch found while validating a chain
    ChainIntegrity,
    /// Ledger state observed without the required serialization
    Concurrency,
    /// Operation not valid in the current chain state
    State,
    /// Storage, serialization and I/O failures
    Storage,
    /// Bad configuration
    Config,
    /// Key handling failures
    Crypto,
}

/// What exactly was wrong with a block during chain validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// Stored hash differs from the recomputed hash
    HashMismatch,
    /// `previous_hash` does not equal the prior block's hash
    BrokenLink,
    /// Stored merkle root differs from the recomputed commitment
    MerkleMismatch,
    /// Hash does not carry enough leading zeros
    InsufficientWork,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::HashMismatch => write!(f, "stored hash does not match contents"),
            IntegrityViolation::BrokenLink => write!(f, "previous hash does not link to prior block"),
            IntegrityViolation::MerkleMismatch => write!(f, "merkle root does not match transactions"),
            IntegrityViolation::InsufficientWork => write!(f, "hash does not meet difficulty"),
        }
    }
}

/// Comprehensive error types for ledger operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Signature missing or rejected by the verifier
    InvalidSignature(String),
    /// Sender cannot cover the requested amount
    InsufficientFunds {
        address: String,
        required: u64,
        available: u64,
    },
    /// Transaction id already pending, confirmed, or its outputs already exist
    DuplicateTransaction(String),
    /// Transaction fields are inconsistent (bad id, empty address, ...)
    MalformedTransaction(String),
    /// Nonce bound reached without a valid hash
    NonceExhausted { height: u64, attempts: u64 },
    /// Nonce search stopped through the cancellation token
    MiningCancelled { height: u64, attempts: u64 },
    /// Block hash fails recomputation or difficulty
    InvalidProof { height: u64 },
    /// Candidate was mined on a tip that is no longer current
    StaleCandidate { height: u64 },
    /// Structural block errors outside proof checking
    InvalidBlock(String),
    /// Chain validation failed at `height`
    ChainIntegrity {
        height: u64,
        violation: IntegrityViolation,
    },
    /// Ledger mutated without the single-writer discipline
    ConcurrencyViolation(String),
    /// Operation not valid in the current state
    InvalidState(String),
    /// Mining requested with an empty mempool
    NoPendingWork,
    /// Database-related errors
    Database(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
    /// Cryptographic operation errors
    Crypto(String),
}

impl BlockchainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockchainError::InvalidSignature(_)
            | BlockchainError::InsufficientFunds { .. }
            | BlockchainError::DuplicateTransaction(_)
            | BlockchainError::MalformedTransaction(_) => ErrorKind::Validation,
            BlockchainError::NonceExhausted { .. }
            | BlockchainError::MiningCancelled { .. }
            | BlockchainError::InvalidProof { .. }
            | BlockchainError::StaleCandidate { .. }
            | BlockchainError::InvalidBlock(_) => ErrorKind::Consensus,
            BlockchainError::ChainIntegrity { .. } => ErrorKind::ChainIntegrity,
            BlockchainError::ConcurrencyViolation(_) => ErrorKind::Concurrency,
            BlockchainError::InvalidState(_) | BlockchainError::NoPendingWork => ErrorKind::State,
            BlockchainError::Database(_)
            | BlockchainError::Serialization(_)
            | BlockchainError::Io(_) => ErrorKind::Storage,
            BlockchainError::Config(_) => ErrorKind::Config,
            BlockchainError::Crypto(_) => ErrorKind::Crypto,
        }
    }

    /// Rejections and failed mining attempts the caller is expected to handle and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::Consensus)
            || matches!(self, BlockchainError::NoPendingWork)
    }

    /// Height of the offending block, for errors that identify one.
    pub fn height(&self) -> Option<u64> {
        match self {
            BlockchainError::NonceExhausted { height, .. }
            | BlockchainError::MiningCancelled { height, .. }
            | BlockchainError::InvalidProof { height }
            | BlockchainError::StaleCandidate { height }
            | BlockchainError::ChainIntegrity { height, .. } => Some(*height),
            _ => None,
        }
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::InvalidSignature(txid) => {
                write!(f, "Invalid signature on transaction {txid}")
            }
            BlockchainError::InsufficientFunds {
                address,
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds for {address}: required {required}, available {available}"
                )
            }
            BlockchainError::DuplicateTransaction(txid) => {
                write!(f, "Duplicate transaction: {txid}")
            }
            BlockchainError::MalformedTransaction(msg) => write!(f, "Malformed transaction: {msg}"),
            BlockchainError::NonceExhausted { height, attempts } => {
                write!(
                    f,
                    "Nonce space exhausted for block {height} after {attempts} attempts"
                )
            }
            BlockchainError::MiningCancelled { height, attempts } => {
                write!(
                    f,
                    "Mining of block {height} cancelled after {attempts} attempts"
                )
            }
            BlockchainError::InvalidProof { height } => {
                write!(f, "Invalid proof of work for block {height}")
            }
            BlockchainError::StaleCandidate { height } => {
                write!(f, "Candidate block {height} no longer extends the chain tip")
            }
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::ChainIntegrity { height, violation } => {
                write!(f, "Chain integrity failure at block {height}: {violation}")
            }
            BlockchainError::ConcurrencyViolation(msg) => {
                write!(f, "Concurrency violation: {msg}")
            }
            BlockchainError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            BlockchainError::NoPendingWork => write!(f, "No pending transactions to mine"),
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
