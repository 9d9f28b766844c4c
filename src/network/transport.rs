use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use std::sync::Mutex;

/// Wire messages between nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Transaction {
        addr_from: String,
        transaction: Transaction,
    },
    Block {
        addr_from: String,
        block: Block,
    },
}

impl Message {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Message> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn get_addr_from(&self) -> &str {
        match self {
            Message::Transaction { addr_from, .. } | Message::Block { addr_from, .. } => {
                addr_from.as_str()
            }
        }
    }
}

/// Outbound side of peer communication. Both calls return how many peers
/// the message was queued for.
pub trait Transport: Send + Sync {
    fn broadcast_transaction(&self, tx: &Transaction) -> Result<usize>;
    fn broadcast_block(&self, block: &Block) -> Result<usize>;
}

/// A node with no peers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn broadcast_transaction(&self, _tx: &Transaction) -> Result<usize> {
        Ok(0)
    }

    fn broadcast_block(&self, _block: &Block) -> Result<usize> {
        Ok(0)
    }
}

struct Peer {
    addr: String,
    sender: Sender<Vec<u8>>,
}

/// In-process transport: every peer is the sending half of a channel whose
/// receiver feeds that peer's `Node::handle_bytes`.
pub struct ChannelTransport {
    addr: String,
    peers: Mutex<Vec<Peer>>,
}

impl ChannelTransport {
    pub fn new(addr: &str) -> ChannelTransport {
        ChannelTransport {
            addr: addr.to_string(),
            peers: Mutex::new(Vec::new()),
        }
    }

    pub fn add_peer(&self, addr: &str, sender: Sender<Vec<u8>>) -> Result<()> {
        let mut peers = self.lock_peers()?;
        if !peers.iter().any(|peer| peer.addr == addr) {
            peers.push(Peer {
                addr: addr.to_string(),
                sender,
            });
        }
        Ok(())
    }

    pub fn get_peer_addrs(&self) -> Result<Vec<String>> {
        Ok(self
            .lock_peers()?
            .iter()
            .map(|peer| peer.addr.clone())
            .collect())
    }

    fn lock_peers(&self) -> Result<std::sync::MutexGuard<'_, Vec<Peer>>> {
        self.peers.lock().map_err(|_| {
            BlockchainError::ConcurrencyViolation("peer list lock poisoned".to_string())
        })
    }

    // Peers whose receiver is gone are evicted
    fn broadcast(&self, message: &Message) -> Result<usize> {
        let bytes = message.to_bytes()?;
        let mut peers = self.lock_peers()?;
        peers.retain(|peer| match peer.sender.send(bytes.clone()) {
            Ok(()) => true,
            Err(_) => {
                warn!("Peer {} is unreachable, evicting", peer.addr);
                false
            }
        });
        Ok(peers.len())
    }
}

impl Transport for ChannelTransport {
    fn broadcast_transaction(&self, tx: &Transaction) -> Result<usize> {
        self.broadcast(&Message::Transaction {
            addr_from: self.addr.clone(),
            transaction: tx.clone(),
        })
    }

    fn broadcast_block(&self, block: &Block) -> Result<usize> {
        self.broadcast(&Message::Block {
            addr_from: self.addr.clone(),
            block: block.clone(),
        })
    }
}
