//! Peer communication and the concurrent node
//!
//! A `Node` puts one lock around the chain manager and talks to peers through
//! a `Transport`. The `Miner` drives the node from its own thread.

pub mod miner;
pub mod node;
pub mod transport;

pub use miner::Miner;
pub use node::Node;
pub use transport::{ChannelTransport, Message, NullTransport, Transport};
