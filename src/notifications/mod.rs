//! Alert delivery
//!
//! The ledger reports double-spends, failed chain validation and tip changes
//! through an `AlertSink`. Delivery is fire-and-forget: a sink must never
//! block the ledger mutation that raised the alert.

pub mod alerts;

pub use alerts::{Alert, AlertKind, AlertLog, AlertSink, AlertSystem, ChannelAlertSink, NullAlertSink};
