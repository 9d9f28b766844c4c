use crate::utils::current_timestamp;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    DoubleSpend,
    ChainInvalid,
    Reorg,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::DoubleSpend => write!(f, "DOUBLE_SPEND"),
            AlertKind::ChainInvalid => write!(f, "CHAIN_INVALID"),
            AlertKind::Reorg => write!(f, "REORG"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub kind: AlertKind,
    pub detail: String,
    /// Milliseconds since the Unix epoch, 0 if the clock was unreadable
    pub timestamp: i64,
}

impl Alert {
    pub fn new(kind: AlertKind, detail: &str) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            kind,
            detail: detail.to_string(),
            timestamp: current_timestamp().unwrap_or(0),
        }
    }
}

/// Receiver of ledger alerts.
pub trait AlertSink: Send + Sync {
    fn notify(&self, kind: AlertKind, detail: &str);
}

/// Drops every alert.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn notify(&self, _kind: AlertKind, _detail: &str) {}
}

/// Bounded in-memory alert history. Oldest alerts are evicted first.
pub struct AlertLog {
    capacity: usize,
    history: Mutex<VecDeque<Alert>>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> AlertLog {
        AlertLog {
            capacity: capacity.max(1),
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, alert: Alert) {
        warn!("[{}] {}", alert.kind, alert.detail);
        match self.history.lock() {
            Ok(mut history) => {
                if history.len() == self.capacity {
                    history.pop_front();
                }
                history.push_back(alert);
            }
            Err(_) => {
                error!("Failed to acquire lock on alert history");
            }
        }
    }

    pub fn history(&self) -> Vec<Alert> {
        match self.history.lock() {
            Ok(history) => history.iter().cloned().collect(),
            Err(_) => {
                error!("Failed to acquire lock on alert history");
                Vec::new()
            }
        }
    }

    pub fn count(&self, kind: AlertKind) -> usize {
        match self.history.lock() {
            Ok(history) => history.iter().filter(|alert| alert.kind == kind).count(),
            Err(_) => {
                error!("Failed to acquire lock on alert history");
                0
            }
        }
    }

    pub fn len(&self) -> usize {
        self.history.lock().map(|history| history.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for AlertLog {
    fn notify(&self, kind: AlertKind, detail: &str) {
        self.record(Alert::new(kind, detail));
    }
}

/// Sending half handed to the ledger. `notify` only queues the alert.
#[derive(Clone)]
pub struct ChannelAlertSink {
    sender: Arc<Mutex<Sender<Alert>>>,
}

impl AlertSink for ChannelAlertSink {
    fn notify(&self, kind: AlertKind, detail: &str) {
        let alert = Alert::new(kind, detail);
        let sent = match self.sender.lock() {
            Ok(sender) => sender.send(alert).is_ok(),
            Err(_) => false,
        };
        if !sent {
            warn!("Alert dropped, delivery thread is gone: [{kind}] {detail}");
        }
    }
}

/// Alerts delivered to an `AlertLog` by a dedicated thread.
///
/// The thread exits once every `ChannelAlertSink` and the system itself are
/// dropped.
pub struct AlertSystem {
    log: Arc<AlertLog>,
    sender: Option<Sender<Alert>>,
    handle: Option<JoinHandle<()>>,
}

impl AlertSystem {
    pub fn start(capacity: usize) -> AlertSystem {
        let log = Arc::new(AlertLog::new(capacity));
        let (sender, receiver) = mpsc::channel::<Alert>();
        let worker_log = Arc::clone(&log);
        let handle = thread::Builder::new()
            .name("alerts".to_string())
            .spawn(move || {
                for alert in receiver {
                    worker_log.record(alert);
                }
            });
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to spawn alert thread: {e}");
                None
            }
        };
        AlertSystem {
            log,
            sender: Some(sender),
            handle,
        }
    }

    pub fn sink(&self) -> Arc<dyn AlertSink> {
        match &self.sender {
            Some(sender) if self.handle.is_some() => {
                let sink: Arc<dyn AlertSink> = Arc::new(ChannelAlertSink {
                    sender: Arc::new(Mutex::new(sender.clone())),
                });
                sink
            }
            // No delivery thread: record synchronously instead of losing alerts
            _ => {
                let sink: Arc<dyn AlertSink> = self.log.clone();
                sink
            }
        }
    }

    pub fn log(&self) -> Arc<AlertLog> {
        Arc::clone(&self.log)
    }
}

impl Drop for AlertSystem {
    fn drop(&mut self) {
        self.sender.take();
        // Sinks still held elsewhere keep the channel open, so the thread is
        // detached rather than joined.
        self.handle.take();
    }
}
