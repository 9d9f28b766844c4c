use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::notifications::{AlertKind, AlertSink};
use crate::storage::UTXOSet;
use crate::wallet::SignatureVerifier;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Pending transactions in arrival order.
///
/// The pool has no lock of its own: it is only ever reached through the
/// ledger that owns it, which serializes access together with the chain
/// and UTXO set.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    entries: Vec<Transaction>,
    ids: HashSet<String>,
}

/// Result of screening a candidate batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreeningReport {
    pub valid: Vec<Transaction>,
    pub double_spends: Vec<Transaction>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool::default()
    }

    /// Admission control for one transaction.
    ///
    /// Balance is checked against the confirmed UTXO set only; what is
    /// already pending is screened later, at block assembly.
    pub fn admit(
        &mut self,
        tx: Transaction,
        utxo_set: &UTXOSet,
        verifier: &dyn SignatureVerifier,
    ) -> Result<()> {
        if self.ids.contains(tx.get_id()) {
            return Err(BlockchainError::DuplicateTransaction(tx.get_id().to_string()));
        }
        if !tx.has_valid_id() {
            return Err(BlockchainError::MalformedTransaction(format!(
                "tx_id {} does not match its contents",
                tx.get_id()
            )));
        }
        if tx.is_coinbase() {
            return Err(BlockchainError::MalformedTransaction(format!(
                "{} is a coinbase transaction; only mining creates those",
                tx.get_id()
            )));
        }
        if !verifier.verify(&tx) {
            return Err(BlockchainError::InvalidSignature(tx.get_id().to_string()));
        }
        let available = utxo_set.get_balance(tx.get_sender());
        if available < tx.get_amount() {
            return Err(BlockchainError::InsufficientFunds {
                address: tx.get_sender().to_string(),
                required: tx.get_amount(),
                available,
            });
        }

        debug!("Admitted {} to the mempool", tx.get_id());
        self.ids.insert(tx.get_id().to_string());
        self.entries.push(tx);
        Ok(())
    }

    /// Split `candidates` into spendable transactions and double-spends.
    ///
    /// Each sender's amounts are summed in arrival order and compared to the
    /// sender's confirmed balance. The first transaction that pushes the
    /// running total past the balance, and every later one that does too, is
    /// a double-spend. Coinbase entries are always valid.
    pub fn screen_batch(
        candidates: &[Transaction],
        utxo_set: &UTXOSet,
        alerts: &dyn AlertSink,
    ) -> ScreeningReport {
        let mut report = ScreeningReport::default();
        let mut spending_tracker: HashMap<&str, u64> = HashMap::new();

        for tx in candidates {
            if tx.is_coinbase() {
                report.valid.push(tx.clone());
                continue;
            }
            let sender = tx.get_sender();
            let balance = utxo_set.get_balance(sender);
            let total = spending_tracker.entry(sender).or_insert(0);
            *total = total.saturating_add(tx.get_amount());

            if *total > balance {
                let detail = format!(
                    "Potential double-spend by {sender}: transaction {} brings batch spending to {} against a balance of {balance}",
                    tx.get_id(),
                    *total
                );
                warn!("{detail}");
                alerts.notify(AlertKind::DoubleSpend, &detail);
                report.double_spends.push(tx.clone());
            } else {
                report.valid.push(tx.clone());
            }
        }
        report
    }

    /// Screen everything pending.
    pub fn screen(&self, utxo_set: &UTXOSet, alerts: &dyn AlertSink) -> ScreeningReport {
        Self::screen_batch(&self.entries, utxo_set, alerts)
    }

    /// Drop every entry whose id is in `confirmed`.
    pub fn prune<S: AsRef<str>>(&mut self, confirmed: &[S]) -> usize {
        let confirmed: HashSet<&str> = confirmed.iter().map(|id| id.as_ref()).collect();
        let before = self.entries.len();
        self.entries.retain(|tx| !confirmed.contains(tx.get_id()));
        self.ids.retain(|id| !confirmed.contains(id.as_str()));
        before - self.entries.len()
    }

    /// Drop pending transfers whose sender can no longer cover them against
    /// the confirmed set. Run after a block lands, this is what clears the
    /// losing side of a screened double-spend.
    pub fn evict_unfundable(&mut self, utxo_set: &UTXOSet) -> Vec<Transaction> {
        let (keep, evicted): (Vec<Transaction>, Vec<Transaction>) =
            self.entries.drain(..).partition(|tx| {
                tx.is_coinbase() || utxo_set.get_balance(tx.get_sender()) >= tx.get_amount()
            });
        self.entries = keep;
        for tx in &evicted {
            self.ids.remove(tx.get_id());
            warn!(
                "Evicted {} from the mempool: {} can no longer cover {}",
                tx.get_id(),
                tx.get_sender(),
                tx.get_amount()
            );
        }
        evicted
    }

    pub fn get(&self, txid: &str) -> Option<&Transaction> {
        self.entries.iter().find(|tx| tx.get_id() == txid)
    }

    pub fn contains(&self, txid: &str) -> bool {
        self.ids.contains(txid)
    }

    pub fn get_all(&self) -> &[Transaction] {
        self.entries.as_slice()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::AlertLog;
    use crate::storage::Utxo;
    use crate::testnet::test_utils::{AcceptAll, RejectAll};

    fn alice_with(balance: u64) -> UTXOSet {
        let mut set = UTXOSet::new();
        set.add_utxo(Utxo::new("seed", 0, balance, "Alice"));
        set
    }

    fn transfer(to: &str, amount: u64, ts: i64) -> Transaction {
        Transaction::with_timestamp("Alice", to, amount, ts).unwrap()
    }

    #[test]
    fn test_admit_accepts_funded_transaction() {
        let mut pool = MemoryPool::new();
        let tx = transfer("Bob", 5, 1);
        pool.admit(tx.clone(), &alice_with(6), &AcceptAll).unwrap();
        assert!(pool.contains(tx.get_id()));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_admit_rejects_duplicate() {
        let mut pool = MemoryPool::new();
        let utxo = alice_with(6);
        let tx = transfer("Bob", 5, 1);
        pool.admit(tx.clone(), &utxo, &AcceptAll).unwrap();
        let err = pool.admit(tx, &utxo, &AcceptAll).unwrap_err();
        assert!(matches!(err, BlockchainError::DuplicateTransaction(_)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_admit_rejects_bad_signature() {
        let mut pool = MemoryPool::new();
        let err = pool
            .admit(transfer("Bob", 5, 1), &alice_with(6), &RejectAll)
            .unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidSignature(_)));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_admit_rejects_insufficient_balance() {
        let mut pool = MemoryPool::new();
        let err = pool
            .admit(transfer("Bob", 5, 1), &UTXOSet::new(), &AcceptAll)
            .unwrap_err();
        assert_eq!(
            err,
            BlockchainError::InsufficientFunds {
                address: "Alice".to_string(),
                required: 5,
                available: 0,
            }
        );
    }

    #[test]
    fn test_admit_checks_confirmed_balance_only() {
        // Two pending spends of 5 against a balance of 6 both pass admission
        let mut pool = MemoryPool::new();
        let utxo = alice_with(6);
        pool.admit(transfer("Bob", 5, 1), &utxo, &AcceptAll).unwrap();
        pool.admit(transfer("Carol", 5, 2), &utxo, &AcceptAll).unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_admit_rejects_tampered_id_and_coinbase() {
        let mut pool = MemoryPool::new();
        let mut tx = transfer("Bob", 5, 1);
        tx.tamper_amount(1);
        assert!(matches!(
            pool.admit(tx, &alice_with(6), &AcceptAll),
            Err(BlockchainError::MalformedTransaction(_))
        ));

        let reward = Transaction::new_coinbase("miner", 5, 1).unwrap();
        assert!(matches!(
            pool.admit(reward, &alice_with(6), &AcceptAll),
            Err(BlockchainError::MalformedTransaction(_))
        ));
    }

    #[test]
    fn test_screen_first_come_first_served() {
        let utxo = alice_with(6);
        let alerts = AlertLog::new(10);
        let tx1 = transfer("Bob", 5, 1);
        let tx2 = transfer("Carol", 5, 2);

        let report = MemoryPool::screen_batch(&[tx1.clone(), tx2.clone()], &utxo, &alerts);
        assert_eq!(report.valid, vec![tx1]);
        assert_eq!(report.double_spends, vec![tx2]);
        assert_eq!(alerts.count(AlertKind::DoubleSpend), 1);
    }

    #[test]
    fn test_screen_lets_coinbase_through() {
        let alerts = AlertLog::new(10);
        let reward = Transaction::new_coinbase("miner", 5, 1).unwrap();
        let report = MemoryPool::screen_batch(&[reward.clone()], &UTXOSet::new(), &alerts);
        assert_eq!(report.valid, vec![reward]);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_screen_tracks_senders_independently() {
        let mut utxo = alice_with(5);
        utxo.add_utxo(Utxo::new("seed", 0, 5, "Bob"));
        let alerts = AlertLog::new(10);
        let a = transfer("Carol", 5, 1);
        let b = Transaction::with_timestamp("Bob", "Carol", 5, 1).unwrap();
        let report = MemoryPool::screen_batch(&[a, b], &utxo, &alerts);
        assert_eq!(report.valid.len(), 2);
        assert!(report.double_spends.is_empty());
    }

    #[test]
    fn test_prune_removes_confirmed() {
        let mut pool = MemoryPool::new();
        let utxo = alice_with(20);
        let tx1 = transfer("Bob", 5, 1);
        let tx2 = transfer("Carol", 5, 2);
        pool.admit(tx1.clone(), &utxo, &AcceptAll).unwrap();
        pool.admit(tx2.clone(), &utxo, &AcceptAll).unwrap();

        assert_eq!(pool.prune(&[tx1.get_id()]), 1);
        assert!(!pool.contains(tx1.get_id()));
        assert_eq!(pool.get(tx2.get_id()), Some(&tx2));
    }

    #[test]
    fn test_evict_unfundable_after_balance_drops() {
        let mut pool = MemoryPool::new();
        let tx1 = transfer("Bob", 5, 1);
        let tx2 = transfer("Carol", 5, 2);
        pool.admit(tx1.clone(), &alice_with(6), &AcceptAll).unwrap();
        pool.admit(tx2.clone(), &alice_with(6), &AcceptAll).unwrap();
        pool.prune(&[tx1.get_id()]);

        // tx1 confirmed: Alice is down to 1
        let evicted = pool.evict_unfundable(&alice_with(1));
        assert_eq!(evicted, vec![tx2]);
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }
}
