use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One spendable output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub tx_id: String,
    pub output_index: u32,
    pub amount: u64,
    pub owner: String,
}

impl Utxo {
    pub fn new(tx_id: &str, output_index: u32, amount: u64, owner: &str) -> Utxo {
        Utxo {
            tx_id: tx_id.to_string(),
            output_index,
            amount,
            owner: owner.to_string(),
        }
    }

    fn same_key(&self, tx_id: &str, output_index: u32) -> bool {
        self.tx_id == tx_id && self.output_index == output_index
    }
}

/// ( K -> owner address, V => unspent outputs in insertion order )
///
/// Insertion order is the enumeration order `apply` spends in, so it must be
/// stable: a `Vec` per owner rather than a hashed set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UTXOSet {
    utxos: HashMap<String, Vec<Utxo>>,
    applied_blocks: u64,
}

/// What applying one transaction will do, computed before anything changes.
struct SpendPlan {
    spends: Vec<(String, u32)>,
    outputs: Vec<Utxo>,
}

impl UTXOSet {
    pub fn new() -> UTXOSet {
        UTXOSet::default()
    }

    /// Insert `utxo`. Returns false and leaves the set unchanged when the
    /// (owner, tx_id, output_index) key is already present.
    pub fn add_utxo(&mut self, utxo: Utxo) -> bool {
        let bucket = self.utxos.entry(utxo.owner.clone()).or_default();
        if bucket
            .iter()
            .any(|existing| existing.same_key(&utxo.tx_id, utxo.output_index))
        {
            return false;
        }
        bucket.push(utxo);
        true
    }

    /// Remove and return the matching output. An owner whose last output is
    /// spent disappears from the set.
    pub fn spend_utxo(&mut self, tx_id: &str, output_index: u32, owner: &str) -> Option<Utxo> {
        let bucket = self.utxos.get_mut(owner)?;
        let position = bucket
            .iter()
            .position(|utxo| utxo.same_key(tx_id, output_index))?;
        let spent = bucket.remove(position);
        if bucket.is_empty() {
            self.utxos.remove(owner);
        }
        Some(spent)
    }

    pub fn get_balance(&self, owner: &str) -> u64 {
        self.utxos
            .get(owner)
            .map(|bucket| bucket.iter().map(|utxo| utxo.amount).sum())
            .unwrap_or(0)
    }

    pub fn get_utxos(&self, owner: &str) -> &[Utxo] {
        self.utxos
            .get(owner)
            .map(|bucket| bucket.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_unspent(&self, tx_id: &str, output_index: u32, owner: &str) -> bool {
        self.get_utxos(owner)
            .iter()
            .any(|utxo| utxo.same_key(tx_id, output_index))
    }

    pub fn owner_count(&self) -> usize {
        self.utxos.len()
    }

    /// Sum over every owner. Changes only through coinbase outputs.
    pub fn total_value(&self) -> u64 {
        self.utxos
            .values()
            .flat_map(|bucket| bucket.iter())
            .map(|utxo| utxo.amount)
            .sum()
    }

    /// Apply one transaction. Either every effect lands or the set is left
    /// exactly as it was.
    ///
    /// A coinbase creates a single output for its receiver. A transfer spends
    /// the sender's outputs in enumeration order until `amount` is covered,
    /// pays the receiver and returns any excess to the sender as change.
    /// Output indices are allocated per transaction, payment first.
    pub fn apply(&mut self, tx: &Transaction) -> Result<()> {
        let plan = self.plan(tx)?;

        for utxo in &plan.outputs {
            if self.is_unspent(&utxo.tx_id, utxo.output_index, &utxo.owner) {
                return Err(BlockchainError::DuplicateTransaction(format!(
                    "{} (output {} for {} already exists)",
                    utxo.tx_id, utxo.output_index, utxo.owner
                )));
            }
        }

        for (tx_id, output_index) in &plan.spends {
            self.spend_utxo(tx_id, *output_index, tx.get_sender());
        }
        for utxo in plan.outputs {
            self.add_utxo(utxo);
        }
        debug!(
            "Applied {} ({} -> {}: {})",
            tx.get_id(),
            tx.get_sender(),
            tx.get_receiver(),
            tx.get_amount()
        );
        Ok(())
    }

    fn plan(&self, tx: &Transaction) -> Result<SpendPlan> {
        let mut next_index: u32 = 0;
        let mut allocate = || {
            let index = next_index;
            next_index += 1;
            index
        };

        if tx.is_coinbase() {
            return Ok(SpendPlan {
                spends: Vec::new(),
                outputs: vec![Utxo::new(
                    tx.get_id(),
                    allocate(),
                    tx.get_amount(),
                    tx.get_receiver(),
                )],
            });
        }

        let sender = tx.get_sender();
        let amount = tx.get_amount();
        let available = self.get_balance(sender);
        if available < amount {
            return Err(BlockchainError::InsufficientFunds {
                address: sender.to_string(),
                required: amount,
                available,
            });
        }

        let mut spends = Vec::new();
        let mut covered: u64 = 0;
        for utxo in self.get_utxos(sender) {
            if covered >= amount {
                break;
            }
            spends.push((utxo.tx_id.clone(), utxo.output_index));
            covered += utxo.amount;
        }

        let mut outputs = vec![Utxo::new(
            tx.get_id(),
            allocate(),
            amount,
            tx.get_receiver(),
        )];
        if covered > amount {
            outputs.push(Utxo::new(tx.get_id(), allocate(), covered - amount, sender));
        }
        Ok(SpendPlan { spends, outputs })
    }

    /// Record that one more block's transactions are reflected in the set.
    pub fn mark_block_applied(&mut self) {
        self.applied_blocks += 1;
    }

    pub fn applied_blocks(&self) -> u64 {
        self.applied_blocks
    }
}
