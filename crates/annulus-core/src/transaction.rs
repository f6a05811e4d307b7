//! Coordinator-side transaction bookkeeping (§3, §4.3, §4.5).

use std::collections::HashMap;

use annulus_types::Operation;

/// A coordinator-initiated operation awaiting quorum or timeout.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub kind: Operation,
    pub key: String,
    pub value: String,
    pub start_time: u64,
    pub num_successful_replies: usize,
    pub aggregated_value: String,
    pub active: bool,
}

impl Transaction {
    fn new(id: i64, kind: Operation, key: String, value: String, start_time: u64) -> Self {
        Self {
            id,
            kind,
            key,
            value,
            start_time,
            num_successful_replies: 0,
            aggregated_value: String::new(),
            active: true,
        }
    }
}

/// Allocates transaction ids and holds every transaction this node has
/// ever coordinated. Ids are monotonic per node (§9: the source's global
/// counter is replaced with per-node allocation so that many nodes can
/// run in one process without colliding).
///
/// Decided transactions are retained rather than pruned, matching the
/// source; a deployment under memory pressure may prune entries whose
/// `active` is `false` without affecting correctness, since a transaction
/// is decided at most once by construction.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    next_id: i64,
    transactions: HashMap<i64, Transaction>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new transaction and returns its freshly allocated id.
    pub fn begin(&mut self, kind: Operation, key: impl Into<String>, value: impl Into<String>, now: u64) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.transactions
            .insert(id, Transaction::new(id, kind, key.into(), value.into(), now));
        id
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut Transaction> {
        self.transactions.get_mut(&id)
    }

    pub fn get(&self, id: i64) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    /// Ids of every transaction still awaiting a decision, in the order
    /// they were created.
    pub fn active_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .transactions
            .iter()
            .filter(|(_, t)| t.active)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
