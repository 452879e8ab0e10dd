//! Bounded calculation history
//!
//! Newest entries first. Once the ledger holds `HISTORY_CAPACITY` entries,
//! each new record evicts the oldest one. Ids come from a counter of records
//! ever created, so they keep increasing after eviction and are never reused.

use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::Mutex;

use super::engine::{Calculation, Operation};

/// Number of calculations kept
pub const HISTORY_CAPACITY: usize = 10;

struct LedgerState {
    entries: VecDeque<Calculation>,
    created: u64,
}

/// Process-lifetime calculation history, one per server
pub struct HistoryLedger {
    capacity: usize,
    state: Mutex<LedgerState>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(LedgerState {
                entries: VecDeque::with_capacity(capacity + 1),
                created: 0,
            }),
        }
    }

    /// Assign the next id, prepend, and evict past capacity as one step
    pub async fn record(
        &self,
        operation: Operation,
        inputs: BTreeMap<String, f64>,
        result: f64,
    ) -> Calculation {
        let mut state = self.state.lock().await;
        state.created += 1;

        let calculation = Calculation {
            id: state.created,
            operation,
            inputs,
            result,
            timestamp: Utc::now(),
        };

        state.entries.push_front(calculation.clone());
        while state.entries.len() > self.capacity {
            state.entries.pop_back();
        }

        calculation
    }

    /// Newest-first entries, truncated to `limit` when given
    pub async fn list(&self, limit: Option<usize>) -> Vec<Calculation> {
        let state = self.state.lock().await;
        let take = limit.unwrap_or(state.entries.len());
        state.entries.iter().take(take).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new()
    }
}
