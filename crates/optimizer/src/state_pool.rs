//! In-memory record of every evaluated design state of one run.

use sat_layout_core::{DesignState, EvaluationResult};
use std::collections::HashMap;

/// A pooled state and its evaluation.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub state: DesignState,
    pub evaluation: EvaluationResult,
}

/// State pool keyed by `state_id`.
///
/// Entries are never evicted. Re-inserting an id replaces its entry but
/// keeps its original insertion rank, which breaks ties in [`StatePool::best`].
#[derive(Debug, Clone, Default)]
pub struct StatePool {
    entries: Vec<PoolEntry>,
    index: HashMap<String, usize>,
}

impl StatePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a state and its evaluation.
    pub fn insert(&mut self, state_id: &str, state: DesignState, evaluation: EvaluationResult) {
        let entry = PoolEntry { state, evaluation };
        match self.index.get(state_id) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert(state_id.to_string(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Looks up an entry.
    pub fn get(&self, state_id: &str) -> Option<&PoolEntry> {
        self.index.get(state_id).map(|&i| &self.entries[i])
    }

    /// True if `state_id` has been recorded.
    pub fn contains(&self, state_id: &str) -> bool {
        self.index.contains_key(state_id)
    }

    /// Entry with the lowest penalty; earliest inserted wins ties.
    pub fn best(&self) -> Option<&PoolEntry> {
        self.entries.iter().reduce(|best, e| {
            if e.evaluation.penalty_score() < best.evaluation.penalty_score() {
                e
            } else {
                best
            }
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PoolEntry> {
        self.entries.iter()
    }
}
