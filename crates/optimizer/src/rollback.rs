//! Rollback policy.
//!
//! A rollback moves the current pointer to the lowest-penalty entry of the
//! state pool. It is triggered by a failed evaluation, by a catastrophic
//! penalty when a strictly better state exists, or by a run of strictly
//! rising penalties.

use crate::config::RollbackConfig;
use crate::state_pool::{PoolEntry, StatePool};
use log::{info, warn};
use sat_layout_core::EvaluationResult;
use std::collections::VecDeque;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a rollback fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RollbackReason {
    /// The solver failed on the current state.
    SolverFailure,
    /// Penalty above the catastrophic threshold.
    Catastrophic,
    /// Penalty rose strictly over the configured window.
    RisingPenalty,
}

impl fmt::Display for RollbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SolverFailure => "solver failure",
            Self::Catastrophic => "catastrophic penalty",
            Self::RisingPenalty => "penalty rising",
        };
        f.write_str(s)
    }
}

/// A rollback that took place.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RollbackEvent {
    pub iteration: u32,
    pub reason: RollbackReason,
    pub from_state: String,
    pub to_state: String,
    pub penalty_before: f64,
    pub penalty_after: f64,
}

/// Tracks penalty history and decides when to roll back.
#[derive(Debug, Clone, Default)]
pub struct RollbackPolicy {
    config: RollbackConfig,
    history: Vec<f64>,
    notes: VecDeque<String>,
    rollback_count: usize,
}

impl RollbackPolicy {
    /// Creates a policy.
    pub fn new(config: RollbackConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Records the penalty of the current state for this round.
    pub fn record(&mut self, penalty: f64) {
        self.history.push(penalty);
    }

    /// Number of rollbacks performed.
    pub fn rollback_count(&self) -> usize {
        self.rollback_count
    }

    /// Recent failure notes, oldest first.
    pub fn notes(&self) -> &VecDeque<String> {
        &self.notes
    }

    /// Appends a failure note, keeping only the most recent ones.
    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push_back(note.into());
        while self.notes.len() > self.config.failure_note_capacity {
            self.notes.pop_front();
        }
    }

    fn is_rising(&self) -> bool {
        let n = self.config.rising_window;
        if n < 2 || self.history.len() < n {
            return false;
        }
        self.history[self.history.len() - n..]
            .windows(2)
            .all(|w| w[1] > w[0])
    }

    /// Checks whether `current` should be abandoned.
    ///
    /// Never fires when the pool's best entry is `current` itself.
    pub fn check(&self, current: &EvaluationResult, pool: &StatePool) -> Option<RollbackReason> {
        let best = pool.best()?;
        if best.state.state_id == current.state_id {
            return None;
        }
        let penalty = current.penalty_score();
        let best_penalty = best.evaluation.penalty_score();

        if !current.success {
            Some(RollbackReason::SolverFailure)
        } else if penalty > self.config.catastrophic_threshold && best_penalty < penalty {
            Some(RollbackReason::Catastrophic)
        } else if self.is_rising() && best_penalty < penalty {
            Some(RollbackReason::RisingPenalty)
        } else {
            None
        }
    }

    /// Rolls back to the best pool entry.
    ///
    /// Returns the entry and the event, or `None` (with a warning) when the
    /// pool is empty. The penalty history is cleared.
    pub fn rollback<'a>(
        &mut self,
        iteration: u32,
        reason: RollbackReason,
        current: &EvaluationResult,
        pool: &'a StatePool,
    ) -> Option<(&'a PoolEntry, RollbackEvent)> {
        let Some(best) = pool.best() else {
            warn!("Rollback requested with an empty state pool; staying on {}", current.state_id);
            return None;
        };

        let event = RollbackEvent {
            iteration,
            reason,
            from_state: current.state_id.clone(),
            to_state: best.state.state_id.clone(),
            penalty_before: current.penalty_score(),
            penalty_after: best.evaluation.penalty_score(),
        };
        info!(
            "Rollback ({}): {} ({:.2}) -> {} ({:.2})",
            reason, event.from_state, event.penalty_before, event.to_state, event.penalty_after
        );

        let detail = match &current.error {
            Some(err) => format!(": {}", err),
            None => String::new(),
        };
        self.note(format!(
            "Round {}: state {} was abandoned ({}{}) with penalty {:.1} and {} violations; do not repeat the edits that produced it",
            iteration,
            current.state_id,
            reason,
            detail,
            current.penalty_score(),
            current.violation_count()
        ));
        self.history.clear();
        self.rollback_count += 1;
        Some((best, event))
    }
}
