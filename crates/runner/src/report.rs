//! Run report written after an optimization.

use sat_layout_core::{DesignState, Violation};
use sat_layout_optimizer::{
    OptimizationOutcome, RollbackEvent, RoundDecision, RoundRecord, RunStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Outcome of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name
    pub scenario: String,
    pub status: RunStatus,
    /// Rounds executed
    pub rounds_run: usize,
    pub accepted_rounds: usize,
    pub rollback_count: usize,
    /// Distinct states evaluated
    pub evaluated_states: usize,
    /// Parts the initial packing could not place
    pub unplaced: Vec<String>,
    pub initial_penalty: f64,
    pub final_penalty: f64,
    pub final_state_id: String,
    pub final_metrics: BTreeMap<String, f64>,
    pub final_violations: Vec<Violation>,
    pub rounds: Vec<RoundRecord>,
    pub rollback_events: Vec<RollbackEvent>,
    pub final_state: DesignState,
    /// Computation time in milliseconds
    pub time_ms: u64,
}

impl RunReport {
    /// Builds a report from an optimization outcome.
    pub fn from_outcome(
        scenario: impl Into<String>,
        outcome: &OptimizationOutcome,
        initial_penalty: f64,
        unplaced: Vec<String>,
    ) -> Self {
        let accepted_rounds = outcome
            .rounds
            .iter()
            .filter(|r| matches!(r.decision, RoundDecision::Accepted | RoundDecision::Rescued))
            .count();
        Self {
            scenario: scenario.into(),
            status: outcome.status,
            rounds_run: outcome.rounds.len(),
            accepted_rounds,
            rollback_count: outcome.rollback_count,
            evaluated_states: outcome.evaluated_states,
            unplaced,
            initial_penalty,
            final_penalty: outcome.final_evaluation.penalty_score(),
            final_state_id: outcome.final_state.state_id.clone(),
            final_metrics: outcome.final_evaluation.metrics.clone(),
            final_violations: outcome.final_evaluation.violations.clone(),
            rounds: outcome.rounds.clone(),
            rollback_events: outcome.rollback_events.clone(),
            final_state: outcome.final_state.clone(),
            time_ms: outcome.computation_time_ms,
        }
    }

    /// Saves the report as pretty-printed JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Prints a summary table to stdout.
    pub fn print_summary(&self) {
        println!("\n{:=<80}", "");
        println!("LAYOUT OPTIMIZATION: {}", self.scenario);
        println!("{:=<80}", "");
        println!(
            "Status: {:?}   Rounds: {}   Accepted: {}   Rollbacks: {}   States: {}",
            self.status,
            self.rounds_run,
            self.accepted_rounds,
            self.rollback_count,
            self.evaluated_states
        );
        println!(
            "Penalty: {:.2} -> {:.2}   Final state: {}   Time: {} ms",
            self.initial_penalty, self.final_penalty, self.final_state_id, self.time_ms
        );
        if !self.unplaced.is_empty() {
            println!("Unplaced parts: {}", self.unplaced.join(", "));
        }

        println!("{:-<80}", "");
        println!(
            "{:>5} {:<14} {:<24} {:>12} {:>10}",
            "Round", "Decision", "State", "Penalty", "Violations"
        );
        println!("{:-<80}", "");
        for r in &self.rounds {
            println!(
                "{:>5} {:<14} {:<24} {:>12.2} {:>10}",
                r.iteration,
                r.decision.to_string(),
                r.state_id,
                r.penalty,
                r.violation_count
            );
        }

        if !self.final_violations.is_empty() {
            println!("{:-<80}", "");
            println!("Remaining violations:");
            for v in &self.final_violations {
                println!("  [{}] {}", v.kind, v.description);
            }
        }
        println!("{:=<80}", "");
    }
}
