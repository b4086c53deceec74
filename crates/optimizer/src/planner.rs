//! Planner interface.
//!
//! The planner proposes edits each round. It sees a [`PlanningContext`] and
//! answers with loosely typed [`RawAction`]s, which the control loop parses
//! and validates before anything is applied.

use crate::action::{RawAction, ALLOWED_OPS};
use sat_layout_core::{DesignState, EvaluationResult, Result, Violation};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Compact view of one component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentSummary {
    pub id: String,
    pub category: String,
    /// Minimum corner (mm).
    pub position: [f64; 3],
    pub dims: [f64; 3],
    pub mass: f64,
    pub power: f64,
}

/// Everything a planner is told about the current round.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanningContext {
    pub iteration: u32,
    pub state_id: String,
    pub penalty: f64,
    pub metrics: BTreeMap<String, f64>,
    pub violations: Vec<Violation>,
    pub components: Vec<ComponentSummary>,
    /// Most recent failure notes, oldest first.
    pub recent_failures: Vec<String>,
    /// Set on the round after a rollback.
    pub rollback_warning: Option<String>,
    pub allowed_ops: Vec<String>,
}

impl PlanningContext {
    /// Builds a context for `state` and its evaluation.
    pub fn new(
        iteration: u32,
        state: &DesignState,
        evaluation: &EvaluationResult,
        recent_failures: &VecDeque<String>,
        rollback_warning: Option<String>,
    ) -> Self {
        let components = state
            .iter()
            .map(|c| ComponentSummary {
                id: c.id.clone(),
                category: c.category.clone(),
                position: [c.position.x, c.position.y, c.position.z],
                dims: [c.dims.x, c.dims.y, c.dims.z],
                mass: c.mass,
                power: c.power,
            })
            .collect();
        Self {
            iteration,
            state_id: state.state_id.clone(),
            penalty: evaluation.penalty_score(),
            metrics: evaluation.metrics.clone(),
            violations: evaluation.violations.clone(),
            components,
            recent_failures: recent_failures.iter().cloned().collect(),
            rollback_warning,
            allowed_ops: ALLOWED_OPS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Renders the context as Markdown for prompt-based planners.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Round {} ({})", self.iteration, self.state_id);
        let _ = writeln!(out, "\nPenalty: {:.2}", self.penalty);

        if let Some(warning) = &self.rollback_warning {
            let _ = writeln!(out, "\n> **Rollback:** {}", warning);
        }

        let _ = writeln!(out, "\n## Metrics\n");
        for (name, value) in &self.metrics {
            let _ = writeln!(out, "- {}: {:.3}", name, value);
        }

        let _ = writeln!(out, "\n## Violations\n");
        if self.violations.is_empty() {
            let _ = writeln!(out, "None.");
        }
        for v in &self.violations {
            let _ = writeln!(
                out,
                "- [{}] {} (value {:.2}, threshold {:.2})",
                v.kind, v.description, v.value, v.threshold
            );
        }

        let _ = writeln!(out, "\n## Components\n");
        let _ = writeln!(out, "| id | category | position | dims | mass | power |");
        let _ = writeln!(out, "|---|---|---|---|---|---|");
        for c in &self.components {
            let _ = writeln!(
                out,
                "| {} | {} | ({:.1}, {:.1}, {:.1}) | {:.1}×{:.1}×{:.1} | {:.2} | {:.1} |",
                c.id,
                c.category,
                c.position[0],
                c.position[1],
                c.position[2],
                c.dims[0],
                c.dims[1],
                c.dims[2],
                c.mass,
                c.power
            );
        }

        if !self.recent_failures.is_empty() {
            let _ = writeln!(out, "\n## Recent failures (avoid repeating)\n");
            for note in &self.recent_failures {
                let _ = writeln!(out, "- {}", note);
            }
        }

        let _ = writeln!(out, "\nAllowed operations: {}", self.allowed_ops.join(", "));
        out
    }
}

/// Proposes edits for the control loop.
pub trait Planner {
    /// Returns the actions to apply this round. An error ends the round
    /// without changes.
    fn plan(&mut self, context: &PlanningContext) -> Result<Vec<RawAction>>;
}

impl<P: Planner + ?Sized> Planner for Box<P> {
    fn plan(&mut self, context: &PlanningContext) -> Result<Vec<RawAction>> {
        (**self).plan(context)
    }
}

/// Replays queued action batches, one per round, then proposes nothing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPlanner {
    batches: VecDeque<Vec<RawAction>>,
}

impl ScriptedPlanner {
    /// Creates a planner that replays `batches` in order.
    pub fn new(batches: Vec<Vec<RawAction>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }

    /// Queues another batch.
    pub fn push(&mut self, batch: Vec<RawAction>) {
        self.batches.push_back(batch);
    }

    /// Number of batches left.
    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

impl Planner for ScriptedPlanner {
    fn plan(&mut self, _context: &PlanningContext) -> Result<Vec<RawAction>> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}
