//! The optimization control loop.
//!
//! Each round evaluates the current state (once per state, via the pool),
//! stops on zero violations, checks for rollback, tries a plateau rescue
//! when stalled on CG alone, then asks the planner for edits, applies them
//! to a child state, gates the child on geometry and finally evaluates it
//! and accepts or rejects it.
//!
//! Nothing inside a round can end the run: errors are logged and the round
//! counts as making no progress.

use crate::action::{Action, RawAction};
use crate::config::OptimizerConfig;
use crate::evaluator::Evaluator;
use crate::executor::OperationExecutor;
use crate::physics::PhysicsSolver;
use crate::planner::{Planner, PlanningContext};
use crate::plateau::PlateauDetector;
use crate::rollback::{RollbackEvent, RollbackPolicy};
use crate::state_pool::StatePool;
use log::{debug, info, warn};
use sat_layout_core::{DesignState, Error, EvaluationResult, Result, META_LAST_EDIT};
use sat_layout_packing::{check_state, FeasibilityReport, LayoutEngine};
use std::fmt;
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RoundDecision {
    /// The planner's candidate became the current state.
    Accepted,
    /// The candidate was evaluated and turned down.
    Rejected,
    /// The edits did not change the state.
    NoOp,
    /// The candidate failed the geometry gate and was not evaluated.
    Infeasible,
    /// The current state was replaced by the best pooled state.
    RolledBack,
    /// A plateau rescue move was accepted.
    Rescued,
    /// The round raised an error and was skipped.
    Error,
}

impl fmt::Display for RoundDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::NoOp => "no-op",
            Self::Infeasible => "infeasible",
            Self::RolledBack => "rolled back",
            Self::Rescued => "rescued",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Summary of one round.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoundRecord {
    pub iteration: u32,
    pub decision: RoundDecision,
    /// Current state after the round.
    pub state_id: String,
    /// Penalty of the current state after the round.
    pub penalty: f64,
    /// Violation count of the current state after the round.
    pub violation_count: usize,
    /// Evaluated candidate, if any.
    pub candidate_id: Option<String>,
    pub candidate_penalty: Option<f64>,
    pub candidate_violations: Option<usize>,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunStatus {
    /// A state with zero violations was reached.
    Converged,
    /// The iteration budget ran out.
    Exhausted,
}

/// Result of a full optimization run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationOutcome {
    pub status: RunStatus,
    pub final_state: DesignState,
    pub final_evaluation: EvaluationResult,
    pub rollback_count: usize,
    pub rollback_events: Vec<RollbackEvent>,
    pub rounds: Vec<RoundRecord>,
    /// Number of distinct states evaluated.
    pub evaluated_states: usize,
    pub computation_time_ms: u64,
}

/// Per-run mutable state, owned by one call to [`Optimizer::run`].
struct RunContext {
    pool: StatePool,
    rollback: RollbackPolicy,
    plateau: PlateauDetector,
    events: Vec<RollbackEvent>,
    rollback_warning: Option<String>,
}

/// Candidate acceptance outcome.
enum Verdict {
    Accept,
    Reject(String),
}

/// The optimization control loop.
pub struct Optimizer<P, S> {
    config: OptimizerConfig,
    planner: P,
    evaluator: Evaluator<S>,
    executor: OperationExecutor,
}

impl<P: Planner, S: PhysicsSolver> Optimizer<P, S> {
    /// Creates an optimizer.
    pub fn new(config: OptimizerConfig, planner: P, solver: S) -> Self {
        let evaluator = Evaluator::new(solver, config.thresholds, config.penalty);
        let executor =
            OperationExecutor::new(config.executor.clone(), config.thresholds.min_clearance);
        Self {
            config,
            planner,
            evaluator,
            executor,
        }
    }

    /// Sets the layout engine used by REPACK.
    pub fn with_engine(mut self, engine: LayoutEngine) -> Self {
        self.executor = self.executor.with_engine(engine);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator<S> {
        &self.evaluator
    }

    /// Runs the loop from `initial`.
    pub fn run(&mut self, initial: DesignState) -> OptimizationOutcome {
        self.run_with_progress(initial, |_| {})
    }

    /// Runs the loop, calling `progress` after every round.
    pub fn run_with_progress<F>(&mut self, initial: DesignState, mut progress: F) -> OptimizationOutcome
    where
        F: FnMut(&RoundRecord),
    {
        let start = Instant::now();
        let mut ctx = RunContext {
            pool: StatePool::new(),
            rollback: RollbackPolicy::new(self.config.rollback),
            plateau: PlateauDetector::new(self.config.plateau.clone()),
            events: Vec::new(),
            rollback_warning: None,
        };
        let mut current = initial;
        let mut rounds = Vec::new();
        let mut status = RunStatus::Exhausted;

        info!(
            "Optimizing {} components for up to {} rounds",
            current.len(),
            self.config.max_iterations
        );

        for iteration in 1..=self.config.max_iterations {
            let evaluation = self.current_evaluation(&current, &mut ctx.pool);
            if evaluation.is_feasible() {
                info!(
                    "Round {}: {} satisfies every constraint",
                    iteration, current.state_id
                );
                status = RunStatus::Converged;
                break;
            }

            let record = match self.round(iteration, &mut current, &evaluation, &mut ctx) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Round {} skipped: {}", iteration, e);
                    summary(iteration, RoundDecision::Error, &current, &evaluation, None)
                }
            };
            info!(
                "Round {}: {} (current {} penalty {:.2}, {} violations)",
                iteration, record.decision, record.state_id, record.penalty, record.violation_count
            );
            progress(&record);
            rounds.push(record);
        }

        let final_evaluation = self.current_evaluation(&current, &mut ctx.pool);
        if status == RunStatus::Exhausted && final_evaluation.is_feasible() {
            status = RunStatus::Converged;
        }
        info!(
            "Finished ({:?}) at {} with penalty {:.2} after {} rollbacks",
            status,
            current.state_id,
            final_evaluation.penalty_score(),
            ctx.rollback.rollback_count()
        );

        OptimizationOutcome {
            status,
            final_state: current,
            final_evaluation,
            rollback_count: ctx.rollback.rollback_count(),
            rollback_events: ctx.events,
            rounds,
            evaluated_states: ctx.pool.len(),
            computation_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Evaluation of `state`, from the pool if it was already evaluated.
    fn current_evaluation(&self, state: &DesignState, pool: &mut StatePool) -> EvaluationResult {
        if let Some(entry) = pool.get(&state.state_id) {
            return entry.evaluation.clone();
        }
        let evaluation = self.evaluator.evaluate(state);
        pool.insert(&state.state_id, state.clone(), evaluation.clone());
        evaluation
    }

    fn round(
        &mut self,
        iteration: u32,
        current: &mut DesignState,
        evaluation: &EvaluationResult,
        ctx: &mut RunContext,
    ) -> Result<RoundRecord> {
        ctx.rollback.record(evaluation.penalty_score());
        ctx.plateau.observe(evaluation);

        if let Some(reason) = ctx.rollback.check(evaluation, &ctx.pool) {
            if let Some((entry, event)) =
                ctx.rollback
                    .rollback(iteration, reason, evaluation, &ctx.pool)
            {
                *current = entry.state.clone();
                let restored = entry.evaluation.clone();
                ctx.rollback_warning = Some(format!(
                    "Rolled back from {} to {} ({}); penalty {:.1} -> {:.1}",
                    event.from_state, event.to_state, reason, event.penalty_before, event.penalty_after
                ));
                ctx.events.push(event);
                ctx.plateau.reset();
                return Ok(summary(
                    iteration,
                    RoundDecision::RolledBack,
                    current,
                    &restored,
                    None,
                ));
            }
        }

        if ctx.plateau.is_plateau() && ctx.plateau.can_rescue(iteration) {
            ctx.plateau.mark_rescue(iteration);
            if let Some(record) = self.try_rescue(iteration, current, evaluation, ctx)? {
                return Ok(record);
            }
        }

        let context = PlanningContext::new(
            iteration,
            current,
            evaluation,
            ctx.rollback.notes(),
            ctx.rollback_warning.take(),
        );
        let raw = self.plan(&context)?;
        let actions: Vec<Action> = raw
            .iter()
            .filter_map(|r| match Action::parse(r) {
                Ok(Action::Unknown { tag }) => {
                    warn!("Skipping unknown op '{}'", tag);
                    None
                }
                Ok(action) => Some(action),
                Err(e) => {
                    warn!("Skipping malformed {} on '{}': {}", r.op, r.target, e);
                    None
                }
            })
            .collect();
        debug!("Round {}: {} of {} actions parsed", iteration, actions.len(), raw.len());

        let child = current.derive_child(iteration, format!("state_iter_{:02}_a", iteration));
        let outcome = self.executor.apply(&child, &actions);
        if !outcome.changed {
            return Ok(summary(iteration, RoundDecision::NoOp, current, evaluation, None));
        }
        let candidate = outcome.state;

        if let Some(reason) = self.gate(current, &candidate) {
            debug!("Round {}: {} not evaluated: {}", iteration, candidate.state_id, reason);
            ctx.rollback.note(format!(
                "Round {}: edits [{}] rejected before evaluation: {}",
                iteration,
                outcome.applied.join("; "),
                reason
            ));
            return Ok(summary(iteration, RoundDecision::Infeasible, current, evaluation, None));
        }

        let candidate_eval = self.evaluator.evaluate(&candidate);
        ctx.pool
            .insert(&candidate.state_id, candidate.clone(), candidate_eval.clone());

        let in_window = ctx.plateau.in_rescue_window(iteration);
        match self.decide(evaluation, &candidate_eval, in_window) {
            Verdict::Accept => {
                *current = candidate;
                Ok(summary(
                    iteration,
                    RoundDecision::Accepted,
                    current,
                    &candidate_eval,
                    Some(&candidate_eval),
                ))
            }
            Verdict::Reject(why) => {
                debug!("Round {}: {} rejected: {}", iteration, candidate_eval.state_id, why);
                Ok(summary(
                    iteration,
                    RoundDecision::Rejected,
                    current,
                    evaluation,
                    Some(&candidate_eval),
                ))
            }
        }
    }

    /// Asks the planner for this round's edits. Any planner failure comes
    /// back as [`Error::Planner`].
    fn plan(&mut self, context: &PlanningContext) -> Result<Vec<RawAction>> {
        self.planner.plan(context).map_err(|e| match e {
            Error::Planner(_) => e,
            other => Error::Planner(other.to_string()),
        })
    }

    /// Geometry admission gate. Returns the reason for refusing `candidate`.
    ///
    /// A candidate is admitted when it is collision-free (pairs, keep-outs
    /// and envelope) and no pair is closer than the clearance threshold.
    /// With [`OptimizerConfig::admit_partial_repairs`] a candidate with
    /// fewer hard geometry problems than `current` is admitted as well.
    fn gate(&self, current: &DesignState, candidate: &DesignState) -> Option<String> {
        let min_clearance = self.config.thresholds.min_clearance;
        let report = check_state(candidate, min_clearance);
        let clearance_short = report.min_clearance < min_clearance;
        if report.is_collision_free() && !clearance_short {
            return None;
        }
        if self.config.admit_partial_repairs {
            let hard = |r: &FeasibilityReport| {
                r.collision_count + r.keepout_intrusions.len() + r.out_of_envelope.len()
            };
            if hard(&report) < hard(&check_state(current, min_clearance)) {
                return None;
            }
        }
        Some(format!(
            "{} collisions, {} keep-out intrusions, {} parts outside the envelope, min clearance {:.2} mm",
            report.collision_count,
            report.keepout_intrusions.len(),
            report.out_of_envelope.len(),
            report.min_clearance
        ))
    }

    fn decide(
        &self,
        current: &EvaluationResult,
        candidate: &EvaluationResult,
        in_rescue_window: bool,
    ) -> Verdict {
        let (before, after) = (current.violation_count(), candidate.violation_count());
        if after < before {
            return Verdict::Accept;
        }
        if after > before {
            return Verdict::Reject(format!("violations {} -> {}", before, after));
        }

        let (p0, p1) = (current.penalty_score(), candidate.penalty_score());
        if p1 <= p0 {
            return Verdict::Accept;
        }
        let plateau = &self.config.plateau;
        if in_rescue_window && p1 - p0 <= plateau.penalty_tolerance {
            let gain = cg_gain(current, candidate);
            if gain >= plateau.min_cg_improvement {
                return Verdict::Accept;
            }
        }
        Verdict::Reject(format!("penalty {:.2} -> {:.2}", p0, p1))
    }

    fn try_rescue(
        &mut self,
        iteration: u32,
        current: &mut DesignState,
        evaluation: &EvaluationResult,
        ctx: &mut RunContext,
    ) -> Result<Option<RoundRecord>> {
        let min_clearance = self.config.thresholds.min_clearance;
        let Some(rescue) = ctx.plateau.rescue(current, min_clearance) else {
            debug!("Round {}: plateau but no rescue move found", iteration);
            return Ok(None);
        };

        let mut candidate =
            current.derive_child(iteration, format!("state_iter_{:02}_rescue", iteration));
        candidate
            .component_mut(&rescue.component)?
            .translate(rescue.axis, rescue.delta);
        candidate
            .metadata
            .insert(META_LAST_EDIT.to_string(), "changed".to_string());
        if candidate.fingerprint() == current.fingerprint() {
            return Err(Error::Internal("rescue move left the state unchanged".into()));
        }

        let candidate_eval = self.evaluator.evaluate(&candidate);
        ctx.pool
            .insert(&candidate.state_id, candidate.clone(), candidate_eval.clone());

        let p0 = evaluation.penalty_score();
        let p1 = candidate_eval.penalty_score();
        let gain = cg_gain(evaluation, &candidate_eval);
        let accepted = candidate_eval.success
            && candidate_eval.violation_count() <= evaluation.violation_count()
            && (p1 < p0
                || (p1 - p0 <= self.config.plateau.penalty_tolerance
                    && gain >= self.config.plateau.min_cg_improvement));

        if !accepted {
            info!(
                "Round {}: rescue {} {:+.1} mm along {} not kept (penalty {:.2} -> {:.2})",
                iteration, rescue.component, rescue.delta, rescue.axis, p0, p1
            );
            return Ok(None);
        }

        info!(
            "Round {}: plateau rescue moved {} {:+.1} mm along {} (CG -{:.2} mm)",
            iteration, rescue.component, rescue.delta, rescue.axis, gain
        );
        *current = candidate;
        Ok(Some(summary(
            iteration,
            RoundDecision::Rescued,
            current,
            &candidate_eval,
            Some(&candidate_eval),
        )))
    }
}

fn cg_gain(before: &EvaluationResult, after: &EvaluationResult) -> f64 {
    match (before.metric("cg_offset"), after.metric("cg_offset")) {
        (Some(a), Some(b)) => a - b,
        _ => 0.0,
    }
}

fn summary(
    iteration: u32,
    decision: RoundDecision,
    current: &DesignState,
    evaluation: &EvaluationResult,
    candidate: Option<&EvaluationResult>,
) -> RoundRecord {
    RoundRecord {
        iteration,
        decision,
        state_id: current.state_id.clone(),
        penalty: evaluation.penalty_score(),
        violation_count: evaluation.violation_count(),
        candidate_id: candidate.map(|c| c.state_id.clone()),
        candidate_penalty: candidate.map(EvaluationResult::penalty_score),
        candidate_violations: candidate.map(EvaluationResult::violation_count),
    }
}
