//! Optimizer configuration.
//!
//! Every tunable constant of the control loop lives here with its default.

use sat_layout_core::ConstraintThresholds;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Weights of the penalty score.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PenaltyWeights {
    /// Fixed penalty per violation.
    pub per_violation: f64,
    /// Per °C above the temperature limit.
    pub per_degree_over: f64,
    /// Per mm below the clearance limit.
    pub per_mm_clearance_short: f64,
    /// Per mm above the CG offset limit.
    pub per_mm_cg_over: f64,
    /// Per colliding pair.
    pub per_collision: f64,
    /// Penalty of a failed evaluation.
    pub failure: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            per_violation: 100.0,
            per_degree_over: 10.0,
            per_mm_clearance_short: 50.0,
            per_mm_cg_over: 2.0,
            per_collision: 500.0,
            failure: 9999.0,
        }
    }
}

/// When to roll back to the best known state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RollbackConfig {
    /// Penalty above which a state counts as catastrophic.
    pub catastrophic_threshold: f64,
    /// Number of strictly rising penalties that trigger a rollback.
    pub rising_window: usize,
    /// Failure notes kept for the planner.
    pub failure_note_capacity: usize,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            catastrophic_threshold: 1000.0,
            rising_window: 3,
            failure_note_capacity: 3,
        }
    }
}

/// Plateau detection and rescue.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlateauConfig {
    /// Rounds observed before a plateau can be declared.
    pub window: usize,
    /// Minimum rounds between two rescues; also the length of the
    /// tolerance window after a rescue.
    pub throttle_rounds: u32,
    /// Minimum CG offset improvement a rescue move must achieve (mm).
    pub min_cg_improvement: f64,
    /// Penalty deltas at or below this count as flat.
    pub penalty_delta_epsilon: f64,
    /// CG improvement over the window below this counts as stalled (mm).
    pub cg_stall_epsilon: f64,
    /// Number of heaviest components tried.
    pub candidate_count: usize,
    /// Step sizes tried in order (mm).
    pub step_ladder: Vec<f64>,
    /// Penalty increase tolerated inside the rescue window.
    pub penalty_tolerance: f64,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            window: 4,
            throttle_rounds: 2,
            min_cg_improvement: 0.2,
            penalty_delta_epsilon: 5.0,
            cg_stall_epsilon: 2.0,
            candidate_count: 3,
            step_ladder: vec![5.0, 10.0, 20.0, 40.0, 80.0],
            penalty_tolerance: 2.0,
        }
    }
}

/// Operation executor settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExecutorConfig {
    /// Fractions of a requested MOVE tried in order.
    pub scale_ladder: Vec<f64>,
    /// Clearance used by REPACK when the action gives none (mm).
    pub default_repack_clearance: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            scale_ladder: vec![1.0, 0.5, 0.25, 0.1, 0.05],
            default_repack_clearance: 20.0,
        }
    }
}

/// Top-level optimizer configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OptimizerConfig {
    /// Round budget.
    pub max_iterations: u32,
    pub thresholds: ConstraintThresholds,
    pub penalty: PenaltyWeights,
    pub rollback: RollbackConfig,
    pub plateau: PlateauConfig,
    pub executor: ExecutorConfig,
    /// Also admit candidates that still break geometry but have fewer
    /// collisions, keep-out intrusions and out-of-envelope parts than the
    /// current state. Off: only collision-free candidates meeting the
    /// clearance threshold reach the solver.
    pub admit_partial_repairs: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            thresholds: ConstraintThresholds::default(),
            penalty: PenaltyWeights::default(),
            rollback: RollbackConfig::default(),
            plateau: PlateauConfig::default(),
            executor: ExecutorConfig::default(),
            admit_partial_repairs: false,
        }
    }
}

impl OptimizerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the round budget.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the constraint thresholds.
    pub fn with_thresholds(mut self, thresholds: ConstraintThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Sets the penalty weights.
    pub fn with_penalty(mut self, penalty: PenaltyWeights) -> Self {
        self.penalty = penalty;
        self
    }

    /// Sets the rollback policy.
    pub fn with_rollback(mut self, rollback: RollbackConfig) -> Self {
        self.rollback = rollback;
        self
    }

    /// Sets the plateau settings.
    pub fn with_plateau(mut self, plateau: PlateauConfig) -> Self {
        self.plateau = plateau;
        self
    }

    /// Sets the executor settings.
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Admits partial geometry repairs to evaluation.
    pub fn with_partial_repairs(mut self, admit: bool) -> Self {
        self.admit_partial_repairs = admit;
        self
    }
}
