//! # sat-layout-optimizer
//!
//! The optimization control loop for satellite component layouts.
//!
//! Each round the [`Optimizer`] evaluates the current [`DesignState`],
//! consults a [`Planner`] for edits, applies them through the
//! [`OperationExecutor`] (MOVE uses an adaptive step ladder) and accepts or
//! rejects the result. Every evaluated state is kept in a [`StatePool`];
//! the [`RollbackPolicy`] jumps back to the best one when things go wrong
//! and the [`PlateauDetector`] rescues runs stalled on centre of mass.
//!
//! ## Quick Start
//!
//! ```rust
//! use sat_layout_core::{Component, DesignState, Envelope, EnvelopeOrigin, Vector3};
//! use sat_layout_optimizer::{
//!     Optimizer, OptimizerConfig, RawAction, RunStatus, ScriptedPlanner, SimplifiedPhysics,
//! };
//!
//! let envelope = Envelope::with_size(Vector3::new(400.0, 400.0, 400.0), 0.0, EnvelopeOrigin::Corner)
//!     .unwrap();
//! let state = DesignState::new("state_iter_00_init", envelope)
//!     .with_component(Component::new(
//!         "obc",
//!         Vector3::new(150.0, 175.0, 175.0),
//!         Vector3::new(50.0, 50.0, 50.0),
//!     ))
//!     .with_component(Component::new(
//!         "radio",
//!         Vector3::new(201.0, 175.0, 175.0),
//!         Vector3::new(50.0, 50.0, 50.0),
//!     ));
//!
//! let planner = ScriptedPlanner::new(vec![vec![
//!     RawAction::new("MOVE", "radio").with_param("axis", "X").with_param("delta", 10),
//! ]]);
//! let mut optimizer = Optimizer::new(OptimizerConfig::default(), planner, SimplifiedPhysics::new());
//! let outcome = optimizer.run(state);
//! assert_eq!(outcome.status, RunStatus::Converged);
//! ```

pub mod action;
pub mod config;
pub mod controller;
pub mod evaluator;
pub mod executor;
pub mod parallel;
pub mod penalty;
pub mod physics;
pub mod planner;
pub mod plateau;
pub mod rollback;
pub mod state_pool;

pub use action::{Action, DeformKind, RawAction, ALLOWED_OPS};
pub use config::{
    ExecutorConfig, OptimizerConfig, PenaltyWeights, PlateauConfig, RollbackConfig,
};
pub use controller::{OptimizationOutcome, Optimizer, RoundDecision, RoundRecord, RunStatus};
pub use evaluator::Evaluator;
pub use executor::{placement_is_clear, ExecutionOutcome, OperationExecutor};
pub use parallel::WhatIfEvaluator;
pub use penalty::compute_penalty;
pub use physics::{PhysicsSolver, SimplifiedPhysics};
pub use planner::{ComponentSummary, Planner, PlanningContext, ScriptedPlanner};
pub use plateau::{PlateauDetector, RescueMove};
pub use rollback::{RollbackEvent, RollbackPolicy, RollbackReason};
pub use state_pool::{PoolEntry, StatePool};

pub use sat_layout_core::{DesignState, Error, Result};
