//! Turns a design state into an [`EvaluationResult`].
//!
//! Geometry and mass properties are computed here in closed form; thermal
//! and structural metrics come from the [`PhysicsSolver`]. A solver error
//! never escapes: it becomes a failed evaluation carrying the failure
//! penalty.

use crate::config::PenaltyWeights;
use crate::penalty::compute_penalty;
use crate::physics::PhysicsSolver;
use log::{debug, warn};
use sat_layout_core::{
    ConstraintThresholds, DesignState, EvaluationResult, SimulationResult, Violation,
    ViolationKind,
};
use sat_layout_packing::{check_state, MassProperties};
use std::collections::{BTreeMap, BTreeSet};

/// Evaluates design states against constraint thresholds.
#[derive(Debug, Clone)]
pub struct Evaluator<S> {
    solver: S,
    thresholds: ConstraintThresholds,
    weights: PenaltyWeights,
}

impl<S: PhysicsSolver> Evaluator<S> {
    /// Creates an evaluator.
    pub fn new(solver: S, thresholds: ConstraintThresholds, weights: PenaltyWeights) -> Self {
        Self {
            solver,
            thresholds,
            weights,
        }
    }

    pub fn thresholds(&self) -> &ConstraintThresholds {
        &self.thresholds
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Evaluates `state`.
    pub fn evaluate(&self, state: &DesignState) -> EvaluationResult {
        let t = &self.thresholds;
        let mut metrics = BTreeMap::new();
        let mut violations = Vec::new();

        let report = check_state(state, t.min_clearance);
        if report.min_clearance.is_finite() {
            metrics.insert("min_clearance".to_string(), report.min_clearance);
        }
        metrics.insert("num_collisions".to_string(), report.collision_count as f64);
        metrics.insert(
            "keepout_intrusions".to_string(),
            report.keepout_intrusions.len() as f64,
        );
        metrics.insert(
            "out_of_envelope".to_string(),
            report.out_of_envelope.len() as f64,
        );

        for (a, b, depth) in &report.collisions {
            violations.push(
                Violation::new(
                    format!("collision_{}_{}", a, b),
                    ViolationKind::GeometryCollision,
                    format!("{} and {} overlap by {:.2} mm", a, b, -depth),
                    *depth,
                    0.0,
                )
                .with_components(vec![a.clone(), b.clone()]),
            );
        }
        for (id, tag) in &report.keepout_intrusions {
            violations.push(
                Violation::new(
                    format!("keepout_{}_{}", id, tag),
                    ViolationKind::GeometryCollision,
                    format!("{} intrudes into keep-out zone {}", id, tag),
                    1.0,
                    0.0,
                )
                .with_components(vec![id.clone()]),
            );
        }
        for id in &report.out_of_envelope {
            violations.push(
                Violation::new(
                    format!("envelope_{}", id),
                    ViolationKind::GeometryCollision,
                    format!("{} extends outside the envelope", id),
                    1.0,
                    0.0,
                )
                .with_components(vec![id.clone()]),
            );
        }
        if let Some((a, b, clearance)) = report
            .tight_pairs
            .iter()
            .min_by(|x, y| x.2.total_cmp(&y.2))
        {
            violations.push(
                Violation::new(
                    "clearance",
                    ViolationKind::GeometryClearance,
                    format!(
                        "{} pairs below {:.1} mm, tightest {} / {} at {:.2} mm",
                        report.tight_pairs.len(),
                        t.min_clearance,
                        a,
                        b,
                        clearance
                    ),
                    *clearance,
                    t.min_clearance,
                )
                .with_components(vec![a.clone(), b.clone()]),
            );
        }

        let mass = MassProperties::compute(state);
        let cg_offset = mass.offset_norm();
        metrics.insert("cg_offset".to_string(), cg_offset);
        metrics.insert("cg_offset_x".to_string(), mass.offset.x);
        metrics.insert("cg_offset_y".to_string(), mass.offset.y);
        metrics.insert("cg_offset_z".to_string(), mass.offset.z);
        metrics.insert("total_mass".to_string(), mass.total_mass);
        metrics.insert("total_power".to_string(), state.total_power());
        if cg_offset > t.max_cg_offset {
            violations.push(Violation::new(
                "cg_offset",
                ViolationKind::CenterOfMassOffset,
                format!(
                    "centre of mass {:.1} mm from the envelope centre (dominant axis {})",
                    cg_offset,
                    mass.dominant_axis()
                ),
                cg_offset,
                t.max_cg_offset,
            ));
        }

        let simulation = match self.solver.simulate(state) {
            Ok(result) => result,
            Err(e) => {
                warn!("{} failed on {}: {}", self.solver.name(), state.state_id, e);
                SimulationResult::failed(e.to_string())
            }
        };
        let success = simulation.success;
        for (name, value) in &simulation.metrics {
            metrics.insert(name.clone(), *value);
        }

        if let Some(max_temp) = simulation.metrics.get("max_temp").copied() {
            if max_temp > t.max_temp {
                violations.push(Violation::new(
                    "thermal",
                    ViolationKind::ThermalOverheat,
                    format!("maximum temperature {:.1} °C", max_temp),
                    max_temp,
                    t.max_temp,
                ));
            }
        }
        if let Some(sf) = simulation.metrics.get("safety_factor").copied() {
            if sf < t.min_safety_factor {
                violations.push(Violation::new(
                    "structural",
                    ViolationKind::StructuralSafetyFactor,
                    format!("safety factor {:.2}", sf),
                    sf,
                    t.min_safety_factor,
                ));
            }
        }

        let derived: BTreeSet<ViolationKind> = violations.iter().map(|v| v.kind).collect();
        violations.extend(
            simulation
                .violations
                .into_iter()
                .filter(|v| !derived.contains(&v.kind)),
        );

        let error = if success {
            None
        } else {
            Some(
                simulation
                    .error
                    .unwrap_or_else(|| "solver reported failure".to_string()),
            )
        };
        let penalty = compute_penalty(success, &metrics, &violations, t, &self.weights);
        debug!(
            "Evaluated {}: {} violations, penalty {:.2}",
            state.state_id,
            violations.len(),
            penalty.total()
        );

        EvaluationResult {
            state_id: state.state_id.clone(),
            iteration: state.iteration,
            success,
            metrics,
            violations,
            penalty,
            error,
        }
    }
}
