//! Penalty scoring.

use crate::config::PenaltyWeights;
use sat_layout_core::{ConstraintThresholds, PenaltyBreakdown, Violation};
use std::collections::BTreeMap;

/// Computes the penalty of an evaluated state.
///
/// A failed evaluation scores the fixed failure penalty only. Otherwise the
/// score is a fixed amount per violation plus proportional terms for
/// temperature overrun, clearance shortfall and CG overshoot, plus a fixed
/// amount per colliding pair. Missing metrics contribute nothing.
pub fn compute_penalty(
    success: bool,
    metrics: &BTreeMap<String, f64>,
    violations: &[Violation],
    thresholds: &ConstraintThresholds,
    weights: &PenaltyWeights,
) -> PenaltyBreakdown {
    if !success {
        return PenaltyBreakdown {
            failure: weights.failure,
            ..Default::default()
        };
    }

    let metric = |name: &str| metrics.get(name).copied().filter(|v| v.is_finite());

    let temperature = metric("max_temp")
        .map(|t| (t - thresholds.max_temp).max(0.0) * weights.per_degree_over)
        .unwrap_or(0.0);
    let clearance = metric("min_clearance")
        .map(|c| (thresholds.min_clearance - c).max(0.0) * weights.per_mm_clearance_short)
        .unwrap_or(0.0);
    let center_of_mass = metric("cg_offset")
        .map(|cg| (cg - thresholds.max_cg_offset).max(0.0) * weights.per_mm_cg_over)
        .unwrap_or(0.0);
    let collision = metric("num_collisions").unwrap_or(0.0) * weights.per_collision;

    PenaltyBreakdown {
        violation: violations.len() as f64 * weights.per_violation,
        temperature,
        clearance,
        center_of_mass,
        collision,
        failure: 0.0,
    }
}
