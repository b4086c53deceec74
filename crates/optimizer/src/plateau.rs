//! Plateau detection and deterministic rescue.
//!
//! A plateau is a run of rounds where only centre-of-mass violations are
//! left and neither the penalty nor the CG offset is moving. The rescue is
//! a bounded hill-climb: the heaviest components are stepped along the
//! dominant CG axis against the offset, and the best feasible step wins.

use crate::config::PlateauConfig;
use crate::executor::placement_is_clear;
use log::debug;
use sat_layout_core::{Axis, DesignState, EvaluationResult, ViolationKind};
use sat_layout_packing::{pair_clearance, MassProperties};
use std::collections::VecDeque;

/// Clearance beyond which extra room no longer adds to a rescue score (mm).
const CLEARANCE_SCORE_CAP: f64 = 50.0;

#[derive(Debug, Clone, Copy)]
struct Observation {
    violation_count: usize,
    penalty: f64,
    cg_offset: f64,
    cg_only: bool,
}

/// A rescue move found by [`PlateauDetector::rescue`].
#[derive(Debug, Clone, PartialEq)]
pub struct RescueMove {
    pub component: String,
    pub axis: Axis,
    /// Signed displacement (mm).
    pub delta: f64,
    /// CG offset reduction (mm).
    pub cg_gain: f64,
    /// Composite ranking score, higher is better.
    pub score: f64,
}

/// Watches round results for a CG plateau.
#[derive(Debug, Clone, Default)]
pub struct PlateauDetector {
    config: PlateauConfig,
    window: VecDeque<Observation>,
    last_rescue: Option<u32>,
}

impl PlateauDetector {
    /// Creates a detector.
    pub fn new(config: PlateauConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &PlateauConfig {
        &self.config
    }

    /// Records the evaluation of the current state for one round.
    pub fn observe(&mut self, evaluation: &EvaluationResult) {
        self.window.push_back(Observation {
            violation_count: evaluation.violation_count(),
            penalty: evaluation.penalty_score(),
            cg_offset: evaluation.metric("cg_offset").unwrap_or(0.0),
            cg_only: evaluation.success && evaluation.only_kind(ViolationKind::CenterOfMassOffset),
        });
        while self.window.len() > self.config.window {
            self.window.pop_front();
        }
    }

    /// Forgets observed rounds, e.g. after a rollback.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// True if the observed window is a CG plateau.
    pub fn is_plateau(&self) -> bool {
        let window = self.config.window.max(2);
        if self.window.len() < window {
            return false;
        }
        let Some(first) = self.window.front() else {
            return false;
        };
        let Some(last) = self.window.back() else {
            return false;
        };

        let cg_only = self.window.iter().all(|o| o.cg_only);
        let constant_count = self
            .window
            .iter()
            .all(|o| o.violation_count == first.violation_count);
        let flat = self
            .window
            .iter()
            .zip(self.window.iter().skip(1))
            .all(|(a, b)| (b.penalty - a.penalty).abs() <= self.config.penalty_delta_epsilon);
        let stalled = first.cg_offset - last.cg_offset < self.config.cg_stall_epsilon;

        cg_only && constant_count && flat && stalled
    }

    /// True if enough rounds have passed since the last rescue.
    pub fn can_rescue(&self, iteration: u32) -> bool {
        self.last_rescue
            .map_or(true, |r| iteration.saturating_sub(r) >= self.config.throttle_rounds)
    }

    /// True within `throttle_rounds` after a rescue.
    pub fn in_rescue_window(&self, iteration: u32) -> bool {
        self.last_rescue
            .is_some_and(|r| iteration.saturating_sub(r) <= self.config.throttle_rounds)
    }

    /// Records that a rescue was attempted in `iteration`.
    pub fn mark_rescue(&mut self, iteration: u32) {
        self.last_rescue = Some(iteration);
    }

    /// Searches for the best CG-reducing move.
    ///
    /// For each of the heaviest components, the first ladder step that
    /// passes the local gate and reduces the CG offset by at least the
    /// configured minimum is kept. The candidate with the highest composite
    /// score (CG gain, then mass, then remaining clearance) is returned.
    pub fn rescue(&self, state: &DesignState, min_clearance: f64) -> Option<RescueMove> {
        let mass = MassProperties::compute(state);
        let axis = mass.dominant_axis();
        let offset = mass.offset[axis.index()];
        if offset == 0.0 || mass.total_mass <= 0.0 {
            return None;
        }
        let direction = -offset.signum();
        let base = mass.offset_norm();

        let mut order: Vec<usize> = (0..state.len())
            .filter(|&i| state.components[i].mass > 0.0)
            .collect();
        order.sort_by(|&a, &b| {
            let (ca, cb) = (&state.components[a], &state.components[b]);
            cb.mass.total_cmp(&ca.mass).then_with(|| ca.id.cmp(&cb.id))
        });
        order.truncate(self.config.candidate_count);

        let mut best: Option<RescueMove> = None;
        for index in order {
            let component = &state.components[index];
            for &step in &self.config.step_ladder {
                let delta = direction * step;
                let moved = component.aabb().translated(&(axis.unit() * delta));
                if !placement_is_clear(state, index, &moved, min_clearance) {
                    continue;
                }

                let mut trial = state.clone();
                if let Some(c) = trial.component_at_mut(index) {
                    c.translate(axis, delta);
                }
                let gain = base - MassProperties::compute(&trial).offset_norm();
                if gain < self.config.min_cg_improvement {
                    continue;
                }

                let clearance = state
                    .components
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, other)| pair_clearance(&moved, &other.aabb()).0)
                    .fold(f64::INFINITY, f64::min)
                    .min(CLEARANCE_SCORE_CAP);
                let score = gain + 0.05 * component.mass + 0.01 * clearance;
                debug!(
                    "Rescue candidate {} {:+.1} mm along {}: gain {:.2}, score {:.3}",
                    component.id, delta, axis, gain, score
                );

                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(RescueMove {
                        component: component.id.clone(),
                        axis,
                        delta,
                        cg_gain: gain,
                        score,
                    });
                }
                break;
            }
        }
        best
    }
}
