//! Rule-based reference planner.
//!
//! Reads the violations of the current round and proposes at most one edit
//! per concern:
//!
//! - colliding or tight pairs: push the second component away from the
//!   first along the axis of largest centre separation;
//! - keep-out or envelope intrusions with no pair to separate: one REPACK;
//! - centre-of-mass offset (or a low safety factor with a high CG): move
//!   the heaviest component against the offset;
//! - overheating: coat the hottest component, then give it a heatsink,
//!   then move on to the next one.

use log::debug;
use sat_layout_core::{Axis, ConstraintThresholds, Result, ViolationKind};
use sat_layout_optimizer::{ComponentSummary, Planner, PlanningContext, RawAction};
use std::collections::BTreeSet;

/// Centre of a component summary.
fn center(c: &ComponentSummary) -> [f64; 3] {
    [
        c.position[0] + c.dims[0] / 2.0,
        c.position[1] + c.dims[1] / 2.0,
        c.position[2] + c.dims[2] / 2.0,
    ]
}

/// Proposes edits from simple physical rules.
#[derive(Debug, Clone)]
pub struct HeuristicPlanner {
    thresholds: ConstraintThresholds,
    /// Extra gap added on top of the minimum clearance (mm).
    separation_margin: f64,
    /// Largest single CG correction step (mm).
    max_cg_step: f64,
    coating_emissivity: f64,
    heatsink_conductivity: f64,
    step_scale: f64,
    coated: BTreeSet<String>,
    heatsinked: BTreeSet<String>,
    repacked: bool,
}

impl HeuristicPlanner {
    /// Creates a planner aiming at `thresholds`.
    pub fn new(thresholds: ConstraintThresholds) -> Self {
        Self {
            thresholds,
            separation_margin: 1.0,
            max_cg_step: 40.0,
            coating_emissivity: 0.95,
            heatsink_conductivity: 200.0,
            step_scale: 1.0,
            coated: BTreeSet::new(),
            heatsinked: BTreeSet::new(),
            repacked: false,
        }
    }

    /// Sets the largest CG correction step.
    pub fn with_max_cg_step(mut self, step: f64) -> Self {
        self.max_cg_step = step;
        self
    }

    /// Sets the extra separation gap.
    pub fn with_separation_margin(mut self, margin: f64) -> Self {
        self.separation_margin = margin;
        self
    }

    fn separate(&self, a: &ComponentSummary, b: &ComponentSummary) -> Option<RawAction> {
        let (ca, cb) = (center(a), center(b));
        let diff = [cb[0] - ca[0], cb[1] - ca[1], cb[2] - ca[2]];
        let axis = (0..3)
            .max_by(|&i, &j| diff[i].abs().total_cmp(&diff[j].abs()))
            .and_then(Axis::from_index)
            .unwrap_or(Axis::X);
        let i = axis.index();
        let gap = diff[i].abs() - (a.dims[i] + b.dims[i]) / 2.0;
        let needed = self.thresholds.min_clearance + self.separation_margin - gap;
        if needed <= 0.0 {
            return None;
        }
        let sign = if diff[i] >= 0.0 { 1.0 } else { -1.0 };
        Some(
            RawAction::new("MOVE", b.id.clone())
                .with_param("axis", axis)
                .with_param("delta", sign * needed),
        )
    }

    fn balance(&self, context: &PlanningContext, structural_only: bool) -> Option<RawAction> {
        let offset = [
            context.metrics.get("cg_offset_x").copied().unwrap_or(0.0),
            context.metrics.get("cg_offset_y").copied().unwrap_or(0.0),
            context.metrics.get("cg_offset_z").copied().unwrap_or(0.0),
        ];
        let axis = if structural_only {
            if offset[2] <= 0.0 {
                return None;
            }
            Axis::Z
        } else {
            (0..3)
                .max_by(|&i, &j| offset[i].abs().total_cmp(&offset[j].abs()))
                .and_then(Axis::from_index)
                .unwrap_or(Axis::X)
        };

        let total_mass = context.metrics.get("total_mass").copied().unwrap_or(0.0);
        let heaviest = context
            .components
            .iter()
            .filter(|c| c.mass > 0.0)
            .max_by(|a, b| a.mass.total_cmp(&b.mass))?;

        let shift = -offset[axis.index()] * total_mass / heaviest.mass;
        let step = self.max_cg_step * self.step_scale;
        let delta = shift.clamp(-step, step);
        if delta.abs() < 1e-6 {
            return None;
        }
        Some(
            RawAction::new("MOVE", heaviest.id.clone())
                .with_param("axis", axis)
                .with_param("delta", delta),
        )
    }

    fn cool(&mut self, context: &PlanningContext) -> Option<RawAction> {
        let mut by_power: Vec<&ComponentSummary> =
            context.components.iter().filter(|c| c.power > 0.0).collect();
        by_power.sort_by(|a, b| b.power.total_cmp(&a.power));

        for c in by_power {
            if self.coated.insert(c.id.clone()) {
                return Some(
                    RawAction::new("MODIFY_COATING", c.id.clone())
                        .with_param("emissivity", self.coating_emissivity)
                        .with_param("coating_type", "white_paint"),
                );
            }
            if self.heatsinked.insert(c.id.clone()) {
                return Some(
                    RawAction::new("ADD_HEATSINK", c.id.clone())
                        .with_param("face", "+Z")
                        .with_param("conductivity", self.heatsink_conductivity),
                );
            }
        }
        None
    }
}

impl Planner for HeuristicPlanner {
    fn plan(&mut self, context: &PlanningContext) -> Result<Vec<RawAction>> {
        if context.rollback_warning.is_some() {
            // Edits made after the restored state are gone.
            self.coated.clear();
            self.heatsinked.clear();
            self.repacked = false;
            self.step_scale = (self.step_scale * 0.5).max(0.125);
        }

        let mut actions = Vec::new();
        let mut moved = BTreeSet::new();
        let mut intrusions = false;

        for v in &context.violations {
            if !matches!(
                v.kind,
                ViolationKind::GeometryCollision | ViolationKind::GeometryClearance
            ) {
                continue;
            }
            match v.components.as_slice() {
                [a, b] => {
                    let find = |id: &str| context.components.iter().find(|c| c.id == id);
                    let (Some(a), Some(b)) = (find(a.as_str()), find(b.as_str())) else {
                        continue;
                    };
                    if moved.contains(&b.id) {
                        continue;
                    }
                    if let Some(action) = self.separate(a, b) {
                        moved.insert(b.id.clone());
                        actions.push(action);
                    }
                }
                _ => intrusions = true,
            }
        }

        if intrusions && actions.is_empty() && !self.repacked {
            self.repacked = true;
            actions.push(
                RawAction::new("REPACK", "")
                    .with_param("clearance", self.thresholds.min_clearance + self.separation_margin),
            );
        }

        let cg = context
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::CenterOfMassOffset);
        let structural = context
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::StructuralSafetyFactor);
        if cg || structural {
            if let Some(action) = self.balance(context, !cg) {
                if !moved.contains(&action.target) {
                    actions.push(action);
                }
            }
        }

        if context
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::ThermalOverheat)
        {
            if let Some(action) = self.cool(context) {
                actions.push(action);
            }
        }

        debug!(
            "Heuristic plan for round {}: {} actions",
            context.iteration,
            actions.len()
        );
        Ok(actions)
    }
}
