//! Evaluation results, violations and solver output.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ViolationKind {
    /// Two components closer than the minimum clearance.
    GeometryClearance,
    /// Overlapping components, or a component inside a keep-out zone.
    GeometryCollision,
    /// Centre of mass too far from the envelope centre.
    CenterOfMassOffset,
    /// Temperature above the allowed maximum.
    ThermalOverheat,
    /// Structural safety factor below the required minimum.
    StructuralSafetyFactor,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GeometryClearance => "geometry_clearance",
            Self::GeometryCollision => "geometry_collision",
            Self::CenterOfMassOffset => "center_of_mass_offset",
            Self::ThermalOverheat => "thermal_overheat",
            Self::StructuralSafetyFactor => "structural_safety_factor",
        };
        f.write_str(s)
    }
}

/// One constraint violation. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Violation {
    pub id: String,
    pub kind: ViolationKind,
    pub description: String,
    /// Components involved, if any.
    pub components: Vec<String>,
    /// Measured value.
    pub value: f64,
    /// Threshold the value was checked against.
    pub threshold: f64,
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        id: impl Into<String>,
        kind: ViolationKind,
        description: impl Into<String>,
        value: f64,
        threshold: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            description: description.into(),
            components: Vec::new(),
            value,
            threshold,
        }
    }

    /// Sets the involved components.
    pub fn with_components(mut self, components: Vec<String>) -> Self {
        self.components = components;
        self
    }
}

/// Output of an external physics solver.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationResult {
    pub success: bool,
    pub metrics: BTreeMap<String, f64>,
    pub violations: Vec<Violation>,
    pub error: Option<String>,
}

impl SimulationResult {
    /// Successful result with the given metrics.
    pub fn ok(metrics: BTreeMap<String, f64>) -> Self {
        Self {
            success: true,
            metrics,
            violations: Vec::new(),
            error: None,
        }
    }

    /// Failed result carrying an error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            metrics: BTreeMap::new(),
            violations: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Penalty score split by source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PenaltyBreakdown {
    /// Fixed penalty per violation instance.
    pub violation: f64,
    /// Proportional temperature overrun.
    pub temperature: f64,
    /// Proportional clearance shortfall.
    pub clearance: f64,
    /// Proportional centre-of-mass overshoot.
    pub center_of_mass: f64,
    /// Fixed penalty per colliding pair.
    pub collision: f64,
    /// Fixed penalty for a failed evaluation.
    pub failure: f64,
}

impl PenaltyBreakdown {
    /// Sum of all parts.
    pub fn total(&self) -> f64 {
        self.violation
            + self.temperature
            + self.clearance
            + self.center_of_mass
            + self.collision
            + self.failure
    }
}

/// Result of evaluating one design state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvaluationResult {
    pub state_id: String,
    pub iteration: u32,
    pub success: bool,
    pub metrics: BTreeMap<String, f64>,
    pub violations: Vec<Violation>,
    pub penalty: PenaltyBreakdown,
    pub error: Option<String>,
}

impl EvaluationResult {
    /// Scalar penalty score.
    pub fn penalty_score(&self) -> f64 {
        self.penalty.total()
    }

    /// Number of violations.
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    /// Looks up a metric.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// True if any violation has the given kind.
    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// True if there is at least one violation and every one has `kind`.
    pub fn only_kind(&self, kind: ViolationKind) -> bool {
        !self.violations.is_empty() && self.violations.iter().all(|v| v.kind == kind)
    }

    /// True if the state satisfies every constraint.
    pub fn is_feasible(&self) -> bool {
        self.success && self.violations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_penalty_total() {
        let p = PenaltyBreakdown {
            violation: 100.0,
            temperature: 20.0,
            clearance: 0.0,
            center_of_mass: 4.5,
            collision: 0.0,
            failure: 0.0,
        };
        assert_relative_eq!(p.total(), 124.5);
    }

    #[test]
    fn test_only_kind() {
        let mut eval = EvaluationResult {
            state_id: "s".into(),
            iteration: 1,
            success: true,
            metrics: BTreeMap::new(),
            violations: vec![Violation::new(
                "cg",
                ViolationKind::CenterOfMassOffset,
                "cg offset",
                60.0,
                50.0,
            )],
            penalty: PenaltyBreakdown::default(),
            error: None,
        };
        assert!(eval.only_kind(ViolationKind::CenterOfMassOffset));
        eval.violations.clear();
        assert!(!eval.only_kind(ViolationKind::CenterOfMassOffset));
        assert!(eval.is_feasible());
    }

    #[test]
    fn test_violation_kind_display() {
        assert_eq!(ViolationKind::ThermalOverheat.to_string(), "thermal_overheat");
    }
}
