//! Constraint thresholds shared by the feasibility gate and the evaluator.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Limits a design must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConstraintThresholds {
    /// Maximum component temperature (°C).
    pub max_temp: f64,
    /// Minimum gap between components (mm).
    pub min_clearance: f64,
    /// Maximum centre-of-mass offset from the envelope centre (mm).
    pub max_cg_offset: f64,
    /// Minimum structural safety factor.
    pub min_safety_factor: f64,
}

impl Default for ConstraintThresholds {
    fn default() -> Self {
        Self {
            max_temp: 60.0,
            min_clearance: 3.0,
            max_cg_offset: 50.0,
            min_safety_factor: 2.0,
        }
    }
}

impl ConstraintThresholds {
    /// Creates thresholds with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum temperature.
    pub fn with_max_temp(mut self, max_temp: f64) -> Self {
        self.max_temp = max_temp;
        self
    }

    /// Sets the minimum clearance.
    pub fn with_min_clearance(mut self, min_clearance: f64) -> Self {
        self.min_clearance = min_clearance;
        self
    }

    /// Sets the maximum CG offset.
    pub fn with_max_cg_offset(mut self, max_cg_offset: f64) -> Self {
        self.max_cg_offset = max_cg_offset;
        self
    }

    /// Sets the minimum safety factor.
    pub fn with_min_safety_factor(mut self, min_safety_factor: f64) -> Self {
        self.min_safety_factor = min_safety_factor;
        self
    }
}
