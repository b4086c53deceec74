//! Mass properties of a design state.

use nalgebra::Vector3;
use sat_layout_core::{Axis, DesignState};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Centre of mass and its offset from the envelope centre.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Total mass (kg).
    pub total_mass: f64,
    /// Mass-weighted centre of component centres.
    pub center_of_mass: Vector3<f64>,
    /// `center_of_mass - inner box centre`.
    pub offset: Vector3<f64>,
}

impl MassProperties {
    /// Computes mass properties. A massless state has its centre of mass at
    /// the envelope centre.
    pub fn compute(state: &DesignState) -> Self {
        let reference = state.envelope.inner.center();
        let total_mass = state.total_mass();
        let center_of_mass = if total_mass > 0.0 {
            state
                .iter()
                .fold(Vector3::zeros(), |acc, c| acc + c.center() * c.mass)
                / total_mass
        } else {
            reference
        };
        Self {
            total_mass,
            center_of_mass,
            offset: center_of_mass - reference,
        }
    }

    /// Euclidean magnitude of the offset (mm).
    pub fn offset_norm(&self) -> f64 {
        self.offset.norm()
    }

    /// Axis with the largest absolute offset.
    pub fn dominant_axis(&self) -> Axis {
        let abs = self.offset.abs();
        Axis::from_index(abs.imax()).unwrap_or(Axis::X)
    }
}
