//! Physics solver interface and a closed-form reference solver.

use sat_layout_core::{Component, DesignState, Result, SimulationResult};
use sat_layout_packing::{pair_clearance, MassProperties};
use std::collections::BTreeMap;

/// External thermal/structural solver.
///
/// Implementations may block. A returned `Err` and a result with
/// `success == false` are both treated as a failed evaluation.
pub trait PhysicsSolver: Send + Sync {
    /// Simulates a design state.
    fn simulate(&self, state: &DesignState) -> Result<SimulationResult>;

    /// Human-readable solver name.
    fn name(&self) -> &str {
        "solver"
    }
}

impl<S: PhysicsSolver + ?Sized> PhysicsSolver for Box<S> {
    fn simulate(&self, state: &DesignState) -> Result<SimulationResult> {
        (**self).simulate(state)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Lumped-parameter thermal model with a CG-based structural estimate.
///
/// Each component is a single node at `ambient + P / G`, where `G` sums a
/// radiative term (emissivity times surface area), an optional heatsink
/// and any thermal contacts. Neighbours closer than `coupling_distance`
/// add a share of their own dissipation. The safety factor falls linearly
/// with the normalised height of the centre of mass.
#[derive(Debug, Clone)]
pub struct SimplifiedPhysics {
    /// Sink temperature (°C).
    pub ambient_temp: f64,
    /// Radiative conductance per m² at emissivity 1 (W/(m²·K)).
    pub radiation_coefficient: f64,
    /// Heatsink conductance per (W/(m·K)) of conductivity per mm of fin (W/K).
    pub heatsink_factor: f64,
    /// Gap below which neighbours heat each other (mm).
    pub coupling_distance: f64,
    /// Share of a touching neighbour's power dissipated through this node.
    pub coupling_gain: f64,
    /// Safety factor with the centre of mass on the floor.
    pub base_safety_factor: f64,
}

impl Default for SimplifiedPhysics {
    fn default() -> Self {
        Self {
            ambient_temp: 20.0,
            radiation_coefficient: 6.0,
            heatsink_factor: 2e-4,
            coupling_distance: 50.0,
            coupling_gain: 0.05,
            base_safety_factor: 4.0,
        }
    }
}

impl SimplifiedPhysics {
    /// Creates a solver with default coefficients.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sink temperature.
    pub fn with_ambient_temp(mut self, ambient_temp: f64) -> Self {
        self.ambient_temp = ambient_temp;
        self
    }

    /// Sets the base safety factor.
    pub fn with_base_safety_factor(mut self, factor: f64) -> Self {
        self.base_safety_factor = factor;
        self
    }

    fn conductance(&self, c: &Component) -> f64 {
        let d = c.dims * 1e-3;
        let area = 2.0 * (d.x * d.y + d.y * d.z + d.x * d.z);
        let radiative = c.emissivity * area * self.radiation_coefficient;
        let heatsink = c
            .heatsink
            .as_ref()
            .map_or(0.0, |h| h.conductivity * h.thickness * self.heatsink_factor);
        let contacts: f64 = c.thermal_contacts.values().sum();
        (radiative + heatsink + contacts).max(1e-6)
    }

    /// Node temperatures in component order (°C).
    pub fn temperatures(&self, state: &DesignState) -> Vec<f64> {
        let components: Vec<&Component> = state.iter().collect();
        let boxes: Vec<_> = components.iter().map(|c| c.aabb()).collect();

        components
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let own = c.power / self.conductance(c);
                let coupled: f64 = components
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(j, other)| {
                        let (gap, _) = pair_clearance(&boxes[i], &boxes[j]);
                        if gap < self.coupling_distance {
                            let proximity = 1.0 - gap.max(0.0) / self.coupling_distance;
                            self.coupling_gain * other.power * proximity / self.conductance(c)
                        } else {
                            0.0
                        }
                    })
                    .sum();
                self.ambient_temp + own + coupled
            })
            .collect()
    }
}

impl PhysicsSolver for SimplifiedPhysics {
    fn simulate(&self, state: &DesignState) -> Result<SimulationResult> {
        let mut metrics = BTreeMap::new();
        let temps = self.temperatures(state);
        if !temps.is_empty() {
            let max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = temps.iter().copied().fold(f64::INFINITY, f64::min);
            let avg = temps.iter().sum::<f64>() / temps.len() as f64;
            metrics.insert("max_temp".to_string(), max);
            metrics.insert("min_temp".to_string(), min);
            metrics.insert("avg_temp".to_string(), avg);
        }
        metrics.insert("total_power".to_string(), state.total_power());
        metrics.insert("total_mass".to_string(), state.total_mass());

        let mass = MassProperties::compute(state);
        let inner = &state.envelope.inner;
        let height = inner.size().z;
        let cg_height = if height > 0.0 {
            ((mass.center_of_mass.z - inner.min.z) / height).clamp(0.0, 1.0)
        } else {
            0.0
        };
        metrics.insert(
            "safety_factor".to_string(),
            self.base_safety_factor * (1.0 - 0.5 * cg_height),
        );

        Ok(SimulationResult::ok(metrics))
    }

    fn name(&self) -> &str {
        "simplified"
    }
}
