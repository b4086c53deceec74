//! Layout engine: envelope, partition and packing in one call.

use crate::config::{EnvelopeConfig, PackingConfig};
use crate::envelope::build_envelope;
use crate::packer::{Packer, PackingResult};
use crate::partition::partition;
use log::{info, warn};
use sat_layout_core::{Aabb3, DesignState, Envelope, KeepoutZone, Part, Result};

/// Builds initial layouts and re-packs existing ones.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    envelope_config: EnvelopeConfig,
    packing_config: PackingConfig,
    keepouts: Vec<KeepoutZone>,
}

impl LayoutEngine {
    /// Creates an engine.
    pub fn new(envelope_config: EnvelopeConfig, packing_config: PackingConfig) -> Self {
        Self {
            envelope_config,
            packing_config,
            keepouts: Vec::new(),
        }
    }

    /// Sets keep-out zones.
    pub fn with_keepouts(mut self, keepouts: Vec<KeepoutZone>) -> Self {
        self.keepouts = keepouts;
        self
    }

    pub fn packing_config(&self) -> &PackingConfig {
        &self.packing_config
    }

    /// Free bins of `envelope`'s inner box around `keepouts`.
    pub fn bins(&self, envelope: &Envelope, keepouts: &[KeepoutZone]) -> Vec<Aabb3> {
        let boxes: Vec<Aabb3> = keepouts.iter().map(|k| k.aabb).collect();
        partition(&envelope.inner, &boxes, self.packing_config.min_bin_edge)
    }

    /// Builds the initial design state for `parts`.
    pub fn generate_layout(&self, parts: &[Part]) -> Result<(DesignState, PackingResult)> {
        for part in parts {
            part.validate()?;
        }
        let envelope = build_envelope(&self.envelope_config, parts)?;
        let bins = self.bins(&envelope, &self.keepouts);
        let result = Packer::new(self.packing_config.clone()).pack(parts, &bins);

        let state = DesignState::from_packing(
            &result.placed,
            &result.unplaced_ids(),
            envelope,
            self.keepouts.clone(),
        );
        info!(
            "Initial layout: {} components placed, {} unplaced",
            state.len(),
            result.unplaced.len()
        );
        Ok((state, result))
    }

    /// Re-packs the components of `state` from scratch with `clearance`.
    ///
    /// Component attributes other than the position are kept. Components
    /// the packer cannot place keep their old position.
    pub fn repack(&self, state: &DesignState, clearance: f64) -> DesignState {
        let parts: Vec<Part> = state
            .iter()
            .map(|c| {
                Part::new(c.id.clone(), c.dims.x, c.dims.y, c.dims.z)
                    .with_mass(c.mass)
                    .with_power(c.power)
                    .with_category(c.category.clone())
                    .with_clearance(c.clearance.max(clearance))
            })
            .collect();

        let bins = self.bins(&state.envelope, &state.keepouts);
        let config = self.packing_config.clone().with_clearance(clearance);
        let result = Packer::new(config).pack(&parts, &bins);
        if !result.all_placed() {
            warn!(
                "Repack left {} components at their old position",
                result.unplaced.len()
            );
        }

        let mut next = state.clone();
        for part in &result.placed {
            let (Some(index), Some(position)) = (next.index_of(&part.id), part.actual_position())
            else {
                continue;
            };
            if let Some(component) = next.component_at_mut(index) {
                component.position = position;
            }
        }
        next
    }
}
