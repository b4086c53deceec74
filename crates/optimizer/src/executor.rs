//! Operation executor.
//!
//! Applies parsed [`Action`]s to a design state. MOVE goes through the
//! adaptive step scaler: the requested displacement is tried at each
//! fraction of the scale ladder and the first fraction whose result passes
//! the local feasibility gate wins. Every other action is applied as given.
//!
//! The executor never fails a batch. An action that references a missing
//! component or cannot be applied is logged and skipped.

use crate::action::Action;
use crate::config::ExecutorConfig;
use log::{debug, info, warn};
use sat_layout_core::{
    Aabb3, Axis, Bracket, DesignState, Error, Heatsink, Result, META_LAST_EDIT,
};
use sat_layout_packing::{pair_clearance, LayoutEngine, COLLISION_EPS};

/// Displacements shorter than this are treated as zero (mm).
const MIN_DISPLACEMENT: f64 = 1e-9;

/// Result of applying a batch of actions.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// The edited state.
    pub state: DesignState,
    /// Descriptions of applied actions.
    pub applied: Vec<String>,
    /// Descriptions of skipped actions with the reason.
    pub skipped: Vec<String>,
    /// False if the structural fingerprint did not change.
    pub changed: bool,
}

/// Checks whether component `index` may occupy `candidate`.
///
/// Only pairs involving the component are examined: the candidate must not
/// collide with any other component, must keep at least `min_clearance`
/// from each and must stay clear of every keep-out zone.
pub fn placement_is_clear(
    state: &DesignState,
    index: usize,
    candidate: &Aabb3,
    min_clearance: f64,
) -> bool {
    let neighbours_ok = state
        .components
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .all(|(_, other)| {
            let (clearance, collides) = pair_clearance(candidate, &other.aabb());
            !collides && clearance >= min_clearance
        });
    neighbours_ok
        && state
            .keepouts
            .iter()
            .all(|zone| !candidate.intersects_with_tolerance(&zone.aabb, COLLISION_EPS))
}

/// Applies actions to design states.
#[derive(Debug, Clone, Default)]
pub struct OperationExecutor {
    config: ExecutorConfig,
    min_clearance: f64,
    engine: LayoutEngine,
}

impl OperationExecutor {
    /// Creates an executor whose MOVE gate requires `min_clearance`.
    pub fn new(config: ExecutorConfig, min_clearance: f64) -> Self {
        Self {
            config,
            min_clearance,
            engine: LayoutEngine::default(),
        }
    }

    /// Sets the layout engine used by REPACK.
    pub fn with_engine(mut self, engine: LayoutEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Clearance the MOVE gate requires.
    pub fn min_clearance(&self) -> f64 {
        self.min_clearance
    }

    /// Applies `actions` in order to a copy of `state`.
    ///
    /// The returned state carries `last_edit = changed | no_op` in its
    /// metadata.
    pub fn apply(&self, state: &DesignState, actions: &[Action]) -> ExecutionOutcome {
        let before = state.fingerprint();
        let mut next = state.clone();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for action in actions {
            match self.apply_one(&mut next, action) {
                Ok(true) => {
                    debug!("Applied {}", action);
                    applied.push(action.to_string());
                }
                Ok(false) => {
                    debug!("{} left the state unchanged", action);
                    skipped.push(format!("{}: no effect", action));
                }
                Err(e) => {
                    warn!("Skipping {}: {}", action, e);
                    skipped.push(format!("{}: {}", action, e));
                }
            }
        }

        let changed = next.fingerprint() != before;
        next.metadata.insert(
            META_LAST_EDIT.to_string(),
            if changed { "changed" } else { "no_op" }.to_string(),
        );
        ExecutionOutcome {
            state: next,
            applied,
            skipped,
            changed,
        }
    }

    /// Applies one action. `Ok(false)` means it was valid but had no effect.
    fn apply_one(&self, state: &mut DesignState, action: &Action) -> Result<bool> {
        for id in action.referenced_components() {
            if state.index_of(id).is_none() {
                return Err(Error::UnknownComponent(id.to_string()));
            }
        }

        match action {
            Action::Move {
                target,
                axis,
                delta,
            } => Ok(self.adaptive_move(state, target, *axis, *delta)?.is_some()),
            Action::Rotate {
                target,
                axis,
                angle,
            } => {
                let c = state.component_mut(target)?;
                let i = axis.index();
                c.rotation[i] = (c.rotation[i] + angle).rem_euclid(360.0);
                Ok(true)
            }
            Action::Swap { target, other } => {
                if target == other {
                    return Ok(false);
                }
                let center_a = state.component(target).map(|c| c.center());
                let center_b = state.component(other).map(|c| c.center());
                let (Some(center_a), Some(center_b)) = (center_a, center_b) else {
                    return Err(Error::UnknownComponent(format!("{} or {}", target, other)));
                };
                let a = state.component_mut(target)?;
                a.position = center_b - a.dims * 0.5;
                let b = state.component_mut(other)?;
                b.position = center_a - b.dims * 0.5;
                Ok(true)
            }
            Action::Deform {
                target,
                kind,
                magnitude,
            } => {
                let c = state.component_mut(target)?;
                let dims = c.dims + kind.growth(*magnitude);
                if dims.iter().any(|d| *d <= 0.0) {
                    return Err(Error::InvalidGeometry(format!(
                        "deforming {} would give non-positive dimensions",
                        target
                    )));
                }
                c.dims = dims;
                Ok(true)
            }
            Action::Repack { clearance } => {
                let clearance = clearance.unwrap_or(self.config.default_repack_clearance);
                info!("Repacking {} components with {:.1} mm clearance", state.len(), clearance);
                let repacked = self.engine.repack(state, clearance);
                state.components = repacked.components;
                Ok(true)
            }
            Action::ModifyCoating {
                target,
                emissivity,
                absorptivity,
                coating,
            } => {
                let c = state.component_mut(target)?;
                if let Some(e) = emissivity {
                    c.emissivity = *e;
                }
                if let Some(a) = absorptivity {
                    c.absorptivity = *a;
                }
                c.coating_type = coating.clone();
                Ok(true)
            }
            Action::SetThermalContact {
                target,
                other,
                conductance,
            } => {
                if target == other {
                    return Err(Error::ConfigError(format!(
                        "{} cannot be in contact with itself",
                        target
                    )));
                }
                state
                    .component_mut(target)?
                    .thermal_contacts
                    .insert(other.clone(), *conductance);
                state
                    .component_mut(other)?
                    .thermal_contacts
                    .insert(target.clone(), *conductance);
                Ok(true)
            }
            Action::AddHeatsink {
                target,
                face,
                thickness,
                conductivity,
            } => {
                state.component_mut(target)?.heatsink = Some(Heatsink {
                    face: *face,
                    thickness: *thickness,
                    conductivity: *conductivity,
                });
                Ok(true)
            }
            Action::AddBracket {
                target,
                height,
                material,
            } => {
                let c = state.component_mut(target)?;
                let previous = c.bracket.as_ref().map_or(0.0, |b| b.height);
                c.translate(Axis::Z, height - previous);
                c.bracket = Some(Bracket {
                    height: *height,
                    material: material.clone(),
                });
                Ok(true)
            }
            Action::Align {
                reference,
                axis,
                members,
            } => {
                let i = axis.index();
                let target = state
                    .component(reference)
                    .map(|c| c.center()[i])
                    .ok_or_else(|| Error::UnknownComponent(reference.clone()))?;
                for id in members.iter().filter(|m| *m != reference) {
                    let c = state.component_mut(id)?;
                    c.position[i] = target - c.dims[i] * 0.5;
                }
                Ok(true)
            }
            Action::ChangeEnvelope { target, dims } => {
                let c = state.component_mut(target)?;
                let center = c.center();
                c.dims = *dims;
                c.position = center - dims * 0.5;
                Ok(true)
            }
            Action::Unknown { tag } => Err(Error::ConfigError(format!("unknown op '{}'", tag))),
        }
    }

    /// Moves `target` along `axis` by the largest ladder fraction of `delta`
    /// that passes [`placement_is_clear`].
    ///
    /// Returns the accepted scale, or `None` if the move was zero-length or
    /// every scale failed. The state is untouched in the `None` case.
    pub fn adaptive_move(
        &self,
        state: &mut DesignState,
        target: &str,
        axis: Axis,
        delta: f64,
    ) -> Result<Option<f64>> {
        let index = state
            .index_of(target)
            .ok_or_else(|| Error::UnknownComponent(target.to_string()))?;
        if delta.abs() < MIN_DISPLACEMENT {
            debug!("Zero-length move of {} ignored", target);
            return Ok(None);
        }

        let current = state.components[index].aabb();
        for &scale in &self.config.scale_ladder {
            let step = delta * scale;
            let candidate = current.translated(&(axis.unit() * step));
            if placement_is_clear(state, index, &candidate, self.min_clearance) {
                if let Some(c) = state.component_at_mut(index) {
                    c.translate(axis, step);
                }
                if scale < 1.0 {
                    info!(
                        "Move of {} along {} scaled to {:.0}% ({:+.2} mm)",
                        target,
                        axis,
                        scale * 100.0,
                        step
                    );
                }
                return Ok(Some(scale));
            }
            debug!("Move of {} by {:+.2} mm blocked", target, step);
        }

        warn!(
            "Move of {} by {:+.1} mm along {} rejected at every scale",
            target, delta, axis
        );
        Ok(None)
    }
}
