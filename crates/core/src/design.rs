//! Design state: components, envelope, keep-out zones and version lineage.
//!
//! A [`DesignState`] is a node in the version tree of one optimization run.
//! Components are held behind [`Arc`] so that deriving a child state copies
//! pointers only; editing a component through [`DesignState::component_mut`]
//! deep-copies just that component.

use crate::geometry::{Aabb3, Axis, MountFace};
use crate::part::Part;
use crate::{Error, Result};
use nalgebra::Vector3;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Metadata key recording whether the last edit changed the state.
pub const META_LAST_EDIT: &str = "last_edit";
/// Metadata key listing ids the placement engine could not place.
pub const META_UNPLACED: &str = "unplaced";
/// Metadata key naming the operation that produced the state.
pub const META_SOURCE: &str = "source";

/// Heatsink attached to one face of a component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Heatsink {
    pub face: MountFace,
    /// Fin thickness in mm.
    pub thickness: f64,
    /// Thermal conductivity in W/(m·K).
    pub conductivity: f64,
}

/// Mounting bracket raising a component off its face.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bracket {
    /// Height in mm.
    pub height: f64,
    pub material: String,
}

/// A placed component as seen by the optimizer.
///
/// `position` is the minimum corner of the physical box (not the
/// installation footprint).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Component {
    pub id: String,
    pub position: Vector3<f64>,
    pub dims: Vector3<f64>,
    /// Rotation in degrees about (x, y, z). Tracked only; the collision
    /// shape stays axis-aligned.
    pub rotation: Vector3<f64>,
    pub mass: f64,
    pub power: f64,
    pub category: String,
    pub clearance: f64,
    /// Envelope shape tag (`"box"` for every component handled here).
    pub envelope_type: String,
    pub emissivity: f64,
    pub absorptivity: f64,
    pub coating_type: String,
    /// Contact conductance to neighbours, keyed by neighbour id (W/K).
    pub thermal_contacts: BTreeMap<String, f64>,
    pub heatsink: Option<Heatsink>,
    pub bracket: Option<Bracket>,
}

impl Component {
    /// Creates a component with default surface properties.
    pub fn new(id: impl Into<String>, position: Vector3<f64>, dims: Vector3<f64>) -> Self {
        Self {
            id: id.into(),
            position,
            dims,
            rotation: Vector3::zeros(),
            mass: 0.0,
            power: 0.0,
            category: "unknown".to_string(),
            clearance: 0.0,
            envelope_type: "box".to_string(),
            emissivity: 0.8,
            absorptivity: 0.3,
            coating_type: "default".to_string(),
            thermal_contacts: BTreeMap::new(),
            heatsink: None,
            bracket: None,
        }
    }

    /// Builds a component from a placed part, using its actual footprint.
    ///
    /// Returns `None` for unplaced parts.
    pub fn from_part(part: &Part) -> Option<Self> {
        let position = part.actual_position()?;
        let mut component = Self::new(part.id.clone(), position, part.dims);
        component.mass = part.mass;
        component.power = part.power;
        component.category = part.category.clone();
        component.clearance = part.clearance;
        Some(component)
    }

    /// Sets the mass.
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Sets the power.
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Physical bounding box.
    pub fn aabb(&self) -> Aabb3 {
        Aabb3::from_position_and_size(self.position, self.dims)
    }

    /// Geometric centre.
    pub fn center(&self) -> Vector3<f64> {
        self.position + self.dims * 0.5
    }

    /// Volume in mm^3.
    pub fn volume(&self) -> f64 {
        self.dims.x * self.dims.y * self.dims.z
    }

    /// Translates the component along `axis`.
    pub fn translate(&mut self, axis: Axis, delta: f64) {
        self.position[axis.index()] += delta;
    }
}

/// Where the outer envelope box is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EnvelopeOrigin {
    /// Outer box symmetric about the origin.
    #[default]
    Center,
    /// Outer box minimum corner at the origin.
    Corner,
}

/// The enclosure: an outer shell and the usable inner volume.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Envelope {
    pub outer: Aabb3,
    pub inner: Aabb3,
    /// Wall thickness in mm.
    pub thickness: f64,
    /// Target fill ratio used when the envelope was auto-sized.
    pub fill_ratio: f64,
    pub origin: EnvelopeOrigin,
}

impl Envelope {
    /// Creates an envelope from its outer box and wall thickness.
    pub fn new(outer: Aabb3, thickness: f64) -> Result<Self> {
        outer.validate()?;
        if !thickness.is_finite() || thickness < 0.0 {
            return Err(Error::InvalidEnvelope(format!(
                "wall thickness must be non-negative, got {}",
                thickness
            )));
        }
        let inner = outer.expand(-thickness);
        if Axis::ALL
            .iter()
            .any(|a| inner.max[a.index()] - inner.min[a.index()] <= 0.0)
        {
            return Err(Error::InvalidEnvelope(format!(
                "wall thickness {} leaves no inner volume in {:?}",
                thickness,
                outer.size().as_slice()
            )));
        }
        Ok(Self {
            outer,
            inner,
            thickness,
            fill_ratio: 1.0,
            origin: EnvelopeOrigin::Center,
        })
    }

    /// Envelope of the given outer size anchored at `origin`.
    pub fn with_size(size: Vector3<f64>, thickness: f64, origin: EnvelopeOrigin) -> Result<Self> {
        let outer = match origin {
            EnvelopeOrigin::Center => Aabb3::from_center_and_size(Vector3::zeros(), size),
            EnvelopeOrigin::Corner => Aabb3::from_position_and_size(Vector3::zeros(), size),
        };
        let mut envelope = Self::new(outer, thickness)?;
        envelope.origin = origin;
        Ok(envelope)
    }

    /// Sets the recorded fill ratio.
    pub fn with_fill_ratio(mut self, fill_ratio: f64) -> Self {
        self.fill_ratio = fill_ratio;
        self
    }

    /// Outer size.
    pub fn size(&self) -> Vector3<f64> {
        self.outer.size()
    }
}

/// A forbidden volume no component may intersect.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeepoutZone {
    pub aabb: Aabb3,
    /// Free-form tag, e.g. `"star_tracker_fov"`.
    pub tag: String,
}

impl KeepoutZone {
    pub fn new(aabb: Aabb3, tag: impl Into<String>) -> Self {
        Self {
            aabb,
            tag: tag.into(),
        }
    }
}

/// A node in the design version tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DesignState {
    /// Round that produced this state.
    pub iteration: u32,
    pub state_id: String,
    pub parent_id: Option<String>,
    /// Ordered component list, shared copy-on-write between states.
    pub components: Vec<Arc<Component>>,
    pub envelope: Envelope,
    pub keepouts: Vec<KeepoutZone>,
    pub metadata: BTreeMap<String, String>,
}

impl DesignState {
    /// Creates an empty state.
    pub fn new(state_id: impl Into<String>, envelope: Envelope) -> Self {
        Self {
            iteration: 0,
            state_id: state_id.into(),
            parent_id: None,
            components: Vec::new(),
            envelope,
            keepouts: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Initial state built from a placement run.
    ///
    /// Unplaced parts are not represented as components; their ids are
    /// recorded under [`META_UNPLACED`].
    pub fn from_packing(
        placed: &[Part],
        unplaced: &[String],
        envelope: Envelope,
        keepouts: Vec<KeepoutZone>,
    ) -> Self {
        let mut state = Self::new("state_iter_00_init", envelope).with_keepouts(keepouts);
        state.components = placed
            .iter()
            .filter_map(Component::from_part)
            .map(Arc::new)
            .collect();
        state
            .metadata
            .insert(META_SOURCE.to_string(), "packing".to_string());
        if !unplaced.is_empty() {
            state
                .metadata
                .insert(META_UNPLACED.to_string(), unplaced.join(","));
        }
        state
    }

    /// Sets the keep-out zones.
    pub fn with_keepouts(mut self, keepouts: Vec<KeepoutZone>) -> Self {
        self.keepouts = keepouts;
        self
    }

    /// Appends a component.
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(Arc::new(component));
        self
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True if there are no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterates over components in order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().map(|c| c.as_ref())
    }

    /// Index of the component with `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    /// Looks up a component by id.
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.as_ref())
    }

    /// Mutable access to a component, detaching it from any shared states.
    pub fn component_mut(&mut self, id: &str) -> Result<&mut Component> {
        let index = self
            .index_of(id)
            .ok_or_else(|| Error::UnknownComponent(id.to_string()))?;
        Ok(Arc::make_mut(&mut self.components[index]))
    }

    /// Mutable access by index.
    pub fn component_at_mut(&mut self, index: usize) -> Option<&mut Component> {
        self.components.get_mut(index).map(Arc::make_mut)
    }

    /// Derives a child state sharing all components with `self`.
    pub fn derive_child(&self, iteration: u32, state_id: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.iteration = iteration;
        child.state_id = state_id.into();
        child.parent_id = Some(self.state_id.clone());
        child.metadata.remove(META_LAST_EDIT);
        child
    }

    /// Sum of component masses (kg).
    pub fn total_mass(&self) -> f64 {
        self.iter().map(|c| c.mass).sum()
    }

    /// Sum of component power (W).
    pub fn total_power(&self) -> f64 {
        self.iter().map(|c| c.power).sum()
    }

    /// Structural fingerprint of the arrangement.
    ///
    /// Covers ids, positions, dims and rotations quantised to 1 µm, thermal
    /// attributes and the envelope size. Lineage and metadata are excluded,
    /// so two states with the same geometry hash equally.
    pub fn fingerprint(&self) -> u64 {
        fn q(value: f64) -> i64 {
            (value * 1000.0).round() as i64
        }
        fn q3(v: &Vector3<f64>) -> [i64; 3] {
            [q(v.x), q(v.y), q(v.z)]
        }

        let mut hasher = DefaultHasher::new();
        self.components.len().hash(&mut hasher);
        for c in self.iter() {
            c.id.hash(&mut hasher);
            q3(&c.position).hash(&mut hasher);
            q3(&c.dims).hash(&mut hasher);
            q3(&c.rotation).hash(&mut hasher);
            q(c.emissivity).hash(&mut hasher);
            q(c.absorptivity).hash(&mut hasher);
            c.coating_type.hash(&mut hasher);
            for (other, conductance) in &c.thermal_contacts {
                other.hash(&mut hasher);
                q(*conductance).hash(&mut hasher);
            }
            if let Some(h) = &c.heatsink {
                h.face.hash(&mut hasher);
                q(h.thickness).hash(&mut hasher);
                q(h.conductivity).hash(&mut hasher);
            }
            if let Some(b) = &c.bracket {
                q(b.height).hash(&mut hasher);
                b.material.hash(&mut hasher);
            }
        }
        q3(&self.envelope.outer.min).hash(&mut hasher);
        q3(&self.envelope.outer.max).hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn envelope() -> Envelope {
        Envelope::with_size(Vector3::new(400.0, 400.0, 400.0), 0.0, EnvelopeOrigin::Corner).unwrap()
    }

    fn state() -> DesignState {
        DesignState::new("s0", envelope())
            .with_component(
                Component::new("a", Vector3::new(0.0, 0.0, 0.0), Vector3::new(10.0, 10.0, 10.0))
                    .with_mass(2.0),
            )
            .with_component(
                Component::new("b", Vector3::new(50.0, 0.0, 0.0), Vector3::new(10.0, 10.0, 10.0))
                    .with_mass(3.0),
            )
    }

    #[test]
    fn test_envelope_inner_box() {
        let env = Envelope::with_size(Vector3::new(100.0, 100.0, 100.0), 5.0, EnvelopeOrigin::Center)
            .unwrap();
        assert_relative_eq!(env.inner.min.x, -45.0);
        assert_relative_eq!(env.inner.max.z, 45.0);
    }

    #[test]
    fn test_envelope_too_thick_walls() {
        let result = Envelope::with_size(Vector3::new(10.0, 100.0, 100.0), 5.0, EnvelopeOrigin::Center);
        assert!(matches!(result, Err(Error::InvalidEnvelope(_))));
    }

    #[test]
    fn test_child_shares_components_until_edited() {
        let parent = state();
        let mut child = parent.derive_child(1, "s1");
        assert_eq!(child.parent_id.as_deref(), Some("s0"));
        assert!(Arc::ptr_eq(&parent.components[0], &child.components[0]));

        child.component_mut("a").unwrap().translate(Axis::X, 5.0);
        assert!(!Arc::ptr_eq(&parent.components[0], &child.components[0]));
        assert!(Arc::ptr_eq(&parent.components[1], &child.components[1]));
        assert_relative_eq!(parent.component("a").unwrap().position.x, 0.0);
        assert_relative_eq!(child.component("a").unwrap().position.x, 5.0);
    }

    #[test]
    fn test_fingerprint_ignores_lineage() {
        let parent = state();
        let child = parent.derive_child(1, "s1");
        assert_eq!(parent.fingerprint(), child.fingerprint());

        let mut moved = child.clone();
        moved.component_mut("b").unwrap().translate(Axis::Y, 0.01);
        assert_ne!(parent.fingerprint(), moved.fingerprint());
    }

    #[test]
    fn test_unknown_component() {
        let mut s = state();
        assert!(matches!(s.component_mut("zzz"), Err(Error::UnknownComponent(_))));
    }

    #[test]
    fn test_from_packing_records_unplaced() {
        let placed = vec![Part::new("a", 10.0, 10.0, 10.0)
            .with_clearance(2.0)
            .with_placement(Vector3::zeros(), 0, MountFace::NegZ)];
        let s = DesignState::from_packing(&placed, &["b".to_string()], envelope(), Vec::new());
        assert_eq!(s.state_id, "state_iter_00_init");
        assert_eq!(s.len(), 1);
        assert_eq!(s.metadata.get(META_UNPLACED).map(String::as_str), Some("b"));
        assert_eq!(s.component("a").unwrap().position, Vector3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_totals() {
        let s = state();
        assert_relative_eq!(s.total_mass(), 5.0);
    }
}
