//! Placeable parts and the asymmetric clearance model.

use crate::geometry::{Aabb3, MountFace};
use crate::{Error, Result};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid rectangular part from the bill of materials.
///
/// Before placement only the intrinsic properties are set. The placement
/// engine attaches `position` (minimum corner of the *installation*
/// footprint), `bin_index` and `mount_face` through [`Part::with_placement`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Part {
    /// Unique identifier.
    pub id: String,
    /// Intrinsic dimensions (x, y, z) in mm.
    pub dims: Vector3<f64>,
    /// Mass in kg.
    pub mass: f64,
    /// Dissipated power in W.
    pub power: f64,
    /// Category label (payload, avionics, power, ...).
    pub category: String,
    /// Required separation margin in mm.
    pub clearance: f64,

    position: Option<Vector3<f64>>,
    bin_index: Option<usize>,
    mount_face: Option<MountFace>,
}

impl Part {
    /// Creates an unplaced part with the given intrinsic dimensions.
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            id: id.into(),
            dims: Vector3::new(x, y, z),
            mass: 0.0,
            power: 0.0,
            category: "unknown".to_string(),
            clearance: 0.0,
            position: None,
            bin_index: None,
            mount_face: None,
        }
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

    /// Sets the clearance margin.
    pub fn with_clearance(mut self, clearance: f64) -> Self {
        self.clearance = clearance;
        self
    }

    /// Returns a copy of this part placed at `position` on `face` of bin `bin_index`.
    pub fn with_placement(&self, position: Vector3<f64>, bin_index: usize, face: MountFace) -> Self {
        let mut placed = self.clone();
        placed.position = Some(position);
        placed.bin_index = Some(bin_index);
        placed.mount_face = Some(face);
        placed
    }

    /// Minimum corner of the installation footprint, if placed.
    pub fn position(&self) -> Option<Vector3<f64>> {
        self.position
    }

    /// Index of the bin the part was placed in.
    pub fn bin_index(&self) -> Option<usize> {
        self.bin_index
    }

    /// Face the part is mounted against.
    pub fn mount_face(&self) -> Option<MountFace> {
        self.mount_face
    }

    /// True once the placement engine has assigned a position.
    pub fn is_placed(&self) -> bool {
        self.position.is_some() && self.mount_face.is_some()
    }

    /// Intrinsic volume.
    pub fn volume(&self) -> f64 {
        self.dims.x * self.dims.y * self.dims.z
    }

    /// Validates dimensions, mass and clearance.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::invalid_part(&self.id, "empty id"));
        }
        if self.dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(Error::invalid_part(
                &self.id,
                format!("dimensions must be positive, got {:?}", self.dims.as_slice()),
            ));
        }
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(Error::invalid_part(&self.id, "mass must be non-negative"));
        }
        if !self.clearance.is_finite() || self.clearance < 0.0 {
            return Err(Error::invalid_part(&self.id, "clearance must be non-negative"));
        }
        Ok(())
    }

    /// Installation dimensions when mounted on `face`.
    ///
    /// Full clearance is added on the two in-plane axes and half clearance
    /// along the mounting axis, so parts mounted on opposing faces of the same
    /// gap share the clearance budget.
    pub fn install_dims(&self, face: MountFace) -> Vector3<f64> {
        let mut margin = Vector3::repeat(self.clearance);
        margin[face.axis().index()] = self.clearance / 2.0;
        self.dims + margin
    }

    /// Installation footprint, if placed.
    pub fn install_aabb(&self) -> Option<Aabb3> {
        let position = self.position?;
        let face = self.mount_face?;
        Some(Aabb3::from_position_and_size(position, self.install_dims(face)))
    }

    /// Minimum corner of the physical part inside its installation footprint.
    ///
    /// The part sits flush with the wall on negative faces and half a
    /// clearance off it on positive faces; on the in-plane axes it is offset
    /// by the full clearance.
    pub fn actual_position(&self) -> Option<Vector3<f64>> {
        let position = self.position?;
        let face = self.mount_face?;
        let mut offset = Vector3::repeat(self.clearance);
        offset[face.axis().index()] = if face.is_positive() {
            self.clearance / 2.0
        } else {
            0.0
        };
        Some(position + offset)
    }

    /// Physical footprint, if placed.
    pub fn actual_aabb(&self) -> Option<Aabb3> {
        self.actual_position()
            .map(|p| Aabb3::from_position_and_size(p, self.dims))
    }

    /// Centre of the mounting face of the installed box.
    pub fn mount_point(&self) -> Option<Vector3<f64>> {
        let install = self.install_aabb()?;
        let face = self.mount_face?;
        let axis = face.axis().index();
        let mut point = install.center();
        point[axis] = if face.is_positive() {
            install.max[axis]
        } else {
            install.min[axis]
        };
        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn battery() -> Part {
        Part::new("battery", 200.0, 150.0, 100.0)
            .with_mass(5.0)
            .with_clearance(10.0)
    }

    #[test]
    fn test_install_dims_asymmetric() {
        let p = battery();
        let d = p.install_dims(MountFace::NegZ);
        assert_relative_eq!(d.x, 210.0);
        assert_relative_eq!(d.y, 160.0);
        assert_relative_eq!(d.z, 105.0);

        let d = p.install_dims(MountFace::PosX);
        assert_relative_eq!(d.x, 205.0);
        assert_relative_eq!(d.y, 160.0);
    }

    #[test]
    fn test_actual_position_negative_face() {
        let p = battery().with_placement(Vector3::new(0.0, 0.0, 0.0), 0, MountFace::NegZ);
        let actual = p.actual_position().unwrap();
        assert_eq!(actual, Vector3::new(10.0, 10.0, 0.0));
        // The physical box never leaves the installation footprint.
        assert!(p
            .actual_aabb()
            .unwrap()
            .is_within(&p.install_aabb().unwrap(), 1e-9));
    }

    #[test]
    fn test_actual_position_positive_face() {
        let p = battery().with_placement(Vector3::new(0.0, 0.0, 0.0), 0, MountFace::PosZ);
        let actual = p.actual_position().unwrap();
        assert_eq!(actual, Vector3::new(10.0, 10.0, 5.0));
        let install = p.install_aabb().unwrap();
        assert_relative_eq!(p.actual_aabb().unwrap().max.z, install.max.z);
    }

    #[test]
    fn test_mount_point_on_face() {
        let p = Part::new("p", 10.0, 10.0, 10.0).with_placement(
            Vector3::new(0.0, 0.0, 0.0),
            0,
            MountFace::PosX,
        );
        assert_eq!(p.mount_point().unwrap(), Vector3::new(10.0, 5.0, 5.0));
    }

    #[test]
    fn test_unplaced_part_has_no_footprint() {
        let p = battery();
        assert!(!p.is_placed());
        assert!(p.actual_aabb().is_none());
        assert!(p.mount_point().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_dims() {
        assert!(Part::new("bad", 0.0, 1.0, 1.0).validate().is_err());
        assert!(Part::new("", 1.0, 1.0, 1.0).validate().is_err());
        assert!(battery().validate().is_ok());
    }
}
