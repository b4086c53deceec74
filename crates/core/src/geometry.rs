//! Axis-aligned boxes, axes and mounting faces.

use crate::{Error, Result};
use nalgebra::Vector3;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Volume below which a box is treated as empty (mm^3).
pub const VOLUME_EPSILON: f64 = 1e-6;

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Returns the vector index of this axis.
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Returns the axis for a vector index.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            _ => None,
        }
    }

    /// Unit vector along this axis.
    pub fn unit(self) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        v[self.index()] = 1.0;
        v
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
        };
        f.write_str(s)
    }
}

impl FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            "Z" => Ok(Self::Z),
            other => Err(Error::ConfigError(format!("unknown axis '{}'", other))),
        }
    }
}

/// One of the six faces of a box a part can be mounted against.
///
/// Face indices follow the convention `0: -X, 1: +X, 2: -Y, 3: +Y, 4: -Z, 5: +Z`,
/// so the mounting axis is `index / 2` and odd indices face the positive direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MountFace {
    NegX,
    PosX,
    NegY,
    PosY,
    NegZ,
    PosZ,
}

impl MountFace {
    /// All faces in index order.
    pub const ALL: [MountFace; 6] = [
        MountFace::NegX,
        MountFace::PosX,
        MountFace::NegY,
        MountFace::PosY,
        MountFace::NegZ,
        MountFace::PosZ,
    ];

    /// Returns the face index (0..6).
    pub fn index(self) -> usize {
        match self {
            Self::NegX => 0,
            Self::PosX => 1,
            Self::NegY => 2,
            Self::PosY => 3,
            Self::NegZ => 4,
            Self::PosZ => 5,
        }
    }

    /// Returns the face for an index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The axis normal to this face.
    pub fn axis(self) -> Axis {
        match self {
            Self::NegX | Self::PosX => Axis::X,
            Self::NegY | Self::PosY => Axis::Y,
            Self::NegZ | Self::PosZ => Axis::Z,
        }
    }

    /// True for `+X`, `+Y` and `+Z`.
    pub fn is_positive(self) -> bool {
        self.index() % 2 == 1
    }

    /// The two in-plane axes `(u, v)` of this face.
    pub fn plane_axes(self) -> (Axis, Axis) {
        match self.axis() {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

impl fmt::Display for MountFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_positive() { '+' } else { '-' };
        write!(f, "{}{}", sign, self.axis())
    }
}

impl FromStr for MountFace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_uppercase();
        let (positive, axis) = match s.as_bytes().first() {
            Some(b'+') => (true, &s[1..]),
            Some(b'-') => (false, &s[1..]),
            _ => (true, s.as_str()),
        };
        let axis: Axis = axis.parse()?;
        let face = match (axis, positive) {
            (Axis::X, false) => Self::NegX,
            (Axis::X, true) => Self::PosX,
            (Axis::Y, false) => Self::NegY,
            (Axis::Y, true) => Self::PosY,
            (Axis::Z, false) => Self::NegZ,
            (Axis::Z, true) => Self::PosZ,
        };
        Ok(face)
    }
}

/// Axis-aligned bounding box in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb3 {
    /// Minimum corner (x, y, z).
    pub min: Vector3<f64>,
    /// Maximum corner (x, y, z).
    pub max: Vector3<f64>,
}

impl Aabb3 {
    /// Creates a new box from its corners.
    pub fn new(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        Self { min, max }
    }

    /// Creates a box from corner arrays.
    pub fn from_arrays(min: [f64; 3], max: [f64; 3]) -> Self {
        Self::new(Vector3::from(min), Vector3::from(max))
    }

    /// Creates a box from its minimum corner and size.
    pub fn from_position_and_size(position: Vector3<f64>, size: Vector3<f64>) -> Self {
        Self::new(position, position + size)
    }

    /// Creates a box centred at `center` with the given size.
    pub fn from_center_and_size(center: Vector3<f64>, size: Vector3<f64>) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    /// Checks that `min <= max` on every axis and all coordinates are finite.
    pub fn validate(&self) -> Result<()> {
        for axis in Axis::ALL {
            let i = axis.index();
            if !self.min[i].is_finite() || !self.max[i].is_finite() {
                return Err(Error::InvalidGeometry(format!(
                    "non-finite coordinate on axis {}",
                    axis
                )));
            }
            if self.min[i] > self.max[i] {
                return Err(Error::InvalidGeometry(format!(
                    "inverted box on axis {}: min {} > max {}",
                    axis, self.min[i], self.max[i]
                )));
            }
        }
        Ok(())
    }

    /// Edge lengths.
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Half edge lengths.
    pub fn half_extents(&self) -> Vector3<f64> {
        self.size() * 0.5
    }

    /// Geometric centre.
    pub fn center(&self) -> Vector3<f64> {
        (self.min + self.max) * 0.5
    }

    /// Volume of the box.
    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Shortest edge length.
    pub fn min_edge(&self) -> f64 {
        self.size().min()
    }

    /// Checks if two boxes share interior volume (touching faces do not count).
    pub fn intersects(&self, other: &Aabb3) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Like [`Aabb3::intersects`] but ignores overlaps no deeper than `eps` on any axis.
    pub fn intersects_with_tolerance(&self, other: &Aabb3, eps: f64) -> bool {
        self.min.x < other.max.x - eps
            && other.min.x < self.max.x - eps
            && self.min.y < other.max.y - eps
            && other.min.y < self.max.y - eps
            && self.min.z < other.max.z - eps
            && other.min.z < self.max.z - eps
    }

    /// Intersection box, if the boxes overlap.
    pub fn intersection(&self, other: &Aabb3) -> Option<Aabb3> {
        if !self.intersects(other) {
            return None;
        }
        Some(Aabb3::new(self.min.sup(&other.min), self.max.inf(&other.max)))
    }

    /// Checks if this box lies entirely inside `other` (within `eps`).
    pub fn is_within(&self, other: &Aabb3, eps: f64) -> bool {
        Axis::ALL.iter().all(|a| {
            let i = a.index();
            self.min[i] >= other.min[i] - eps && self.max[i] <= other.max[i] + eps
        })
    }

    /// Checks if a point lies inside or on the boundary.
    pub fn contains_point(&self, point: &Vector3<f64>) -> bool {
        Axis::ALL.iter().all(|a| {
            let i = a.index();
            point[i] >= self.min[i] && point[i] <= self.max[i]
        })
    }

    /// Returns this box moved by `offset`.
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self::new(self.min + offset, self.max + offset)
    }

    /// Expands this box by a margin on all sides (negative shrinks).
    pub fn expand(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self::new(self.min - m, self.max + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_derived_values() {
        let b = Aabb3::from_arrays([0.0, 0.0, 0.0], [10.0, 20.0, 5.0]);
        assert_relative_eq!(b.volume(), 1000.0);
        assert_relative_eq!(b.min_edge(), 5.0);
        assert_eq!(b.center(), Vector3::new(5.0, 10.0, 2.5));
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_inverted_box_is_rejected() {
        let b = Aabb3::from_arrays([1.0, 0.0, 0.0], [0.0, 1.0, 1.0]);
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_touching_boxes_do_not_intersect() {
        let a = Aabb3::from_arrays([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let b = Aabb3::from_arrays([10.0, 0.0, 0.0], [20.0, 10.0, 10.0]);
        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_intersection_box() {
        let a = Aabb3::from_arrays([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let b = Aabb3::from_arrays([5.0, 5.0, 5.0], [20.0, 20.0, 20.0]);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Aabb3::from_arrays([5.0, 5.0, 5.0], [10.0, 10.0, 10.0]));
    }

    #[test]
    fn test_mount_face_conventions() {
        assert_eq!(MountFace::from_index(4), Some(MountFace::NegZ));
        assert_eq!(MountFace::PosY.axis(), Axis::Y);
        assert!(MountFace::PosX.is_positive());
        assert!(!MountFace::NegZ.is_positive());
        assert_eq!(MountFace::NegZ.plane_axes(), (Axis::X, Axis::Y));
        assert_eq!("-z".parse::<MountFace>().unwrap(), MountFace::NegZ);
        assert_eq!("+Y".parse::<MountFace>().unwrap(), MountFace::PosY);
        assert_eq!(MountFace::PosX.to_string(), "+X");
    }

    #[test]
    fn test_axis_parse() {
        assert_eq!(" y ".parse::<Axis>().unwrap(), Axis::Y);
        assert!("W".parse::<Axis>().is_err());
    }
}
