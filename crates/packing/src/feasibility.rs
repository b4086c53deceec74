//! Closed-form geometry feasibility gate.
//!
//! For each unordered pair of components the per-axis separation is
//! `|c_a - c_b| - (h_a + h_b)` (centres and half extents). When every
//! separation is negative the boxes share volume: the pair is a collision
//! and its signed clearance is the shallowest penetration, i.e. the largest
//! separation. Otherwise the separations are clamped at zero and their
//! Euclidean norm is the gap.

use nalgebra::Vector3;
use sat_layout_core::{Aabb3, DesignState};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Penetration depth below which touching boxes are not a collision (mm).
pub const COLLISION_EPS: f64 = 1e-6;

/// Signed clearance between two boxes and whether they collide.
pub fn pair_clearance(a: &Aabb3, b: &Aabb3) -> (f64, bool) {
    let sep: Vector3<f64> =
        (a.center() - b.center()).abs() - (a.half_extents() + b.half_extents());

    if sep.iter().all(|s| *s < -COLLISION_EPS) {
        (sep.max(), true)
    } else {
        (sep.map(|s| s.max(0.0)).norm(), false)
    }
}

/// Minimum signed clearance and number of colliding pairs.
///
/// Returns `f64::INFINITY` as the clearance when there are fewer than two
/// boxes.
pub fn feasibility(boxes: &[Aabb3]) -> (f64, usize) {
    let mut min_clearance = f64::INFINITY;
    let mut collisions = 0;
    for (i, a) in boxes.iter().enumerate() {
        for b in &boxes[i + 1..] {
            let (clearance, collides) = pair_clearance(a, b);
            min_clearance = min_clearance.min(clearance);
            if collides {
                collisions += 1;
            }
        }
    }
    (min_clearance, collisions)
}

/// Full geometry report for a design state.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeasibilityReport {
    /// Minimum signed clearance over all pairs (mm).
    pub min_clearance: f64,
    /// Number of colliding pairs.
    pub collision_count: usize,
    /// Colliding pairs with their (negative) clearance.
    pub collisions: Vec<(String, String, f64)>,
    /// Pairs closer than the requested clearance, with their clearance.
    pub tight_pairs: Vec<(String, String, f64)>,
    /// Components intersecting a keep-out zone, with the zone tag.
    pub keepout_intrusions: Vec<(String, String)>,
    /// Components not fully inside the envelope's inner box.
    pub out_of_envelope: Vec<String>,
}

impl FeasibilityReport {
    /// True if no pair collides, no keep-out is entered and every component
    /// is inside the envelope.
    pub fn is_collision_free(&self) -> bool {
        self.collision_count == 0
            && self.keepout_intrusions.is_empty()
            && self.out_of_envelope.is_empty()
    }

    /// True if collision free and the minimum clearance meets `min_clearance`.
    pub fn is_feasible(&self, min_clearance: f64) -> bool {
        self.is_collision_free() && self.min_clearance >= min_clearance
    }
}

/// Checks a whole design state.
///
/// `min_clearance` only selects which pairs are listed in
/// [`FeasibilityReport::tight_pairs`].
pub fn check_state(state: &DesignState, min_clearance: f64) -> FeasibilityReport {
    let items: Vec<(&str, Aabb3)> = state.iter().map(|c| (c.id.as_str(), c.aabb())).collect();

    let mut report = FeasibilityReport {
        min_clearance: f64::INFINITY,
        ..Default::default()
    };

    for (i, (id_a, a)) in items.iter().enumerate() {
        for (id_b, b) in &items[i + 1..] {
            let (clearance, collides) = pair_clearance(a, b);
            report.min_clearance = report.min_clearance.min(clearance);
            if collides {
                report.collision_count += 1;
                report
                    .collisions
                    .push((id_a.to_string(), id_b.to_string(), clearance));
            } else if clearance < min_clearance {
                report
                    .tight_pairs
                    .push((id_a.to_string(), id_b.to_string(), clearance));
            }
        }
    }

    for (id, aabb) in &items {
        for zone in &state.keepouts {
            if aabb.intersects_with_tolerance(&zone.aabb, COLLISION_EPS) {
                report
                    .keepout_intrusions
                    .push((id.to_string(), zone.tag.clone()));
            }
        }
        if !aabb.is_within(&state.envelope.inner, COLLISION_EPS) {
            report.out_of_envelope.push(id.to_string());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn boxed(min: [f64; 3], size: [f64; 3]) -> Aabb3 {
        Aabb3::from_position_and_size(Vector3::from(min), Vector3::from(size))
    }

    #[test]
    fn test_face_gap() {
        let a = boxed([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let b = boxed([15.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let (c, hit) = pair_clearance(&a, &b);
        assert!(!hit);
        assert_relative_eq!(c, 5.0);
    }

    #[test]
    fn test_diagonal_gap_is_euclidean() {
        let a = boxed([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let b = boxed([13.0, 14.0, 0.0], [10.0, 10.0, 10.0]);
        let (c, _) = pair_clearance(&a, &b);
        assert_relative_eq!(c, 5.0);
    }

    #[test]
    fn test_collision_uses_shallowest_penetration() {
        let a = boxed([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let b = boxed([8.0, 5.0, 1.0], [10.0, 10.0, 10.0]);
        let (c, hit) = pair_clearance(&a, &b);
        assert!(hit);
        assert_relative_eq!(c, -2.0);
    }

    #[test]
    fn test_touching_is_zero_clearance() {
        let a = boxed([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let b = boxed([10.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        assert_eq!(pair_clearance(&a, &b), (0.0, false));
    }

    #[test]
    fn test_single_collision_drives_minimum() {
        let boxes = vec![
            boxed([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]),
            boxed([5.0, 5.0, 5.0], [10.0, 10.0, 10.0]),
            boxed([100.0, 0.0, 0.0], [10.0, 10.0, 10.0]),
        ];
        let (min_clearance, collisions) = feasibility(&boxes);
        assert_eq!(collisions, 1);
        assert!(min_clearance < 0.0);
    }

    #[test]
    fn test_fewer_than_two_boxes() {
        assert_eq!(feasibility(&[]), (f64::INFINITY, 0));
    }
}
