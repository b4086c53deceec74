//! AABB space partitioner.
//!
//! Splits an enclosure into disjoint free boxes ("bins") around a set of
//! keep-out boxes by repeated six-face subtraction.

use log::debug;
use sat_layout_core::{Aabb3, VOLUME_EPSILON};

/// Subtracts `keepout` from `bin`.
///
/// Returns `[bin]` unchanged when the boxes do not overlap. Otherwise the
/// intersection `I` is cut out and up to six slabs remain:
///
/// - left and right of `I` on X, spanning the whole bin in Y and Z;
/// - front and back of `I` on Y, restricted to the X span of `I`;
/// - below and above `I` on Z, restricted to the X and Y span of `I`.
///
/// The slabs are pairwise disjoint and together with `I` reconstruct `bin`.
/// Slabs with volume at or below [`VOLUME_EPSILON`] are dropped.
pub fn subtract_box(bin: &Aabb3, keepout: &Aabb3) -> Vec<Aabb3> {
    let Some(cut) = bin.intersection(keepout) else {
        return vec![*bin];
    };

    let (a, i) = (bin, cut);
    let candidates = [
        // X slabs: full Y/Z extent of the bin.
        Aabb3::from_arrays(
            [a.min.x, a.min.y, a.min.z],
            [i.min.x, a.max.y, a.max.z],
        ),
        Aabb3::from_arrays(
            [i.max.x, a.min.y, a.min.z],
            [a.max.x, a.max.y, a.max.z],
        ),
        // Y slabs: X extent of the intersection.
        Aabb3::from_arrays(
            [i.min.x, a.min.y, a.min.z],
            [i.max.x, i.min.y, a.max.z],
        ),
        Aabb3::from_arrays(
            [i.min.x, i.max.y, a.min.z],
            [i.max.x, a.max.y, a.max.z],
        ),
        // Z slabs: X/Y extent of the intersection.
        Aabb3::from_arrays(
            [i.min.x, i.min.y, a.min.z],
            [i.max.x, i.max.y, i.min.z],
        ),
        Aabb3::from_arrays(
            [i.min.x, i.min.y, i.max.z],
            [i.max.x, i.max.y, a.max.z],
        ),
    ];

    candidates
        .into_iter()
        .filter(|slab| slab.volume() > VOLUME_EPSILON)
        .collect()
}

/// Computes the free bins of `enclosure` around `keepouts`.
///
/// Bins whose shortest edge is below `min_edge` are discarded after all
/// keep-outs have been processed. An enclosure fully covered by keep-outs
/// yields an empty list.
pub fn partition(enclosure: &Aabb3, keepouts: &[Aabb3], min_edge: f64) -> Vec<Aabb3> {
    let mut bins = vec![*enclosure];

    for keepout in keepouts {
        bins = bins
            .iter()
            .flat_map(|bin| subtract_box(bin, keepout))
            .collect();
    }

    let before = bins.len();
    bins.retain(|b| b.min_edge() >= min_edge);

    debug!(
        "Partitioned enclosure around {} keep-outs: {} bins ({} slivers dropped)",
        keepouts.len(),
        bins.len(),
        before - bins.len()
    );
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube(min: f64, max: f64) -> Aabb3 {
        Aabb3::from_arrays([min; 3], [max; 3])
    }

    #[test]
    fn test_disjoint_keepout_is_identity() {
        let bin = cube(0.0, 10.0);
        let keepout = cube(20.0, 30.0);
        assert_eq!(subtract_box(&bin, &keepout), vec![bin]);
    }

    #[test]
    fn test_centered_keepout_six_slabs() {
        let bin = cube(0.0, 30.0);
        let keepout = cube(10.0, 20.0);
        let slabs = subtract_box(&bin, &keepout);
        assert_eq!(slabs.len(), 6);

        let total: f64 = slabs.iter().map(Aabb3::volume).sum();
        assert_relative_eq!(total + keepout.volume(), bin.volume());

        for (i, a) in slabs.iter().enumerate() {
            assert!(!a.intersects(&keepout));
            for b in &slabs[i + 1..] {
                assert!(!a.intersects(b));
            }
        }
    }

    #[test]
    fn test_corner_keepout_drops_empty_slabs() {
        let bin = cube(0.0, 10.0);
        let keepout = cube(-5.0, 5.0);
        let slabs = subtract_box(&bin, &keepout);
        assert_eq!(slabs.len(), 3);
        let total: f64 = slabs.iter().map(Aabb3::volume).sum();
        assert_relative_eq!(total, 1000.0 - 125.0);
    }

    #[test]
    fn test_full_cover_yields_no_bins() {
        let bins = partition(&cube(0.0, 10.0), &[cube(-1.0, 11.0)], 0.0);
        assert!(bins.is_empty());
    }

    #[test]
    fn test_slivers_are_discarded() {
        // Leaves a 2 mm slab on +X.
        let keepout = Aabb3::from_arrays([-1.0, -1.0, -1.0], [98.0, 101.0, 101.0]);
        let bins = partition(&cube(0.0, 100.0), &[keepout], 5.0);
        assert!(bins.is_empty());
        let bins = partition(&cube(0.0, 100.0), &[keepout], 1.0);
        assert_eq!(bins.len(), 1);
    }
}
