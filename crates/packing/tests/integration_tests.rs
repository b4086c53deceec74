//! Integration tests for sat-layout-packing.

use sat_layout_core::{Aabb3, Component, DesignState, Envelope, EnvelopeOrigin, KeepoutZone, Part, Vector3};
use sat_layout_packing::{
    check_state, compute_overlap_count, feasibility, partition, EnvelopeConfig, LayoutEngine,
    Packer, PackingConfig,
};

fn enclosure() -> Aabb3 {
    Aabb3::from_arrays([0.0; 3], [400.0; 3])
}

mod partition_tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_centered_keepout_volume_is_conserved() {
        let keepout = Aabb3::from_arrays([150.0; 3], [250.0; 3]);
        let bins = partition(&enclosure(), &[keepout], 0.0);

        let total: f64 = bins.iter().map(Aabb3::volume).sum();
        assert_relative_eq!(total, enclosure().volume() - keepout.volume(), max_relative = 1e-12);
        for bin in &bins {
            assert!(!bin.intersects(&keepout));
            assert!(bin.validate().is_ok());
        }
    }

    #[test]
    fn test_overlapping_keepouts_reconstruct_enclosure() {
        let keepouts = [
            Aabb3::from_arrays([-50.0, 100.0, 100.0], [120.0, 300.0, 200.0]),
            Aabb3::from_arrays([100.0, 250.0, 150.0], [220.0, 450.0, 420.0]),
            Aabb3::from_arrays([300.0, 0.0, 0.0], [400.0, 50.0, 50.0]),
        ];
        let bins = partition(&enclosure(), &keepouts, 0.0);

        // Bins are pairwise disjoint and clear of every keep-out.
        for (i, a) in bins.iter().enumerate() {
            for k in &keepouts {
                assert!(!a.intersects(k));
            }
            for b in &bins[i + 1..] {
                assert!(!a.intersects(b));
            }
        }

        // Free volume plus covered volume equals the enclosure. The covered
        // volume is measured by sampling cell centres on a 10 mm grid.
        let free: f64 = bins.iter().map(Aabb3::volume).sum();
        let mut covered_cells = 0usize;
        for i in 0..40 {
            for j in 0..40 {
                for k in 0..40 {
                    let p = Vector3::new(5.0 + 10.0 * i as f64, 5.0 + 10.0 * j as f64, 5.0 + 10.0 * k as f64);
                    if keepouts.iter().any(|b| b.contains_point(&p)) {
                        covered_cells += 1;
                    }
                }
            }
        }
        assert_relative_eq!(free + covered_cells as f64 * 1000.0, enclosure().volume(), max_relative = 1e-9);
    }
}

mod packing_tests {
    use super::*;

    fn bom() -> Vec<Part> {
        (0..12)
            .map(|i| {
                Part::new(format!("unit_{:02}", i + 1), 60.0 + 5.0 * i as f64, 50.0, 40.0)
                    .with_mass(1.0 + i as f64 * 0.1)
            })
            .collect()
    }

    #[test]
    fn test_install_footprints_never_overlap_around_keepout() {
        let keepout = Aabb3::from_arrays([150.0; 3], [250.0; 3]);
        let bins = partition(&enclosure(), &[keepout], 5.0);
        let result = Packer::new(PackingConfig::new().with_attempts(5)).pack(&bom(), &bins);

        assert_eq!(result.overlap_count, 0);
        assert_eq!(compute_overlap_count(&result.placed), 0);
        assert_eq!(result.placed.len() + result.unplaced.len(), 12);
        for part in &result.placed {
            let footprint = part.install_aabb().unwrap();
            assert!(!footprint.intersects(&keepout));
            let bin = bins[part.bin_index().unwrap()];
            assert!(footprint.is_within(&bin, 1e-6));
        }
    }

    #[test]
    fn test_infeasible_bom_is_a_normal_result() {
        let parts: Vec<Part> = (0..30)
            .map(|i| Part::new(format!("brick_{}", i), 150.0, 150.0, 150.0))
            .collect();
        let result = Packer::default().pack(&parts, &[enclosure()]);
        assert!(!result.unplaced.is_empty());
        assert_eq!(result.overlap_count, 0);
    }
}

mod feasibility_tests {
    use super::*;

    fn state(components: Vec<Component>) -> DesignState {
        let env = Envelope::with_size(Vector3::new(400.0, 400.0, 400.0), 0.0, EnvelopeOrigin::Corner).unwrap();
        components
            .into_iter()
            .fold(DesignState::new("s", env), |s, c| s.with_component(c))
    }

    #[test]
    fn test_feasibility_is_order_independent() {
        let boxes = vec![
            Aabb3::from_arrays([0.0; 3], [10.0; 3]),
            Aabb3::from_arrays([12.0, 0.0, 0.0], [22.0, 10.0, 10.0]),
            Aabb3::from_arrays([5.0, 5.0, 5.0], [15.0, 15.0, 15.0]),
            Aabb3::from_arrays([100.0; 3], [120.0; 3]),
        ];
        let mut reversed = boxes.clone();
        reversed.reverse();
        assert_eq!(feasibility(&boxes), feasibility(&reversed));
    }

    #[test]
    fn test_moving_apart_never_reduces_clearance() {
        let a = Aabb3::from_arrays([0.0; 3], [10.0; 3]);
        let mut last = f64::NEG_INFINITY;
        for step in 0..20 {
            let offset = Vector3::new(5.0 + step as f64 * 3.0, 2.0, 0.0);
            let b = a.translated(&offset);
            let (clearance, _) = feasibility(&[a, b]);
            assert!(clearance >= last);
            last = clearance;
        }
    }

    #[test]
    fn test_keepout_and_envelope_violations() {
        let mut s = state(vec![
            Component::new("cam", Vector3::new(10.0, 10.0, 10.0), Vector3::new(50.0, 50.0, 50.0)),
            Component::new("wide", Vector3::new(380.0, 0.0, 0.0), Vector3::new(50.0, 50.0, 50.0)),
        ]);
        s.keepouts.push(KeepoutZone::new(
            Aabb3::from_arrays([40.0, 40.0, 40.0], [100.0, 100.0, 100.0]),
            "fov",
        ));
        let report = check_state(&s, 3.0);
        assert_eq!(report.keepout_intrusions, vec![("cam".to_string(), "fov".to_string())]);
        assert_eq!(report.out_of_envelope, vec!["wide".to_string()]);
        assert!(!report.is_collision_free());
    }
}

mod engine_tests {
    use super::*;

    #[test]
    fn test_layout_respects_keepouts() {
        let keepout = KeepoutZone::new(Aabb3::from_arrays([-60.0; 3], [60.0; 3]), "antenna");
        let engine = LayoutEngine::new(
            EnvelopeConfig::new().with_outer_size(600.0, 600.0, 600.0).with_thickness(10.0),
            PackingConfig::new().with_attempts(4),
        )
        .with_keepouts(vec![keepout]);

        let parts = vec![
            Part::new("battery", 200.0, 150.0, 100.0).with_mass(5.0),
            Part::new("payload", 180.0, 180.0, 120.0).with_mass(8.0),
            Part::new("obc", 100.0, 80.0, 30.0).with_mass(1.0),
        ];
        let (state, result) = engine.generate_layout(&parts).unwrap();
        assert!(result.all_placed());
        let report = check_state(&state, 0.0);
        assert!(report.is_collision_free(), "{:?}", report);
    }
}
