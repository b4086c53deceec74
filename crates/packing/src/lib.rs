//! # Sat-Layout Packing
//!
//! Geometry engine for the satellite layout optimizer.
//!
//! ## Pipeline
//!
//! 1. [`build_envelope`] sizes the enclosure (explicitly or from part volume).
//! 2. [`partition`] splits the inner box into disjoint free bins around the
//!    keep-out zones.
//! 3. [`Packer`] mounts parts against bin faces over several seeded attempts
//!    and keeps the best one.
//! 4. [`check_state`] / [`feasibility`] verify an arrangement in closed form.
//!
//! [`LayoutEngine`] chains steps 1 to 3 and produces the initial
//! [`DesignState`](sat_layout_core::DesignState).
//!
//! ```rust
//! use sat_layout_packing::{partition, Packer, PackingConfig};
//! use sat_layout_core::{Aabb3, Part};
//!
//! let enclosure = Aabb3::from_arrays([0.0; 3], [400.0; 3]);
//! let keepout = Aabb3::from_arrays([150.0; 3], [250.0; 3]);
//! let bins = partition(&enclosure, &[keepout], 5.0);
//!
//! let parts = vec![Part::new("battery", 200.0, 150.0, 100.0)];
//! let result = Packer::new(PackingConfig::new()).pack(&parts, &bins);
//! assert!(result.all_placed());
//! ```

pub mod config;
pub mod engine;
pub mod envelope;
pub mod face_mapper;
pub mod feasibility;
pub mod mass;
pub mod packer;
pub mod partition;

// Re-exports
pub use config::{EnvelopeConfig, PackingConfig};
pub use engine::LayoutEngine;
pub use envelope::build_envelope;
pub use face_mapper::BinFaceMapper;
pub use feasibility::{check_state, feasibility, pair_clearance, FeasibilityReport, COLLISION_EPS};
pub use mass::MassProperties;
pub use packer::{compute_overlap_count, Packer, PackingResult, PackingScore};
pub use partition::{partition, subtract_box};
