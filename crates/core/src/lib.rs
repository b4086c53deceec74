//! # Sat-Layout Core
//!
//! Shared value types for the satellite component layout optimizer.
//!
//! This crate holds the data model that the packing and optimizer crates
//! build on. It performs no placement or search itself.
//!
//! ## Core Components
//!
//! - **Geometry**: [`Aabb3`], [`Axis`], [`MountFace`]
//! - **Parts**: [`Part`] with the asymmetric installation-footprint model
//! - **Design state**: [`DesignState`], [`Component`], [`Envelope`], [`KeepoutZone`]
//! - **Evaluation**: [`EvaluationResult`], [`Violation`], [`SimulationResult`]
//! - **Limits**: [`ConstraintThresholds`]
//!
//! ## Installation footprint
//!
//! A part mounted on a face is inflated by its clearance margin: the full
//! margin on the two in-plane axes and half of it along the mounting axis.
//!
//! ```rust
//! use sat_layout_core::{MountFace, Part};
//!
//! let part = Part::new("battery", 200.0, 150.0, 100.0).with_clearance(10.0);
//! let dims = part.install_dims(MountFace::NegZ);
//! assert_eq!((dims.x, dims.y, dims.z), (210.0, 160.0, 105.0));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod constraints;
pub mod design;
pub mod error;
pub mod evaluation;
pub mod geometry;
pub mod part;

pub use constraints::ConstraintThresholds;
pub use design::{
    Bracket, Component, DesignState, Envelope, EnvelopeOrigin, Heatsink, KeepoutZone,
    META_LAST_EDIT, META_SOURCE, META_UNPLACED,
};
pub use error::{Error, Result};
pub use evaluation::{
    EvaluationResult, PenaltyBreakdown, SimulationResult, Violation, ViolationKind,
};
pub use geometry::{Aabb3, Axis, MountFace, VOLUME_EPSILON};
pub use part::Part;

/// Re-export of the vector type used throughout the API.
pub use nalgebra::Vector3;
