//! Packing and envelope configuration.

use sat_layout_core::EnvelopeOrigin;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the multi-start packer and the space partitioner.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PackingConfig {
    /// Clearance margin applied to parts that do not carry their own (mm).
    pub clearance: f64,

    /// Number of independent seeded attempts.
    pub attempts: usize,

    /// Seed of the first attempt; attempt `i` uses `base_seed + i`.
    pub base_seed: u64,

    /// Bins with a shorter edge than this are discarded (mm).
    pub min_bin_edge: f64,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            clearance: 5.0,
            attempts: 3,
            base_seed: 42,
            min_bin_edge: 5.0,
        }
    }
}

impl PackingConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default clearance.
    pub fn with_clearance(mut self, clearance: f64) -> Self {
        self.clearance = clearance;
        self
    }

    /// Sets the number of attempts (at least one).
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    /// Sets the minimum usable bin edge.
    pub fn with_min_bin_edge(mut self, min_bin_edge: f64) -> Self {
        self.min_bin_edge = min_bin_edge;
        self
    }
}

/// How the enclosure is sized.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvelopeConfig {
    /// Explicit outer size (mm). When `None` the envelope is auto-sized
    /// from the total part volume.
    pub outer_size: Option<[f64; 3]>,

    /// Wall thickness (mm).
    pub thickness: f64,

    /// Target fill ratio for auto-sizing (0, 1].
    pub fill_ratio: f64,

    /// Aspect ratio of the auto-sized box.
    pub size_ratio: [f64; 3],

    /// Anchor of the outer box.
    pub origin: EnvelopeOrigin,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            outer_size: None,
            thickness: 5.0,
            fill_ratio: 0.3,
            size_ratio: [1.0, 1.0, 1.0],
            origin: EnvelopeOrigin::Center,
        }
    }
}

impl EnvelopeConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed outer size.
    pub fn with_outer_size(mut self, x: f64, y: f64, z: f64) -> Self {
        self.outer_size = Some([x, y, z]);
        self
    }

    /// Sets the wall thickness.
    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    /// Sets the fill ratio.
    pub fn with_fill_ratio(mut self, fill_ratio: f64) -> Self {
        self.fill_ratio = fill_ratio;
        self
    }

    /// Sets the aspect ratio.
    pub fn with_size_ratio(mut self, ratio: [f64; 3]) -> Self {
        self.size_ratio = ratio;
        self
    }

    /// Sets the origin anchor.
    pub fn with_origin(mut self, origin: EnvelopeOrigin) -> Self {
        self.origin = origin;
        self
    }
}
