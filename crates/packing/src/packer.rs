//! Multi-start face-mounting packer.

use crate::config::PackingConfig;
use crate::face_mapper::BinFaceMapper;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sat_layout_core::{Aabb3, MountFace, Part};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Overlap depth below which two installation boxes are treated as touching.
const OVERLAP_EPS: f64 = 1e-6;

/// Quality of one packing attempt. Lower is better, compared field by field.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackingScore {
    /// Parts that could not be placed.
    pub unplaced: usize,
    /// Overlapping installation-footprint pairs.
    pub overlaps: usize,
    /// Bin volume not covered by installation footprints (mm^3).
    pub dead_volume: f64,
    /// Attempt index, used as the final tiebreak.
    pub seed_index: usize,
}

impl Eq for PackingScore {}

impl PartialOrd for PackingScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackingScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unplaced
            .cmp(&other.unplaced)
            .then(self.overlaps.cmp(&other.overlaps))
            .then(self.dead_volume.total_cmp(&other.dead_volume))
            .then(self.seed_index.cmp(&other.seed_index))
    }
}

/// Result of a multi-start packing run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackingResult {
    /// Placed parts with position, bin and mount face set.
    pub placed: Vec<Part>,
    /// Parts no bin could take.
    pub unplaced: Vec<Part>,
    /// Number of bins holding at least one part.
    pub bins_used: usize,
    /// Overlapping installation-footprint pairs.
    pub overlap_count: usize,
    /// Total intrinsic volume of placed parts (mm^3).
    pub total_volume: f64,
    /// Score of the winning attempt.
    pub score: PackingScore,
    /// Computation time in milliseconds.
    pub computation_time_ms: u64,
}

impl PackingResult {
    fn empty(parts: &[Part], bins: &[Aabb3]) -> Self {
        Self {
            placed: Vec::new(),
            unplaced: parts.to_vec(),
            bins_used: 0,
            overlap_count: 0,
            total_volume: 0.0,
            score: PackingScore {
                unplaced: parts.len(),
                overlaps: 0,
                dead_volume: bins.iter().map(Aabb3::volume).sum(),
                seed_index: 0,
            },
            computation_time_ms: 0,
        }
    }

    /// Returns true if every part was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Ids of unplaced parts.
    pub fn unplaced_ids(&self) -> Vec<String> {
        self.unplaced.iter().map(|p| p.id.clone()).collect()
    }
}

/// Counts pairs of placed parts whose installation footprints overlap.
pub fn compute_overlap_count(placed: &[Part]) -> usize {
    let boxes: Vec<Aabb3> = placed.iter().filter_map(Part::install_aabb).collect();
    let mut count = 0;
    for (i, a) in boxes.iter().enumerate() {
        for b in &boxes[i + 1..] {
            if a.intersects_with_tolerance(b, OVERLAP_EPS) {
                count += 1;
            }
        }
    }
    count
}

/// Multi-start face-mounting packer.
///
/// Each attempt shuffles the `(bin, face)` task list with
/// `StdRng::seed_from_u64(base_seed + attempt)`, then packs faces in that
/// order. Parts keep their input order; every face re-sorts them by
/// install volume, so equal volumes are offered in BOM order. The best attempt by [`PackingScore`] wins, so the same
/// inputs and configuration always give the same result.
#[derive(Debug, Clone, Default)]
pub struct Packer {
    config: PackingConfig,
}

impl Packer {
    /// Creates a packer with the given configuration.
    pub fn new(config: PackingConfig) -> Self {
        Self { config }
    }

    /// The packer's configuration.
    pub fn config(&self) -> &PackingConfig {
        &self.config
    }

    /// Packs `parts` into `bins`.
    ///
    /// Parts whose own clearance is smaller than the configured clearance
    /// are packed with the configured value.
    pub fn pack(&self, parts: &[Part], bins: &[Aabb3]) -> PackingResult {
        let start = Instant::now();
        let parts: Vec<Part> = parts
            .iter()
            .map(|p| {
                let mut p = p.clone();
                p.clearance = p.clearance.max(self.config.clearance);
                p
            })
            .collect();

        info!(
            "Packing {} parts into {} bins (clearance {} mm, {} attempts)",
            parts.len(),
            bins.len(),
            self.config.clearance,
            self.config.attempts
        );

        if parts.is_empty() || bins.is_empty() {
            if bins.is_empty() && !parts.is_empty() {
                warn!("No free bins: all {} parts are unplaced", parts.len());
            }
            let mut result = PackingResult::empty(&parts, bins);
            result.computation_time_ms = start.elapsed().as_millis() as u64;
            return result;
        }

        let mut best: Option<PackingResult> = None;
        for attempt in 0..self.config.attempts.max(1) {
            let run = self.single_run(&parts, bins, attempt);
            debug!(
                "Attempt {}/{}: placed {}/{}, overlaps {}, dead volume {:.0}",
                attempt + 1,
                self.config.attempts,
                run.placed.len(),
                parts.len(),
                run.overlap_count,
                run.score.dead_volume
            );
            if best.as_ref().map_or(true, |b| run.score < b.score) {
                best = Some(run);
            }
        }

        let mut result = match best {
            Some(result) => result,
            None => PackingResult::empty(&parts, bins),
        };
        result.computation_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Best attempt #{}: placed {}, unplaced {}, overlaps {}, bins used {}",
            result.score.seed_index + 1,
            result.placed.len(),
            result.unplaced.len(),
            result.overlap_count,
            result.bins_used
        );
        if !result.unplaced.is_empty() {
            warn!("Unplaced parts: {}", result.unplaced_ids().join(", "));
        }
        result
    }

    fn single_run(&self, parts: &[Part], bins: &[Aabb3], attempt: usize) -> PackingResult {
        let mut rng = StdRng::seed_from_u64(self.config.base_seed.wrapping_add(attempt as u64));

        let mut remaining: Vec<Part> = parts.to_vec();

        let mut tasks: Vec<(usize, MountFace)> = (0..bins.len())
            .flat_map(|b| MountFace::ALL.into_iter().map(move |f| (b, f)))
            .collect();
        tasks.shuffle(&mut rng);

        let mut mappers: Vec<BinFaceMapper> = bins.iter().copied().map(BinFaceMapper::new).collect();
        let mut placed: Vec<Part> = Vec::new();
        let mut used_bins = BTreeSet::new();

        for (bin_index, face) in tasks {
            if remaining.is_empty() {
                break;
            }
            let (on_face, leftover) = mappers[bin_index].pack_face(bin_index, face, remaining);
            remaining = leftover;
            if !on_face.is_empty() {
                used_bins.insert(bin_index);
                placed.extend(on_face);
            }
        }

        let install_volume: f64 = placed
            .iter()
            .filter_map(Part::install_aabb)
            .map(|b| b.volume())
            .sum();
        let bin_volume: f64 = bins.iter().map(Aabb3::volume).sum();
        let overlap_count = compute_overlap_count(&placed);

        PackingResult {
            total_volume: placed.iter().map(Part::volume).sum(),
            score: PackingScore {
                unplaced: remaining.len(),
                overlaps: overlap_count,
                dead_volume: (bin_volume - install_volume).max(0.0),
                seed_index: attempt,
            },
            placed,
            unplaced: remaining,
            bins_used: used_bins.len(),
            overlap_count,
            computation_time_ms: 0,
        }
    }
}
