//! Per-face 2D layout inside a bin.
//!
//! A [`BinFaceMapper`] tracks the remaining free space of one bin. Packing a
//! face projects that space onto a 2D board spanned by the face's in-plane
//! axes, fills the board with installation footprints using an
//! extreme-point heuristic, maps the board positions back to 3D and then
//! cuts the occupied layer off the remaining space along the face normal.

use nalgebra::Vector3;
use sat_layout_core::{Aabb3, MountFace, Part};

const EPS: f64 = 1e-9;

/// A rectangle on a face board.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoardRect {
    u: f64,
    v: f64,
    w: f64,
    h: f64,
}

impl BoardRect {
    fn overlaps(&self, other: &BoardRect) -> bool {
        self.u < other.u + other.w - EPS
            && other.u < self.u + self.w - EPS
            && self.v < other.v + other.h - EPS
            && other.v < self.v + self.h - EPS
    }
}

/// 2D extreme-point fill of a `width x height` board.
///
/// `items` are `(w, h)` footprints offered in order; returns the `(u, v)`
/// of each item that fits, or `None`. Candidate points are tried lowest `v`
/// first, then lowest `u`.
fn fill_board(width: f64, height: f64, items: &[(f64, f64)]) -> Vec<Option<(f64, f64)>> {
    let mut points: Vec<(f64, f64)> = vec![(0.0, 0.0)];
    let mut placed: Vec<BoardRect> = Vec::new();
    let mut out = Vec::with_capacity(items.len());

    for &(w, h) in items {
        points.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.total_cmp(&b.0)));

        let slot = points.iter().position(|&(u, v)| {
            let rect = BoardRect { u, v, w, h };
            u + w <= width + EPS
                && v + h <= height + EPS
                && placed.iter().all(|p| !p.overlaps(&rect))
        });

        match slot {
            Some(index) => {
                let (u, v) = points.remove(index);
                placed.push(BoardRect { u, v, w, h });
                for candidate in [(u + w, v), (u, v + h)] {
                    let inside_board = candidate.0 < width - EPS && candidate.1 < height - EPS;
                    let covered = placed.iter().any(|p| {
                        candidate.0 >= p.u - EPS
                            && candidate.0 < p.u + p.w - EPS
                            && candidate.1 >= p.v - EPS
                            && candidate.1 < p.v + p.h - EPS
                    });
                    if inside_board && !covered {
                        points.push(candidate);
                    }
                }
                out.push(Some((u, v)));
            }
            None => out.push(None),
        }
    }
    out
}

/// Remaining free space of one bin and its face projections.
#[derive(Debug, Clone)]
pub struct BinFaceMapper {
    original: Aabb3,
    remaining: Aabb3,
}

impl BinFaceMapper {
    /// Creates a mapper over the full bin.
    pub fn new(bin: Aabb3) -> Self {
        Self {
            original: bin,
            remaining: bin,
        }
    }

    /// The bin this mapper was created for.
    pub fn original(&self) -> &Aabb3 {
        &self.original
    }

    /// Space not yet cut off by packed faces.
    pub fn remaining(&self) -> &Aabb3 {
        &self.remaining
    }

    /// Board size `(W, H)` of `face` within the remaining space.
    pub fn board_size(&self, face: MountFace) -> (f64, f64) {
        let size = self.remaining.size();
        let (u, v) = face.plane_axes();
        (size[u.index()], size[v.index()])
    }

    /// Depth of the remaining space along the normal of `face`.
    pub fn depth(&self, face: MountFace) -> f64 {
        self.remaining.size()[face.axis().index()]
    }

    /// Projects 3D dims onto `face`: `(L_u, L_v, thickness)`.
    pub fn project(&self, face: MountFace, dims: &Vector3<f64>) -> (f64, f64, f64) {
        let (u, v) = face.plane_axes();
        (dims[u.index()], dims[v.index()], dims[face.axis().index()])
    }

    /// Maps a board position back to the world minimum corner of an
    /// installation box of size `install_dims`.
    pub fn uv_to_world_min(
        &self,
        face: MountFace,
        u: f64,
        v: f64,
        install_dims: &Vector3<f64>,
    ) -> Vector3<f64> {
        let (ua, va) = face.plane_axes();
        let n = face.axis().index();
        let mut position = self.remaining.min;
        position[ua.index()] += u;
        position[va.index()] += v;
        position[n] = if face.is_positive() {
            self.remaining.max[n] - install_dims[n]
        } else {
            self.remaining.min[n]
        };
        position
    }

    /// Removes a layer of `thickness` from the remaining space on `face`.
    pub fn cut_after_face(&mut self, face: MountFace, thickness: f64) {
        if thickness <= 0.0 {
            return;
        }
        let n = face.axis().index();
        if face.is_positive() {
            self.remaining.max[n] -= thickness;
        } else {
            self.remaining.min[n] += thickness;
        }
        if self.remaining.min[n] > self.remaining.max[n] {
            let mid = self.remaining.min[n];
            self.remaining.max[n] = mid;
        }
    }

    /// Packs `candidates` against `face` and cuts the used layer.
    ///
    /// Parts are offered largest installation volume first. Parts whose
    /// installation thickness exceeds the remaining depth are skipped.
    /// Returns the placed parts and the ones left over, in offer order.
    pub fn pack_face(
        &mut self,
        bin_index: usize,
        face: MountFace,
        candidates: Vec<Part>,
    ) -> (Vec<Part>, Vec<Part>) {
        let (width, height) = self.board_size(face);
        let depth = self.depth(face);
        if candidates.is_empty() || width <= EPS || height <= EPS || depth <= EPS {
            return (Vec::new(), candidates);
        }

        let mut order: Vec<Part> = candidates;
        order.sort_by(|a, b| {
            let va = a.install_dims(face).product();
            let vb = b.install_dims(face).product();
            vb.total_cmp(&va)
        });

        let (offered, mut leftover): (Vec<Part>, Vec<Part>) = order
            .into_iter()
            .partition(|p| self.project(face, &p.install_dims(face)).2 <= depth + EPS);

        let footprints: Vec<(f64, f64)> = offered
            .iter()
            .map(|p| {
                let (lu, lv, _) = self.project(face, &p.install_dims(face));
                (lu, lv)
            })
            .collect();
        let slots = fill_board(width, height, &footprints);

        let mut placed = Vec::new();
        let mut max_thickness: f64 = 0.0;
        for (part, slot) in offered.into_iter().zip(slots) {
            match slot {
                Some((u, v)) => {
                    let install = part.install_dims(face);
                    let position = self.uv_to_world_min(face, u, v, &install);
                    max_thickness = max_thickness.max(install[face.axis().index()]);
                    placed.push(part.with_placement(position, bin_index, face));
                }
                None => leftover.push(part),
            }
        }

        self.cut_after_face(face, max_thickness);
        (placed, leftover)
    }
}
