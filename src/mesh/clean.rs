//! Clean-and-merge: weld near-duplicate vertices, drop degenerate faces and
//! compact the vertex arena.
//!
//! Welding keeps the first vertex seen in each cluster, so surviving positions
//! are always exact input positions.

use crate::float_types::{Real, tolerance};
use crate::mesh::{Face, Mesh, newell_normal, vertex::Vertex};
use hashbrown::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// What a clean-and-merge pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Vertices folded into an earlier vertex within tolerance
    pub welded_vertices: usize,
    /// Faces removed because they collapsed to fewer than three corners or zero area
    pub removed_faces: usize,
    /// Vertices dropped because no face referenced them afterwards
    pub unused_vertices: usize,
}

type Cell = (i64, i64, i64);

/// Whether a face goes through the same vertex twice, e.g. `[a, b, a, c]`.
fn revisits_a_corner(indices: &[usize]) -> bool {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).any(|w| w[0] == w[1])
}

#[inline]
fn cell_of(v: &Vertex, cell_size: Real) -> Cell {
    (
        (v.pos.x / cell_size).floor() as i64,
        (v.pos.y / cell_size).floor() as i64,
        (v.pos.z / cell_size).floor() as i64,
    )
}

impl Mesh {
    /// Clean and merge with the crate-wide [`tolerance`].
    pub fn clean_and_merge(&mut self) -> CleanReport {
        self.clean_and_merge_with(tolerance())
    }

    /// Weld vertices closer than `weld_tolerance`, discard faces that end up with
    /// fewer than three distinct corners, a repeated corner or no area, then
    /// drop unused vertices.
    ///
    /// A zero, negative or non-finite tolerance only welds exact duplicates.
    pub fn clean_and_merge_with(&mut self, weld_tolerance: Real) -> CleanReport {
        let weld_tolerance = if weld_tolerance.is_finite() && weld_tolerance > 0.0 {
            weld_tolerance
        } else {
            0.0
        };
        let mut report = CleanReport::default();
        if self.vertices.is_empty() {
            report.removed_faces = self.faces.len();
            self.faces.clear();
            return report;
        }

        let remap = self.weld_vertices(weld_tolerance, &mut report);

        let area_floor = weld_tolerance * weld_tolerance;
        let vertices = &self.vertices;
        let before = self.faces.len();
        self.faces = self
            .faces
            .iter()
            .filter_map(|face| {
                let mut indices: Vec<usize> = face.indices.iter().map(|&i| remap[i]).collect();
                indices.dedup();
                while indices.len() > 1 && indices.first() == indices.last() {
                    indices.pop();
                }
                if indices.len() < 3 || revisits_a_corner(&indices) {
                    return None;
                }
                let corners: Vec<_> = indices.iter().map(|&i| vertices[i].pos).collect();
                if newell_normal(&corners).norm() <= area_floor {
                    return None;
                }
                Some(Face { indices })
            })
            .collect();
        report.removed_faces = before - self.faces.len();

        report.unused_vertices = self.remove_unused_vertices();
        self.bounding_box = OnceLock::new();

        debug!(
            welded = report.welded_vertices,
            removed_faces = report.removed_faces,
            unused = report.unused_vertices,
            "clean and merge"
        );
        report
    }

    /// Collapse vertices within `weld_tolerance` of an earlier vertex.
    /// Returns the old→new index map; `self.vertices` holds the survivors.
    fn weld_vertices(&mut self, weld_tolerance: Real, report: &mut CleanReport) -> Vec<usize> {
        // keep cell coordinates far inside i64 for tiny tolerances on large parts
        let largest = self
            .vertices
            .iter()
            .flat_map(|v| v.pos.coords.iter().copied())
            .filter(|c| c.is_finite())
            .fold(0.0 as Real, |acc, c| acc.max(c.abs()));
        let cell_size = weld_tolerance
            .max(Real::EPSILON)
            .max(largest / (1u64 << 60) as Real);
        let limit = weld_tolerance * weld_tolerance;

        let mut grid: HashMap<Cell, Vec<usize>> = HashMap::with_capacity(self.vertices.len());
        let mut survivors: Vec<Vertex> = Vec::with_capacity(self.vertices.len());
        let mut remap = Vec::with_capacity(self.vertices.len());

        for vertex in &self.vertices {
            let (cx, cy, cz) = cell_of(vertex, cell_size);

            let mut found = None;
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        if let Some(bucket) = grid.get(&(
                            cx.saturating_add(dx),
                            cy.saturating_add(dy),
                            cz.saturating_add(dz),
                        )) {
                            if let Some(&hit) = bucket
                                .iter()
                                .find(|&&s| survivors[s].distance_squared_to(vertex) <= limit)
                            {
                                found = Some(hit);
                                break 'search;
                            }
                        }
                    }
                }
            }

            let index = match found {
                Some(existing) => {
                    report.welded_vertices += 1;
                    existing
                },
                None => {
                    survivors.push(*vertex);
                    let index = survivors.len() - 1;
                    grid.entry((cx, cy, cz)).or_default().push(index);
                    index
                },
            };
            remap.push(index);
        }

        self.vertices = survivors;
        remap
    }

    /// Drop vertices no face references, renumbering face indices. Returns how many were dropped.
    pub fn remove_unused_vertices(&mut self) -> usize {
        let mut used = vec![false; self.vertices.len()];
        for face in &self.faces {
            for &i in &face.indices {
                used[i] = true;
            }
        }

        let mut new_index = vec![usize::MAX; self.vertices.len()];
        let mut kept = Vec::with_capacity(self.vertices.len());
        for (old, vertex) in self.vertices.iter().enumerate() {
            if used[old] {
                new_index[old] = kept.len();
                kept.push(*vertex);
            }
        }

        let removed = self.vertices.len() - kept.len();
        if removed > 0 {
            for face in &mut self.faces {
                for i in &mut face.indices {
                    *i = new_index[*i];
                }
            }
            self.vertices = kept;
            self.bounding_box = OnceLock::new();
        }
        removed
    }
}
