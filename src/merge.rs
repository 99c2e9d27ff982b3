//! Combining several solids into one mesh.
//!
//! There are two deliberately separate operations. [`merge_boolean`] computes
//! a true CSG union, so overlapping volumes become one shell. [`merge_flat`]
//! just pools every face of every input; overlapping solids keep their
//! interior faces.

use crate::csg::polygon::{Polygon, mesh_of, polygons_of};
use crate::csg::union_polygons;
use crate::float_types::Real;
use crate::mesh::Mesh;
use crate::progress::ProgressFn;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

/// Which merge a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// [`merge_boolean`]
    Boolean,
    /// [`merge_flat`]
    #[default]
    Flat,
}

/// Run the merge selected by `mode`.
pub fn merge(
    meshes: &[Mesh],
    mode: MergeMode,
    weld_tolerance: Real,
    progress: &mut ProgressFn<'_>,
) -> Mesh {
    match mode {
        MergeMode::Boolean => merge_boolean(meshes, weld_tolerance, progress),
        MergeMode::Flat => merge_flat(meshes, weld_tolerance, progress),
    }
}

/// Every face of every input copied into one mesh, with fresh vertices per
/// face and no welding. The face count is exactly the sum of the inputs'.
pub fn concatenate(meshes: &[Mesh], progress: &mut ProgressFn<'_>) -> Mesh {
    let mut result = Mesh::new();
    let total = meshes.len().max(1) as Real;
    for (i, mesh) in meshes.iter().enumerate() {
        for face in 0..mesh.face_count() {
            result.copy_face_from(mesh, face);
        }
        progress((i + 1) as Real / total, "Merging Parts");
    }
    result
}

/// [`concatenate`] followed by one clean-and-merge pass.
pub fn merge_flat(meshes: &[Mesh], weld_tolerance: Real, progress: &mut ProgressFn<'_>) -> Mesh {
    let _span = info_span!("merge_flat", inputs = meshes.len()).entered();
    let mut merged = concatenate(meshes, progress);
    let report = merged.clean_and_merge_with(weld_tolerance);
    debug!(faces = merged.face_count(), ?report, "flat merge done");
    merged
}

/// Boolean union of all inputs, folded left into a running result and
/// cleaned once at the end. Inputs are expected to be closed solids.
pub fn merge_boolean(
    meshes: &[Mesh],
    weld_tolerance: Real,
    progress: &mut ProgressFn<'_>,
) -> Mesh {
    let _span = info_span!("merge_boolean", inputs = meshes.len()).entered();
    let total = meshes.len().max(1) as Real;

    let mut running: Vec<Polygon> = Vec::new();
    for (i, mesh) in meshes.iter().enumerate() {
        running = union_polygons(running, polygons_of(mesh));
        progress((i + 1) as Real / total, "Merging Parts");
    }

    let mut merged = mesh_of(&running);
    let report = merged.clean_and_merge_with(weld_tolerance);
    debug!(faces = merged.face_count(), ?report, "boolean merge done");
    merged
}
