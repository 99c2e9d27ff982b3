//! Splitting a mesh into its connected solids.
//!
//! Two faces belong to the same solid when a chain of shared vertices links
//! them. The walk is an explicit-stack flood fill over face indices, so meshes
//! with hundreds of thousands of faces cannot overflow the call stack.

use crate::float_types::{Real, tolerance};
use crate::mesh::Mesh;
use crate::progress::{ProgressFn, sub_range};
use tracing::{debug, info_span};

const STATUS: &str = "Split Into Meshes";

/// Partition `mesh` into one mesh per maximal connected component.
///
/// Every face of `mesh` is copied (with fresh, non-welded vertices) into
/// exactly one output mesh, after which each component gets a clean-and-merge
/// pass with the crate-wide [`tolerance`]. Components come out in the order of
/// their lowest face index. `progress` is called once per finished component.
pub fn split_connected(mesh: &Mesh, progress: &mut ProgressFn<'_>) -> Vec<Mesh> {
    split_connected_with(mesh, tolerance(), progress)
}

/// [`split_connected`] welding each component with `weld_tolerance`.
pub fn split_connected_with(
    mesh: &Mesh,
    weld_tolerance: Real,
    progress: &mut ProgressFn<'_>,
) -> Vec<Mesh> {
    let _span = info_span!("split_connected", faces = mesh.face_count()).entered();

    let face_count = mesh.face_count();
    let mut components = Vec::new();
    if face_count == 0 {
        return components;
    }

    let topology = mesh.topology();
    let mut visited = vec![false; face_count];
    let mut visited_count = 0usize;
    let mut stack = Vec::new();

    for seed in 0..face_count {
        if visited[seed] {
            continue;
        }

        let mut component = Mesh::new();
        visited[seed] = true;
        visited_count += 1;
        component.copy_face_from(mesh, seed);
        stack.push(seed);

        while let Some(face) = stack.pop() {
            for &vertex in topology.face_vertices(face) {
                for &attached in topology.faces_around_vertex(vertex) {
                    if !visited[attached] {
                        visited[attached] = true;
                        visited_count += 1;
                        component.copy_face_from(mesh, attached);
                        stack.push(attached);
                    }
                }
            }
        }

        component.clean_and_merge_with(weld_tolerance);
        debug!(
            seed,
            faces = component.face_count(),
            vertices = component.vertex_count(),
            "component complete"
        );
        components.push(component);

        progress(visited_count as Real / face_count as Real, STATUS);
    }

    components
}

/// Split several meshes, dividing the progress range evenly between them.
pub fn split_all(meshes: &[Mesh], progress: &mut ProgressFn<'_>) -> Vec<Mesh> {
    let mut result = Vec::new();
    if meshes.is_empty() {
        return result;
    }

    let share = 1.0 / meshes.len() as Real;
    for (i, mesh) in meshes.iter().enumerate() {
        let mut child = sub_range(progress, i as Real * share, share);
        result.extend(split_connected(mesh, &mut child));
    }
    result
}
