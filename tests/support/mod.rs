//! Test support library
//! Provides various helper functions & utilities for tests.
#![allow(dead_code)]

use meshplate::{
    float_types::{Real, parry3d::bounding_volume::Aabb},
    mesh::{Mesh, shapes},
};
use nalgebra::{Matrix4, Vector3};

/// Route `tracing` output to the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// `[min_x, min_y, min_z, max_x, max_y, max_z]` of an AABB.
pub fn bounds_array(aabb: &Aabb) -> [Real; 6] {
    [
        aabb.mins.x,
        aabb.mins.y,
        aabb.mins.z,
        aabb.maxs.x,
        aabb.maxs.y,
        aabb.maxs.z,
    ]
}

/// Cube of side `size` with its minimum corner at `offset`.
pub fn cube_at(size: Real, offset: [Real; 3]) -> Mesh {
    shapes::cube(size).transform(&Matrix4::new_translation(&Vector3::new(
        offset[0], offset[1], offset[2],
    )))
}

/// Tetrahedron of `size` with its corner at `offset`.
pub fn tetrahedron_at(size: Real, offset: [Real; 3]) -> Mesh {
    shapes::tetrahedron(size).transform(&Matrix4::new_translation(&Vector3::new(
        offset[0], offset[1], offset[2],
    )))
}

type Corner = [i64; 3];

fn quantize(value: Real) -> i64 {
    (value * 1e6).round() as i64
}

/// Position-based description of a mesh's faces that ignores vertex storage
/// order: each face is its corner loop rotated to start at the smallest corner
/// (winding kept), and the faces are sorted.
pub fn face_signature(mesh: &Mesh) -> Vec<Vec<Corner>> {
    let mut faces: Vec<Vec<Corner>> = (0..mesh.face_count())
        .map(|face| {
            let corners: Vec<Corner> = mesh
                .face_positions(face)
                .map(|p| [quantize(p.x), quantize(p.y), quantize(p.z)])
                .collect();
            let start = corners
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| **c)
                .map(|(i, _)| i)
                .unwrap_or(0);
            let mut rotated = corners[start..].to_vec();
            rotated.extend_from_slice(&corners[..start]);
            rotated
        })
        .collect();
    faces.sort();
    faces
}

/// Total surface area (sum of face areas).
pub fn surface_area(mesh: &Mesh) -> Real {
    (0..mesh.face_count())
        .map(|face| mesh.face_normal(face).norm() * 0.5)
        .sum()
}
