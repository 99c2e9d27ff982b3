//! Simple solids, mostly useful as plate fixtures and calibration parts.

use crate::float_types::Real;
use crate::mesh::Mesh;
use nalgebra::Point3;

/// Axis-aligned box spanning `[0, width] × [0, depth] × [0, height]`,
/// eight shared vertices and six outward-facing quads.
pub fn cuboid(width: Real, depth: Real, height: Real) -> Mesh {
    let positions = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(width, 0.0, 0.0),
        Point3::new(width, depth, 0.0),
        Point3::new(0.0, depth, 0.0),
        Point3::new(0.0, 0.0, height),
        Point3::new(width, 0.0, height),
        Point3::new(width, depth, height),
        Point3::new(0.0, depth, height),
    ];
    let faces = [
        vec![0, 3, 2, 1], // bottom
        vec![4, 5, 6, 7], // top
        vec![0, 1, 5, 4], // front
        vec![3, 7, 6, 2], // back
        vec![0, 4, 7, 3], // left
        vec![1, 2, 6, 5], // right
    ];
    Mesh::from_indexed(&positions, &faces)
}

/// Cube of side `size` with one corner at the origin.
pub fn cube(size: Real) -> Mesh {
    cuboid(size, size, size)
}

/// Tetrahedron with corners at the origin and on the three positive axes.
pub fn tetrahedron(size: Real) -> Mesh {
    let positions = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(size, 0.0, 0.0),
        Point3::new(0.0, size, 0.0),
        Point3::new(0.0, 0.0, size),
    ];
    let faces = [vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]];
    Mesh::from_indexed(&positions, &faces)
}
