//! Free-standing convex-ish polygons the BSP kernel cuts and reassembles.

use crate::csg::plane::Plane;
use crate::float_types::{Real, parry3d::bounding_volume::Aabb};
use crate::mesh::{Mesh, bounds_of_points, vertex::Vertex};
use nalgebra::Point3;

/// A polygon with its own vertex copies and supporting plane.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: Vec<Vertex>,
    pub plane: Plane,
}

impl Polygon {
    /// Polygon through `points`, plane derived from their winding.
    pub fn from_points(points: &[Point3<Real>]) -> Self {
        Polygon {
            vertices: points.iter().map(|&p| Vertex::new(p)).collect(),
            plane: Plane::from_points(points),
        }
    }

    /// Polygon that keeps an already known plane.
    pub fn with_plane(vertices: Vec<Vertex>, plane: Plane) -> Self {
        Polygon { vertices, plane }
    }

    /// Reverse winding and plane orientation.
    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }

    pub fn positions(&self) -> Vec<Point3<Real>> {
        self.vertices.iter().map(|v| v.pos).collect()
    }

    pub fn bounding_box(&self) -> Aabb {
        bounds_of_points(self.vertices.iter().map(|v| v.pos))
    }
}

/// One polygon per face of `mesh`.
pub fn polygons_of(mesh: &Mesh) -> Vec<Polygon> {
    (0..mesh.face_count())
        .map(|face| Polygon::from_points(&mesh.face_positions(face).collect::<Vec<_>>()))
        .collect()
}

/// Non-welded mesh holding every polygon as a face.
pub fn mesh_of(polygons: &[Polygon]) -> Mesh {
    let soup: Vec<Vec<Point3<Real>>> = polygons.iter().map(Polygon::positions).collect();
    Mesh::from_polygons(&soup)
}
