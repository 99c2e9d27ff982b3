//! `Mesh` struct: indexed vertex and face arenas in a solid's local space.
//!
//! Faces reference vertices by index. Two faces are adjacent when they share a
//! vertex index, which is what [`topology::MeshTopology`] answers queries about.
//! A mesh never carries its plate placement; that lives next to it in
//! [`PlacedSolid`](crate::plate::PlacedSolid).

use crate::float_types::{
    Real,
    parry3d::bounding_volume::Aabb,
};
use nalgebra::{Matrix4, Point3, Vector3, partial_max, partial_min};
use std::sync::OnceLock;

pub mod clean;
pub mod shapes;
pub mod topology;
pub mod vertex;

use topology::MeshTopology;
use vertex::Vertex;

/// A polygonal face: an ordered loop of at least three vertex indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Face {
    pub indices: Vec<usize>,
}

impl Face {
    /// Create a face from vertex indices.
    pub fn new(indices: Vec<usize>) -> Self {
        assert!(indices.len() >= 3, "degenerate face");
        Face { indices }
    }

    /// Number of corners
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Faces always have corners; provided for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Return an iterator over paired indices each forming an edge of the face
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.indices
            .iter()
            .zip(self.indices.iter().cycle().skip(1))
            .map(|(&a, &b)| (a, b))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    /// Vertex arena
    pub vertices: Vec<Vertex>,

    /// Face arena, each face indexing into `vertices`
    pub faces: Vec<Face>,

    /// Lazily calculated local AABB that spans `vertices`.
    pub bounding_box: OnceLock<Aabb>,
}

impl Mesh {
    /// Returns a new empty Mesh
    pub fn new() -> Self {
        Mesh::default()
    }

    /// Build a Mesh from a polygon soup. Every polygon gets its own vertices;
    /// run [`Mesh::clean_and_merge`] to weld them.
    pub fn from_polygons(polygons: &[Vec<Point3<Real>>]) -> Self {
        let mut mesh = Mesh::new();
        for polygon in polygons.iter().filter(|p| p.len() >= 3) {
            mesh.add_face_from_positions(polygon.iter().copied());
        }
        mesh
    }

    /// Build a Mesh from shared positions and faces indexing into them.
    pub fn from_indexed(positions: &[Point3<Real>], faces: &[Vec<usize>]) -> Self {
        let mut mesh = Mesh::new();
        mesh.vertices = positions.iter().map(|&p| Vertex::new(p)).collect();
        for face in faces {
            mesh.add_face(face.clone());
        }
        mesh
    }

    /// Append a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Point3<Real>) -> usize {
        self.vertices.push(Vertex::new(pos));
        self.bounding_box = OnceLock::new();
        self.vertices.len() - 1
    }

    /// Append a face over existing vertices and return its index.
    ///
    /// ## Panics
    /// If `indices` has fewer than three entries or references a missing vertex.
    pub fn add_face(&mut self, indices: Vec<usize>) -> usize {
        assert!(
            indices.iter().all(|&i| i < self.vertices.len()),
            "face index out of range (vertices.len = {})",
            self.vertices.len()
        );
        self.faces.push(Face::new(indices));
        self.faces.len() - 1
    }

    /// Append a face whose corners are brand-new vertices at `positions`.
    /// No welding against existing vertices takes place.
    pub fn add_face_from_positions<I>(&mut self, positions: I) -> usize
    where
        I: IntoIterator<Item = Point3<Real>>,
    {
        let indices = positions
            .into_iter()
            .map(|pos| self.add_vertex(pos))
            .collect();
        self.add_face(indices)
    }

    /// Copy face `face` of `source` into this mesh as new, non-welded vertices.
    pub fn copy_face_from(&mut self, source: &Mesh, face: usize) -> usize {
        self.add_face_from_positions(source.face_positions(face))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// `true` when the mesh has no faces.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Corner positions of face `face`, in winding order.
    pub fn face_positions(&self, face: usize) -> impl Iterator<Item = Point3<Real>> + '_ {
        self.faces[face].indices.iter().map(|&i| self.vertices[i].pos)
    }

    /// Area-weighted face normal (Newell's method); zero for degenerate faces.
    pub fn face_normal(&self, face: usize) -> Vector3<Real> {
        newell_normal(&self.face_positions(face).collect::<Vec<_>>())
    }

    /// Vertex/face adjacency for this mesh.
    pub fn topology(&self) -> MeshTopology {
        MeshTopology::new(self)
    }

    /// Returns a [`parry3d::bounding_volume::Aabb`] indicating the local bounds of all vertices.
    pub fn bounding_box(&self) -> Aabb {
        *self
            .bounding_box
            .get_or_init(|| bounds_of_points(self.vertices.iter().map(|v| v.pos)))
    }

    /// Invalidates the cached bounding box.
    pub fn invalidate_bounding_box(&mut self) {
        self.bounding_box = OnceLock::new();
    }

    /// Bounds of the mesh after `transform`, computed from every transformed vertex.
    pub fn transformed_bounding_box(&self, transform: &Matrix4<Real>) -> Aabb {
        bounds_of_points(
            self.vertices
                .iter()
                .map(|v| transform.transform_point(&v.pos)),
        )
    }

    /// Return a copy of this mesh with `transform` baked into every vertex.
    pub fn transform(&self, transform: &Matrix4<Real>) -> Mesh {
        Mesh {
            vertices: self.vertices.iter().map(|v| v.transformed(transform)).collect(),
            faces: self.faces.clone(),
            bounding_box: OnceLock::new(),
        }
    }
}

/// Min/max corners over `points`; a trivial AABB at the origin when empty.
pub fn bounds_of_points<I>(points: I) -> Aabb
where
    I: IntoIterator<Item = Point3<Real>>,
{
    let mut min_x = Real::MAX;
    let mut min_y = Real::MAX;
    let mut min_z = Real::MAX;
    let mut max_x = -Real::MAX;
    let mut max_y = -Real::MAX;
    let mut max_z = -Real::MAX;

    for p in points {
        min_x = *partial_min(&min_x, &p.x).unwrap_or(&Real::NAN);
        min_y = *partial_min(&min_y, &p.y).unwrap_or(&Real::NAN);
        min_z = *partial_min(&min_z, &p.z).unwrap_or(&Real::NAN);

        max_x = *partial_max(&max_x, &p.x).unwrap_or(&Real::NAN);
        max_y = *partial_max(&max_y, &p.y).unwrap_or(&Real::NAN);
        max_z = *partial_max(&max_z, &p.z).unwrap_or(&Real::NAN);
    }

    // no vertices at all
    if min_x > max_x {
        return Aabb::new(Point3::origin(), Point3::origin());
    }

    Aabb::new(
        Point3::new(min_x, min_y, min_z),
        Point3::new(max_x, max_y, max_z),
    )
}

/// Newell normal of a closed polygon; its length is twice the polygon area.
pub fn newell_normal(points: &[Point3<Real>]) -> Vector3<Real> {
    let mut normal = Vector3::zeros();
    for (i, current) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal
}
