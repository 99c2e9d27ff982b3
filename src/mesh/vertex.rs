//! Struct and functions for working with the `Vertex`s a `Mesh` owns.

use crate::float_types::Real;
use nalgebra::{Matrix4, Point3};

/// A mesh vertex, holding its position in the mesh's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: Point3<Real>,
}

impl Vertex {
    /// Create a new [`Vertex`] at `pos`.
    pub const fn new(pos: Point3<Real>) -> Self {
        Vertex { pos }
    }

    /// Return the linear interpolation between `self` (`t = 0`) and `other` (`t = 1`).
    pub fn interpolate(&self, other: &Vertex, t: Real) -> Vertex {
        Vertex::new(self.pos + (other.pos - self.pos) * t)
    }

    /// Position after applying an affine `transform`.
    pub fn transformed(&self, transform: &Matrix4<Real>) -> Vertex {
        Vertex::new(transform.transform_point(&self.pos))
    }

    /// Squared distance between two vertex positions
    pub fn distance_squared_to(&self, other: &Vertex) -> Real {
        (self.pos - other.pos).norm_squared()
    }
}
