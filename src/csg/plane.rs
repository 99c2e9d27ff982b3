//! Oriented planes and polygon splitting for the BSP kernel.

use crate::csg::polygon::Polygon;
use crate::float_types::{Real, tolerance};
use crate::mesh::{newell_normal, vertex::Vertex};
use nalgebra::{Point3, Vector3};

// Point/polygon classification bit flags
pub const COPLANAR: i8 = 0;
pub const FRONT: i8 = 1;
pub const BACK: i8 = 2;
pub const SPANNING: i8 = 3;

/// A plane `normal · p = w` with a unit `normal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vector3<Real>,
    pub w: Real,
}

impl Plane {
    /// Plane through a polygon's corners, oriented by their winding.
    /// Falls back to a `+Z` plane through the first corner for degenerate input.
    pub fn from_points(points: &[Point3<Real>]) -> Plane {
        let normal = newell_normal(points);
        let length = normal.norm();
        let anchor = points.first().copied().unwrap_or_else(Point3::origin);
        if length <= Real::EPSILON {
            return Plane {
                normal: Vector3::z(),
                w: anchor.z,
            };
        }
        let normal = normal / length;
        Plane {
            w: normal.dot(&anchor.coords),
            normal,
        }
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Signed distance of `point` along the normal.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&point.coords) - self.w
    }

    /// Classify a point as [`FRONT`], [`BACK`] or [`COPLANAR`].
    #[inline]
    pub fn orient_point(&self, point: &Point3<Real>) -> i8 {
        let t = self.signed_distance(point);
        if t < -tolerance() {
            BACK
        } else if t > tolerance() {
            FRONT
        } else {
            COPLANAR
        }
    }

    /// Whether `other` faces the same way as this plane.
    pub fn orient_plane(&self, other: &Plane) -> i8 {
        if self.normal.dot(&other.normal) > 0.0 {
            FRONT
        } else {
            BACK
        }
    }

    /// Bitwise OR of every vertex classification.
    pub fn classify_polygon(&self, polygon: &Polygon) -> i8 {
        polygon
            .vertices
            .iter()
            .fold(COPLANAR, |acc, v| acc | self.orient_point(&v.pos))
    }

    /// Split `polygon` by this plane into
    /// `(coplanar_front, coplanar_back, front, back)`.
    #[allow(clippy::type_complexity)]
    pub fn split_polygon(
        &self,
        polygon: &Polygon,
    ) -> (Vec<Polygon>, Vec<Polygon>, Vec<Polygon>, Vec<Polygon>) {
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        let mut front = Vec::new();
        let mut back = Vec::new();

        let types: Vec<i8> = polygon
            .vertices
            .iter()
            .map(|v| self.orient_point(&v.pos))
            .collect();
        let polygon_type = types.iter().fold(COPLANAR, |acc, &t| acc | t);

        match polygon_type {
            COPLANAR => {
                if self.orient_plane(&polygon.plane) == FRONT {
                    coplanar_front.push(polygon.clone());
                } else {
                    coplanar_back.push(polygon.clone());
                }
            },
            FRONT => front.push(polygon.clone()),
            BACK => back.push(polygon.clone()),
            _ => {
                let count = polygon.vertices.len();
                let mut split_front = Vec::<Vertex>::with_capacity(count + 1);
                let mut split_back = Vec::<Vertex>::with_capacity(count + 1);

                for i in 0..count {
                    let j = (i + 1) % count;
                    let (type_i, type_j) = (types[i], types[j]);
                    let vertex_i = &polygon.vertices[i];
                    let vertex_j = &polygon.vertices[j];

                    if type_i != BACK {
                        split_front.push(*vertex_i);
                    }
                    if type_i != FRONT {
                        split_back.push(*vertex_i);
                    }

                    if (type_i | type_j) == SPANNING {
                        let denom = self.normal.dot(&(vertex_j.pos - vertex_i.pos));
                        if denom.abs() > Real::EPSILON {
                            let t = (self.w - self.normal.dot(&vertex_i.pos.coords)) / denom;
                            let crossing = vertex_i.interpolate(vertex_j, t);
                            split_front.push(crossing);
                            split_back.push(crossing);
                        }
                    }
                }

                // keep the parent plane so fragments stay exactly coplanar with it
                if split_front.len() >= 3 {
                    front.push(Polygon::with_plane(split_front, polygon.plane.clone()));
                }
                if split_back.len() >= 3 {
                    back.push(Polygon::with_plane(split_back, polygon.plane.clone()));
                }
            },
        }

        (coplanar_front, coplanar_back, front, back)
    }
}
