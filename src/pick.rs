//! Ray picking: which face of which solid is under the pointer.
//!
//! Each solid gets a [`SolidPickIndex`], a parry [`TriMesh`] (which carries
//! its own BVH over the triangles) built from a fan triangulation of the
//! solid's faces in local space. Hit tests against the whole plate go through
//! a [`PlatePickTree`], a small top-level BVH over the solids' world bounds
//! that maps the ray into each candidate solid's local space.

use crate::config::FaceTriangulation;
use crate::errors::PlateError;
use crate::float_types::{
    Real,
    parry3d::bounding_volume::Aabb,
    parry3d::query::{Ray, RayCast},
    parry3d::shape::{FeatureId, TriMesh},
    tolerance,
};
use crate::mesh::{Mesh, bounds_of_points, newell_normal};
use crate::plate::{PlacedSolid, SolidId};
use crate::progress::ProgressFn;
use nalgebra::{Matrix4, Point3};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

const STATUS: &str = "Creating Trace Polygons";
const PROGRESS_INTERVAL: usize = 256;

/// Whether a polygon is planar and convex (collinear corners allowed).
pub fn is_convex_planar(points: &[Point3<Real>]) -> bool {
    if points.len() <= 3 {
        return true;
    }

    let normal = newell_normal(points);
    let length = normal.norm();
    if length <= Real::EPSILON {
        return false;
    }
    let normal = normal / length;

    let size = bounds_of_points(points.iter().copied()).extents().norm();
    let tol = tolerance() * (1.0 + size);

    let origin = points[0];
    if points.iter().any(|p| normal.dot(&(*p - origin)).abs() > tol) {
        return false;
    }

    let count = points.len();
    (0..count).all(|i| {
        let a = points[i];
        let b = points[(i + 1) % count];
        let c = points[(i + 2) % count];
        (b - a).cross(&(c - b)).dot(&normal) >= -tol * size
    })
}

/// Triangle BVH of one solid, in the solid's local space.
pub struct SolidPickIndex {
    trimesh: TriMesh,
    /// Source face of every triangle
    triangle_faces: Vec<usize>,
    local_bounds: Aabb,
}

impl fmt::Debug for SolidPickIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolidPickIndex")
            .field("triangles", &self.triangle_faces.len())
            .finish()
    }
}

impl SolidPickIndex {
    /// Fan-triangulate every face of `mesh` from its first corner and build
    /// the triangle BVH. Faces with more than three corners are checked for
    /// convex planarity according to `policy`.
    pub fn build(
        mesh: &Mesh,
        policy: FaceTriangulation,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Self, PlateError> {
        let _span = info_span!("pick_index", faces = mesh.face_count()).entered();

        let points: Vec<Point3<Real>> = mesh.vertices.iter().map(|v| v.pos).collect();
        let face_count = mesh.face_count();
        let mut indices: Vec<[u32; 3]> = Vec::with_capacity(face_count * 2);
        let mut triangle_faces = Vec::with_capacity(face_count * 2);
        let mut non_convex = 0usize;

        for (face_index, face) in mesh.faces.iter().enumerate() {
            if face_index % PROGRESS_INTERVAL == 0 {
                progress(face_index as Real / face_count as Real, STATUS);
            }

            if face.len() > 3 {
                let corners: Vec<_> = face.indices.iter().map(|&i| points[i]).collect();
                if !is_convex_planar(&corners) {
                    match policy {
                        FaceTriangulation::RequireConvex => {
                            return Err(PlateError::NonConvexFace { face: face_index });
                        },
                        FaceTriangulation::Fan => non_convex += 1,
                    }
                }
            }

            let first = face.indices[0] as u32;
            for pair in face.indices[1..].windows(2) {
                indices.push([first, pair[0] as u32, pair[1] as u32]);
                triangle_faces.push(face_index);
            }
        }

        if non_convex > 0 {
            warn!(non_convex, "fanning non-convex faces, picking may be inaccurate");
        }

        let local_bounds = bounds_of_points(points.iter().copied());
        let trimesh = TriMesh::new(points, indices)?;
        debug!(triangles = triangle_faces.len(), "pick index built");
        Ok(SolidPickIndex {
            trimesh,
            triangle_faces,
            local_bounds,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_faces.len()
    }

    /// Mesh face a triangle was fanned from.
    pub fn face_of_triangle(&self, triangle: usize) -> usize {
        self.triangle_faces[triangle]
    }

    /// Local-space bounds of the indexed mesh.
    pub fn local_aabb(&self) -> Aabb {
        self.local_bounds
    }

    pub fn trimesh(&self) -> &TriMesh {
        &self.trimesh
    }

    /// Closest hit of a local-space ray as `(face, time_of_impact)`.
    pub fn cast_local_ray(&self, ray: &Ray, max_time_of_impact: Real) -> Option<(usize, Real)> {
        let hit = self
            .trimesh
            .cast_local_ray_and_get_normal(ray, max_time_of_impact, false)?;
        match hit.feature {
            // back-face hits are reported past the triangle count
            FeatureId::Face(id) => {
                let triangle = id as usize % self.triangle_faces.len();
                Some((self.triangle_faces[triangle], hit.time_of_impact))
            },
            other => {
                debug!(?other, "ray hit without a face feature");
                None
            },
        }
    }
}

/// Closest face hit on the plate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateHit {
    pub solid: SolidId,
    /// Face index within the solid's mesh
    pub face: usize,
    /// World-space hit point
    pub point: Point3<Real>,
    /// World-space distance from the ray origin
    pub distance: Real,
}

struct PickLeaf {
    solid: SolidId,
    index: Arc<SolidPickIndex>,
    inverse: Matrix4<Real>,
}

enum PickNode {
    Leaf {
        bounds: Aabb,
        leaf: usize,
    },
    Branch {
        bounds: Aabb,
        left: usize,
        right: usize,
    },
}

impl PickNode {
    fn bounds(&self) -> &Aabb {
        match self {
            PickNode::Leaf { bounds, .. } | PickNode::Branch { bounds, .. } => bounds,
        }
    }
}

/// Transient BVH over the world bounds of every solid that has a pick index.
/// Rebuild it whenever solids move.
pub struct PlatePickTree {
    leaves: Vec<PickLeaf>,
    nodes: Vec<PickNode>,
    root: Option<usize>,
}

impl fmt::Debug for PlatePickTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatePickTree")
            .field("solids", &self.leaves.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

fn world_aabb(local: &Aabb, transform: &Matrix4<Real>) -> Aabb {
    bounds_of_points(local.vertices().iter().map(|p| transform.transform_point(p)))
}

impl PlatePickTree {
    /// Build the tree. Solids without a pick index are left out.
    pub fn build(solids: &[PlacedSolid]) -> Result<Self, PlateError> {
        let mut leaves = Vec::new();
        let mut leaf_bounds = Vec::new();
        for solid in solids {
            let Some(index) = solid.metadata.pick_index.clone() else {
                continue;
            };
            let inverse = solid
                .transform
                .try_inverse()
                .ok_or(PlateError::NonInvertibleTransform)?;
            leaf_bounds.push(world_aabb(&index.local_aabb(), &solid.transform));
            leaves.push(PickLeaf {
                solid: solid.id,
                index,
                inverse,
            });
        }

        let mut nodes = Vec::with_capacity(leaves.len() * 2);
        let mut order: Vec<usize> = (0..leaves.len()).collect();
        let root = if order.is_empty() {
            None
        } else {
            Some(Self::build_range(&mut nodes, &leaf_bounds, &mut order))
        };

        Ok(PlatePickTree {
            leaves,
            nodes,
            root,
        })
    }

    /// Median split along the longest axis of the centroid spread.
    fn build_range(nodes: &mut Vec<PickNode>, bounds: &[Aabb], order: &mut [usize]) -> usize {
        if let [leaf] = order {
            nodes.push(PickNode::Leaf {
                bounds: bounds[*leaf],
                leaf: *leaf,
            });
            return nodes.len() - 1;
        }

        let centers = bounds_of_points(order.iter().map(|&i| bounds[i].center()));
        let axis = centers.extents().imax();
        order.sort_by(|&a, &b| bounds[a].center()[axis].total_cmp(&bounds[b].center()[axis]));

        let (left_half, right_half) = order.split_at_mut(order.len() / 2);
        let left = Self::build_range(nodes, bounds, left_half);
        let right = Self::build_range(nodes, bounds, right_half);
        let merged = bounds_of_points(
            [nodes[left].bounds(), nodes[right].bounds()]
                .into_iter()
                .flat_map(|b| [b.mins, b.maxs]),
        );
        nodes.push(PickNode::Branch {
            bounds: merged,
            left,
            right,
        });
        nodes.len() - 1
    }

    /// Number of solids in the tree.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Closest hit of a world-space ray within `max_distance`.
    pub fn cast_ray(&self, ray: &Ray, max_distance: Real) -> Option<PlateHit> {
        let root = self.root?;
        let speed = ray.dir.norm();
        if speed <= Real::EPSILON {
            return None;
        }

        // ray parameters are shared between world and local space
        let mut best_toi = max_distance / speed;
        let mut best: Option<(usize, usize, Real)> = None;

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.nodes[node]
                .bounds()
                .cast_local_ray(ray, best_toi, true)
                .is_none()
            {
                continue;
            }

            match self.nodes[node] {
                PickNode::Branch { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                },
                PickNode::Leaf { leaf, .. } => {
                    let target = &self.leaves[leaf];
                    let local = Ray::new(
                        target.inverse.transform_point(&ray.origin),
                        target.inverse.transform_vector(&ray.dir),
                    );
                    if let Some((face, toi)) = target.index.cast_local_ray(&local, best_toi) {
                        if toi <= best_toi {
                            best_toi = toi;
                            best = Some((leaf, face, toi));
                        }
                    }
                },
            }
        }

        best.map(|(leaf, face, toi)| PlateHit {
            solid: self.leaves[leaf].solid,
            face,
            point: ray.point_at(toi),
            distance: toi * speed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_is_convex_and_dart_is_not() {
        let square = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        assert!(is_convex_planar(&square));

        let dart = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.5, 0.5, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        assert!(!is_convex_planar(&dart));
    }

    #[test]
    fn warped_quad_is_not_planar() {
        let warped = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.5),
            Point3::new(0.0, 1.0, 0.0),
        ];
        assert!(!is_convex_planar(&warped));
    }
}
