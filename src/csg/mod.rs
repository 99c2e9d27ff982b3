//! Boolean union of closed solids through BSP trees.
//!
//! Only union is needed here: plates are merged into one printable body, never
//! subtracted or intersected.

pub mod node;
pub mod plane;
pub mod polygon;

use crate::mesh::Mesh;
use node::Node;
use polygon::{Polygon, mesh_of, polygons_of};

/// Union of two polygon sets, each bounding a closed solid.
///
/// Both operands go into full trees: a polygon of one solid can be clipped by
/// the other even when it lies outside that solid's bounds, e.g. when one
/// solid contains the other.
pub fn union_polygons(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    if a.is_empty() {
        return b;
    }
    if b.is_empty() {
        return a;
    }

    let mut a_node = Node::from_polygons(&a);
    let mut b_node = Node::from_polygons(&b);

    a_node.clip_to(&b_node);
    b_node.clip_to(&a_node);
    b_node.invert();
    b_node.clip_to(&a_node);
    b_node.invert();
    a_node.build(&b_node.all_polygons());

    a_node.all_polygons()
}

/// Union of two meshes in the same coordinate space. The result is not cleaned.
pub fn union(a: &Mesh, b: &Mesh) -> Mesh {
    mesh_of(&union_polygons(polygons_of(a), polygons_of(b)))
}
