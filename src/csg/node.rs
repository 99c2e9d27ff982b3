//! [BSP](https://en.wikipedia.org/wiki/Binary_space_partitioning) tree node structure and operations
//!
//! Every traversal uses an explicit stack; plate merges can feed tens of
//! thousands of polygons through one tree.

use crate::csg::plane::{BACK, COPLANAR, FRONT, Plane};
use crate::csg::polygon::Polygon;
use crate::float_types::Real;

/// A BSP tree node, containing polygons plus optional front/back subtrees
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// Splitting plane for this node, or `None` for a node that has not been built yet
    pub plane: Option<Plane>,

    /// Subtree in front of `plane`
    pub front: Option<Box<Node>>,

    /// Subtree behind `plane`
    pub back: Option<Box<Node>>,

    /// Polygons lying on `plane`
    pub polygons: Vec<Polygon>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree over `polygons`.
    pub fn from_polygons(polygons: &[Polygon]) -> Self {
        let mut node = Self::new();
        if !polygons.is_empty() {
            node.build(polygons);
        }
        node
    }

    /// Swap solid and empty space.
    pub fn invert(&mut self) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.polygons.iter_mut().for_each(Polygon::flip);
            if let Some(plane) = node.plane.as_mut() {
                plane.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);

            if let Some(front) = node.front.as_deref_mut() {
                stack.push(front);
            }
            if let Some(back) = node.back.as_deref_mut() {
                stack.push(back);
            }
        }
    }

    /// Choose a splitting plane among the first few polygons, penalising
    /// spanning polygons most and front/back imbalance a little.
    pub fn pick_best_splitting_plane(polygons: &[Polygon]) -> Plane {
        const K_SPANS: Real = 8.0;
        const K_BALANCE: Real = 1.0;

        let mut best_plane = polygons[0].plane.clone();
        let mut best_score = Real::MAX;

        for candidate in polygons.iter().take(20) {
            let plane = &candidate.plane;
            let (mut front, mut back, mut spanning) = (0i64, 0i64, 0i64);
            for polygon in polygons {
                match plane.classify_polygon(polygon) {
                    COPLANAR => {},
                    FRONT => front += 1,
                    BACK => back += 1,
                    _ => spanning += 1,
                }
            }
            let score = K_SPANS * spanning as Real + K_BALANCE * ((front - back) as Real).abs();
            if score < best_score {
                best_score = score;
                best_plane = plane.clone();
            }
        }
        best_plane
    }

    /// Remove the parts of `polygons` that are inside this tree.
    pub fn clip_polygons(&self, polygons: &[Polygon]) -> Vec<Polygon> {
        let mut result = Vec::new();
        let mut stack = vec![(self, polygons.to_vec())];

        while let Some((node, polys)) = stack.pop() {
            let Some(plane) = node.plane.as_ref() else {
                result.extend(polys);
                continue;
            };

            let mut front_polys = Vec::with_capacity(polys.len());
            let mut back_polys = Vec::with_capacity(polys.len());

            for polygon in &polys {
                let (coplanar_front, coplanar_back, mut front_parts, mut back_parts) =
                    plane.split_polygon(polygon);

                for coplanar in coplanar_front.into_iter().chain(coplanar_back) {
                    if plane.orient_plane(&coplanar.plane) == FRONT {
                        front_parts.push(coplanar);
                    } else {
                        back_parts.push(coplanar);
                    }
                }

                front_polys.append(&mut front_parts);
                back_polys.append(&mut back_parts);
            }

            match node.front.as_deref() {
                Some(front) if !front_polys.is_empty() => stack.push((front, front_polys)),
                Some(_) => {},
                None => result.extend(front_polys),
            }

            // polygons behind a leaf plane are inside the solid and dropped
            if let Some(back) = node.back.as_deref() {
                if !back_polys.is_empty() {
                    stack.push((back, back_polys));
                }
            }
        }
        result
    }

    /// Remove every polygon of this tree that is inside `bsp`.
    pub fn clip_to(&mut self, bsp: &Node) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.polygons = bsp.clip_polygons(&node.polygons);
            if let Some(front) = node.front.as_deref_mut() {
                stack.push(front);
            }
            if let Some(back) = node.back.as_deref_mut() {
                stack.push(back);
            }
        }
    }

    /// All polygons stored anywhere in the tree.
    pub fn all_polygons(&self) -> Vec<Polygon> {
        let mut result = Vec::new();
        let mut stack = vec![self];

        while let Some(node) = stack.pop() {
            result.extend_from_slice(&node.polygons);
            stack.extend(
                [&node.front, &node.back]
                    .into_iter()
                    .filter_map(|child| child.as_deref()),
            );
        }
        result
    }

    /// Insert `polygons` into the tree, splitting them as needed.
    pub fn build(&mut self, polygons: &[Polygon]) {
        if polygons.is_empty() {
            return;
        }

        let mut stack = vec![(self, polygons.to_vec())];
        while let Some((node, polys)) = stack.pop() {
            if polys.is_empty() {
                continue;
            }

            let plane = node
                .plane
                .get_or_insert_with(|| Node::pick_best_splitting_plane(&polys))
                .clone();

            let mut front = Vec::with_capacity(polys.len() / 2);
            let mut back = Vec::with_capacity(polys.len() / 2);

            for polygon in &polys {
                let (coplanar_front, coplanar_back, mut front_parts, mut back_parts) =
                    plane.split_polygon(polygon);
                node.polygons.extend(coplanar_front);
                node.polygons.extend(coplanar_back);
                front.append(&mut front_parts);
                back.append(&mut back_parts);
            }

            if !front.is_empty() {
                let front_node = node.front.get_or_insert_with(|| Box::new(Node::new()));
                stack.push((front_node.as_mut(), front));
            }
            if !back.is_empty() {
                let back_node = node.back.get_or_insert_with(|| Box::new(Node::new()));
                stack.push((back_node.as_mut(), back));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csg::polygon::polygons_of;
    use crate::mesh::shapes::cube;

    #[test]
    fn building_keeps_every_polygon() {
        let polygons = polygons_of(&cube(1.0));
        let node = Node::from_polygons(&polygons);
        assert_eq!(node.all_polygons().len(), 6);
    }

    #[test]
    fn tree_clips_polygons_inside_it() {
        let tree = Node::from_polygons(&polygons_of(&cube(2.0)));
        let offset = nalgebra::Matrix4::new_translation(&nalgebra::Vector3::new(0.5, 0.5, 0.5));
        let inner = cube(1.0).transform(&offset);
        assert!(tree.clip_polygons(&polygons_of(&inner)).is_empty());
    }
}
