//! Read-only adjacency queries over a [`Mesh`].
//!
//! Vertex→face incidence is stored in compressed rows: the faces touching
//! vertex `v` are `face_ids[offsets[v]..offsets[v + 1]]`.

use crate::mesh::Mesh;

#[derive(Debug, Clone)]
pub struct MeshTopology {
    offsets: Vec<usize>,
    face_ids: Vec<usize>,
    face_vertices: Vec<Vec<usize>>,
}

impl MeshTopology {
    /// Build the incidence tables for `mesh`.
    pub fn new(mesh: &Mesh) -> Self {
        let vertex_count = mesh.vertices.len();

        let mut counts = vec![0usize; vertex_count];
        for face in &mesh.faces {
            for &v in &face.indices {
                counts[v] += 1;
            }
        }

        let mut offsets = Vec::with_capacity(vertex_count + 1);
        offsets.push(0);
        for count in &counts {
            offsets.push(offsets[offsets.len() - 1] + count);
        }

        let mut cursor = offsets[..vertex_count].to_vec();
        let mut face_ids = vec![0usize; offsets[vertex_count]];
        for (face_index, face) in mesh.faces.iter().enumerate() {
            for &v in &face.indices {
                face_ids[cursor[v]] = face_index;
                cursor[v] += 1;
            }
        }

        // a face listing the same vertex twice must still appear once per vertex
        for v in 0..vertex_count {
            let row = &mut face_ids[offsets[v]..offsets[v + 1]];
            row.sort_unstable();
        }
        let mut compact_offsets = Vec::with_capacity(vertex_count + 1);
        let mut compact_ids = Vec::with_capacity(face_ids.len());
        compact_offsets.push(0);
        for v in 0..vertex_count {
            let mut previous = None;
            for &f in &face_ids[offsets[v]..offsets[v + 1]] {
                if previous != Some(f) {
                    compact_ids.push(f);
                    previous = Some(f);
                }
            }
            compact_offsets.push(compact_ids.len());
        }

        MeshTopology {
            offsets: compact_offsets,
            face_ids: compact_ids,
            face_vertices: mesh.faces.iter().map(|f| f.indices.clone()).collect(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn face_count(&self) -> usize {
        self.face_vertices.len()
    }

    /// Faces that reference vertex `vertex`, in ascending order.
    pub fn faces_around_vertex(&self, vertex: usize) -> &[usize] {
        &self.face_ids[self.offsets[vertex]..self.offsets[vertex + 1]]
    }

    /// Vertex indices of `face`, in winding order.
    pub fn face_vertices(&self, face: usize) -> &[usize] {
        &self.face_vertices[face]
    }

    /// Number of faces meeting at `vertex`.
    pub fn valence(&self, vertex: usize) -> usize {
        self.offsets[vertex + 1] - self.offsets[vertex]
    }

    /// Vertices no face references.
    pub fn isolated_vertices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.vertex_count()).filter(|&v| self.valence(v) == 0)
    }

    /// Faces sharing at least one vertex with `face`, excluding `face` itself.
    /// May repeat a neighbor that shares several vertices.
    pub fn face_neighbors(&self, face: usize) -> impl Iterator<Item = usize> + '_ {
        self.face_vertices(face)
            .iter()
            .flat_map(move |&v| self.faces_around_vertex(v).iter().copied())
            .filter(move |&other| other != face)
    }
}
