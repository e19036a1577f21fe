//! Triangle meshes and the geometry kernel operating on them.
//!
//! * [`normals`]: per-vertex normals (sine-weighted and equal-weighted)
//! * [`kdtree`]: nearest-neighbour search over vertex clouds
//! * [`correspondence`]: sparse nearest-neighbour transport between spheres
//! * [`barycentric`]: point location on a spherical mesh and field blending

pub mod barycentric;
pub mod correspondence;
pub mod kdtree;
pub mod normals;

use nalgebra::Vector3;

pub use barycentric::BarycentricLocator;
pub use correspondence::{mesh_correspondence, MeshCorrespondence};
pub use kdtree::KdTree;
pub use normals::{vertex_normals_equal_weight, vertex_normals_sine_weight};

/// Triangle mesh: vertex coordinates and index triples.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vector3<f64>>,
    faces: Vec<[usize; 3]>,
}

impl Mesh {
    /// Build a mesh.
    ///
    /// # Panics
    /// If any face references a vertex index out of range.
    pub fn new(vertices: Vec<Vector3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        let n = vertices.len();
        assert!(
            faces.iter().flatten().all(|&i| i < n),
            "face index out of range for mesh with {} vertices",
            n
        );
        Self { vertices, faces }
    }

    pub fn vertices(&self) -> &[Vector3<f64>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn into_parts(self) -> (Vec<Vector3<f64>>, Vec<[usize; 3]>) {
        (self.vertices, self.faces)
    }
}

#[cfg(test)]
pub(crate) mod test_meshes {
    use super::*;

    /// Unit cube split into 12 outward-facing triangles.
    pub fn cube() -> Mesh {
        let v = |x: f64, y: f64, z: f64| Vector3::new(x, y, z);
        let vertices = vec![
            v(0.0, 0.0, 0.0),
            v(1.0, 0.0, 0.0),
            v(1.0, 1.0, 0.0),
            v(0.0, 1.0, 0.0),
            v(0.0, 0.0, 1.0),
            v(1.0, 0.0, 1.0),
            v(1.0, 1.0, 1.0),
            v(0.0, 1.0, 1.0),
        ];
        let faces = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 6, 2],
            [3, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        Mesh::new(vertices, faces)
    }

    /// Regular octahedron on the unit sphere.
    pub fn octahedron() -> Mesh {
        let vertices = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
        ];
        let faces = vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        Mesh::new(vertices, faces)
    }

    #[test]
    #[should_panic(expected = "face index out of range")]
    fn test_invalid_face_index_panics() {
        Mesh::new(vec![Vector3::zeros(); 2], vec![[0, 1, 2]]);
    }
}
