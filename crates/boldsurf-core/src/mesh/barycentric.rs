//! Barycentric point location on spherical meshes.
//!
//! Used to carry per-vertex fields (white and pial coordinates) from one
//! sphere-registered topology onto another.

use std::collections::BTreeSet;

use nalgebra::Vector3;

use super::kdtree::KdTree;
use super::Mesh;

const INSIDE_TOLERANCE: f64 = 1e-10;

/// Containing face and blending weights for one query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarycentricWeights {
    pub face: usize,
    pub vertices: [usize; 3],
    pub weights: [f64; 3],
}

impl BarycentricWeights {
    /// Blend a per-vertex field at this location.
    pub fn blend(&self, field: &[Vector3<f64>]) -> Vector3<f64> {
        self.vertices
            .iter()
            .zip(&self.weights)
            .fold(Vector3::zeros(), |acc, (&v, &w)| acc + field[v] * w)
    }
}

/// Point locator over a spherical mesh.
///
/// Vertices and queries are projected to the unit sphere. A query is cast as
/// a ray from the origin and intersected with faces around its nearest
/// vertex: first the faces touching that vertex, then the faces touching
/// any of their vertices. When no candidate contains the ray, the face with
/// the largest minimum weight is used after clamping negative weights to
/// zero and renormalizing.
#[derive(Debug, Clone)]
pub struct BarycentricLocator {
    vertices: Vec<Vector3<f64>>,
    faces: Vec<[usize; 3]>,
    vertex_faces: Vec<Vec<usize>>,
    tree: KdTree,
}

impl BarycentricLocator {
    /// # Panics
    /// If the mesh has no faces.
    pub fn new(sphere: &Mesh) -> Self {
        assert!(sphere.n_faces() > 0, "spherical mesh has no faces");
        let vertices: Vec<Vector3<f64>> = sphere.vertices().iter().map(|v| v.normalize()).collect();
        let mut vertex_faces = vec![Vec::new(); vertices.len()];
        for (f, face) in sphere.faces().iter().enumerate() {
            for &v in face {
                vertex_faces[v].push(f);
            }
        }
        let tree = KdTree::new(&vertices);
        Self {
            vertices,
            faces: sphere.faces().to_vec(),
            vertex_faces,
            tree,
        }
    }

    pub fn locate(&self, query: &Vector3<f64>) -> BarycentricWeights {
        let q = query.normalize();

        let mut ring: BTreeSet<usize> = BTreeSet::new();
        if let Some((nearest, _)) = self.tree.nearest(&q) {
            ring.extend(self.vertex_faces[nearest].iter().copied());
            if let Some(hit) = self.best_face(&q, ring.iter().copied()) {
                if min3(&hit.weights) >= -INSIDE_TOLERANCE {
                    return hit;
                }
            }

            let second: BTreeSet<usize> = ring
                .iter()
                .flat_map(|&f| self.faces[f].iter())
                .flat_map(|&v| self.vertex_faces[v].iter().copied())
                .collect();
            ring.extend(second);
        }

        let hit = self
            .best_face(&q, ring.iter().copied())
            .or_else(|| self.best_face(&q, 0..self.faces.len()));

        match hit {
            Some(hit) if min3(&hit.weights) >= -INSIDE_TOLERANCE => hit,
            Some(hit) => clamp_weights(hit),
            None => BarycentricWeights {
                face: 0,
                vertices: self.faces[0],
                weights: [f64::NAN; 3],
            },
        }
    }

    pub fn locate_all(&self, queries: &[Vector3<f64>]) -> Vec<BarycentricWeights> {
        queries.iter().map(|q| self.locate(q)).collect()
    }

    /// Candidate with the largest minimum weight; first wins on ties.
    fn best_face(&self, q: &Vector3<f64>, candidates: impl Iterator<Item = usize>) -> Option<BarycentricWeights> {
        let mut best: Option<BarycentricWeights> = None;
        for f in candidates {
            let Some(weights) = self.ray_weights(q, f) else {
                continue;
            };
            let better = match &best {
                Some(b) => min3(&weights) > min3(&b.weights),
                None => true,
            };
            if better {
                best = Some(BarycentricWeights {
                    face: f,
                    vertices: self.faces[f],
                    weights,
                });
            }
        }
        best
    }

    /// Barycentric weights of the point where the ray through `q` meets the
    /// plane of face `f`. `None` when the ray is parallel to the plane or
    /// meets it behind the origin.
    fn ray_weights(&self, q: &Vector3<f64>, f: usize) -> Option<[f64; 3]> {
        let [ia, ib, ic] = self.faces[f];
        let a = self.vertices[ia];
        let b = self.vertices[ib];
        let c = self.vertices[ic];

        let n = (b - a).cross(&(c - a));
        let denom = q.dot(&n);
        if !(denom.abs() > f64::EPSILON) {
            return None;
        }
        let t = a.dot(&n) / denom;
        if !(t > 0.0) {
            return None;
        }
        let p = q * t;

        let v0 = b - a;
        let v1 = c - a;
        let v2 = p - a;
        let d00 = v0.dot(&v0);
        let d01 = v0.dot(&v1);
        let d11 = v1.dot(&v1);
        let d20 = v2.dot(&v0);
        let d21 = v2.dot(&v1);
        let det = d00 * d11 - d01 * d01;
        if det == 0.0 {
            return None;
        }
        let wb = (d11 * d20 - d01 * d21) / det;
        let wc = (d00 * d21 - d01 * d20) / det;
        Some([1.0 - wb - wc, wb, wc])
    }
}

fn min3(w: &[f64; 3]) -> f64 {
    w[0].min(w[1]).min(w[2])
}

fn clamp_weights(mut hit: BarycentricWeights) -> BarycentricWeights {
    let clamped = hit.weights.map(|w| w.max(0.0));
    let total: f64 = clamped.iter().sum();
    hit.weights = clamped.map(|w| w / total);
    hit
}

/// Locate every `target` point on `sphere`.
pub fn barycentric_resample(sphere: &Mesh, targets: &[Vector3<f64>]) -> Vec<BarycentricWeights> {
    BarycentricLocator::new(sphere).locate_all(targets)
}

/// Blend a per-vertex field at every located point.
pub fn resample_field(field: &[Vector3<f64>], located: &[BarycentricWeights]) -> Vec<Vector3<f64>> {
    located.iter().map(|w| w.blend(field)).collect()
}
