//! Per-vertex normals.
//!
//! Both schemes accumulate per-face contributions and normalize at the end.
//! A vertex whose accumulated normal has zero length ends up NaN; callers
//! see that downstream as missing samples.

use nalgebra::Vector3;

/// Sine-weighted vertex normals.
///
/// Per face the unit edges are `e0 = v2 - v0`, `e1 = v0 - v1`,
/// `e2 = v1 - v2`. Vertex `k` receives `e_k × e_{k+1}`, whose length is the
/// sine of the interior angle at that vertex.
pub fn vertex_normals_sine_weight(coords: &[Vector3<f64>], faces: &[[usize; 3]]) -> Vec<Vector3<f64>> {
    let mut normals = vec![Vector3::zeros(); coords.len()];
    for face in faces {
        let v = [coords[face[0]], coords[face[1]], coords[face[2]]];
        let edges = [
            (v[2] - v[0]).normalize(),
            (v[0] - v[1]).normalize(),
            (v[1] - v[2]).normalize(),
        ];
        for k in 0..3 {
            normals[face[k]] += edges[k].cross(&edges[(k + 1) % 3]);
        }
    }
    normals.iter().map(|n| n / n.norm()).collect()
}

/// Equal-weighted vertex normals.
///
/// Each face contributes its unit normal `(v1 - v0) × (v2 - v1)` once to
/// each of its three vertices.
pub fn vertex_normals_equal_weight(coords: &[Vector3<f64>], faces: &[[usize; 3]]) -> Vec<Vector3<f64>> {
    let mut normals = vec![Vector3::zeros(); coords.len()];
    for face in faces {
        let v0 = coords[face[0]];
        let v1 = coords[face[1]];
        let v2 = coords[face[2]];
        let n = (v1 - v0).cross(&(v2 - v1)).normalize();
        for &i in face {
            normals[i] += n;
        }
    }
    normals.iter().map(|n| n / n.norm()).collect()
}
