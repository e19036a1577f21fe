//! Depth-sampled points between the white and pial surfaces.

use nalgebra::{Vector3, Vector4};

use super::SamplingBatch;

/// Six evenly spaced cortical depth fractions from white (0) to pial (1).
pub fn default_depth_fractions() -> Vec<f64> {
    linspace(0.0, 1.0, 6)
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Points displaced from the white surface along the vertex normals.
///
/// Point `(v, f)` is `white[v] + c_ras + normal[v] * thickness[v] * f`.
/// Shape `(n_vertices, n_fracs)`, depth axis `n_fracs`.
///
/// # Panics
/// If the per-vertex inputs differ in length.
pub fn surface_coords_normal(
    white: &[Vector3<f64>],
    c_ras: &Vector3<f64>,
    normals: &[Vector3<f64>],
    thickness: &[f64],
    fracs: &[f64],
) -> SamplingBatch {
    assert_eq!(white.len(), normals.len(), "one normal per vertex");
    assert_eq!(white.len(), thickness.len(), "one thickness per vertex");

    let mut points = Vec::with_capacity(white.len() * fracs.len());
    for ((w, n), &t) in white.iter().zip(normals).zip(thickness) {
        let base = w + c_ras;
        for &f in fracs {
            points.push(homogeneous(base + n * (t * f)));
        }
    }
    SamplingBatch::new(points, vec![white.len(), fracs.len()], Some(fracs.len()))
}

/// Points interpolated linearly between matching white and pial vertices.
///
/// Point `(v, f)` is `(white[v] + c_ras)(1 - f) + (pial[v] + c_ras) f`.
///
/// # Panics
/// If `white` and `pial` differ in length.
pub fn surface_coords_pial(
    white: &[Vector3<f64>],
    c_ras: &Vector3<f64>,
    pial: &[Vector3<f64>],
    fracs: &[f64],
) -> SamplingBatch {
    assert_eq!(white.len(), pial.len(), "white and pial vertex counts differ");

    let mut points = Vec::with_capacity(white.len() * fracs.len());
    for (w, p) in white.iter().zip(pial) {
        let inner = w + c_ras;
        let outer = p + c_ras;
        for &f in fracs {
            points.push(homogeneous(inner * (1.0 - f) + outer * f));
        }
    }
    SamplingBatch::new(points, vec![white.len(), fracs.len()], Some(fracs.len()))
}

fn homogeneous(p: Vector3<f64>) -> Vector4<f64> {
    Vector4::new(p.x, p.y, p.z, 1.0)
}
