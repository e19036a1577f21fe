//! Bounding boxes of masks and world-space grids over them.

use nalgebra::{Matrix4, Vector4};
use ndarray::{Array3, Axis};

/// Half-open voxel range `[start, end)` along one axis.
pub type AxisRange = (usize, usize);

/// Tight bounding box of the nonzero voxels, grown by `margin` per side.
///
/// Each range is clamped to `[0, n)`. A mask without any nonzero voxel
/// yields `(0, 0)` on every axis.
pub fn truncation_boundaries(mask: &Array3<f64>, margin: usize) -> [AxisRange; 3] {
    let mut bounds = [(0, 0); 3];
    for (axis, bound) in bounds.iter_mut().enumerate() {
        let n = mask.len_of(Axis(axis));
        let occupied: Vec<usize> = mask
            .axis_iter(Axis(axis))
            .enumerate()
            .filter(|(_, slab)| slab.iter().any(|&v| v != 0.0))
            .map(|(i, _)| i)
            .collect();
        if let (Some(&first), Some(&last)) = (occupied.first(), occupied.last()) {
            *bound = (first.saturating_sub(margin), (last + margin + 1).min(n));
        }
    }
    bounds
}

/// Voxel indices of a box in C order (first axis slowest), mapped through
/// `affine` to homogeneous world points.
pub fn box_world_points(bounds: &[AxisRange; 3], affine: &Matrix4<f64>) -> Vec<Vector4<f64>> {
    let extent: usize = bounds.iter().map(|(s, e)| e - s).product();
    let mut points = Vec::with_capacity(extent);
    for i in bounds[0].0..bounds[0].1 {
        for j in bounds[1].0..bounds[1].1 {
            for k in bounds[2].0..bounds[2].1 {
                points.push(affine * Vector4::new(i as f64, j as f64, k as f64, 1.0));
            }
        }
    }
    points
}
