//! Volume sampling grid over the truncated brain mask.

use nalgebra::Matrix4;

use super::SamplingBatch;
use crate::image::grid::{box_world_points, truncation_boundaries, AxisRange};
use crate::image::Volume;

/// Truncated voxel grid in canonical orientation.
#[derive(Debug, Clone)]
pub struct VolumeGrid {
    /// Sampling points over the truncated box.
    pub batch: SamplingBatch,
    /// Box in canonical voxel indices, half-open per axis.
    pub bounds: [AxisRange; 3],
    /// Voxel-to-world affine of the canonical mask.
    pub canonical_affine: Matrix4<f64>,
}

impl VolumeGrid {
    /// Affine of the truncated output grid: its voxel `(0, 0, 0)` is the
    /// box corner.
    pub fn output_affine(&self) -> Matrix4<f64> {
        let mut shift = Matrix4::identity();
        for (axis, (start, _)) in self.bounds.iter().enumerate() {
            shift[(axis, 3)] = *start as f64;
        }
        self.canonical_affine * shift
    }
}

/// Sampling grid over the brain mask's bounding box.
///
/// The mask is reoriented to the closest canonical (RAS+) axis order, the
/// nonzero bounding box is grown by `margin` voxels per side, and its voxels
/// are enumerated in C order and mapped to world coordinates. An all-zero
/// mask gives an empty batch with zero extents.
pub fn canonical_volume_coords(mask: &Volume, margin: usize) -> VolumeGrid {
    let canonical = mask.as_closest_canonical();
    let bounds = truncation_boundaries(canonical.data(), margin);
    let points = box_world_points(&bounds, canonical.affine());
    let shape = bounds.iter().map(|(s, e)| e - s).collect();
    VolumeGrid {
        batch: SamplingBatch::new(points, shape, None),
        bounds,
        canonical_affine: *canonical.affine(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;
    use ndarray::Array3;

    #[test]
    fn test_all_zero_mask_is_empty_safe() {
        let grid = canonical_volume_coords(&Volume::new(Array3::zeros((6, 5, 4)), Matrix4::identity()), 2);
        assert!(grid.batch.is_empty());
        assert_eq!(grid.batch.shape(), &[0, 0, 0]);
        assert_eq!(grid.batch.n_outputs(), 0);
    }

    #[test]
    fn test_box_points_in_world_space() {
        let mut data = Array3::zeros((8, 8, 8));
        data[[4, 4, 4]] = 1.0;
        let mut aff = Matrix4::identity() * 2.0;
        aff[(3, 3)] = 1.0;
        aff[(0, 3)] = -8.0;
        let grid = canonical_volume_coords(&Volume::new(data, aff), 1);
        assert_eq!(grid.bounds, [(3, 6), (3, 6), (3, 6)]);
        assert_eq!(grid.batch.shape(), &[3, 3, 3]);
        assert_eq!(grid.batch.points()[0], Vector4::new(-2.0, 6.0, 6.0, 1.0));
        assert_eq!(grid.output_affine() * Vector4::new(0.0, 0.0, 0.0, 1.0), grid.batch.points()[0]);
    }

    #[test]
    fn test_flipped_mask_is_reoriented() {
        let mut data = Array3::zeros((4, 4, 4));
        data[[0, 1, 2]] = 1.0;
        let aff = Matrix4::from_diagonal(&Vector4::new(-1.0, 1.0, 1.0, 1.0));
        let grid = canonical_volume_coords(&Volume::new(data, aff), 0);
        // voxel 0 along a flipped axis becomes canonical index 3
        assert_eq!(grid.bounds, [(3, 4), (1, 2), (2, 3)]);
        assert_eq!(grid.batch.points()[0], Vector4::new(0.0, 1.0, 2.0, 1.0));
    }
}
