//! Sampling point batches and the generators that produce them.
//!
//! Every generator returns homogeneous world points (`w = 1`) in RAS mm,
//! flattened in C order, together with the logical output shape.

pub mod surface;
pub mod volume;

use nalgebra::Vector4;

pub use surface::{default_depth_fractions, surface_coords_normal, surface_coords_pial};
pub use volume::{canonical_volume_coords, VolumeGrid};

/// Flattened sampling points plus their logical shape.
///
/// When `depth` is set the last axis of `shape` is a depth axis of that
/// length which is averaged away after interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingBatch {
    points: Vec<Vector4<f64>>,
    shape: Vec<usize>,
    depth: Option<usize>,
}

impl SamplingBatch {
    /// # Panics
    /// If the point count disagrees with `shape`, or `depth` is not the
    /// length of the last axis.
    pub fn new(points: Vec<Vector4<f64>>, shape: Vec<usize>, depth: Option<usize>) -> Self {
        assert_eq!(
            shape.iter().product::<usize>(),
            points.len(),
            "point count must match batch shape {:?}",
            shape
        );
        if let Some(d) = depth {
            assert_eq!(shape.last().copied(), Some(d), "depth must be the trailing axis");
        }
        Self { points, shape, depth }
    }

    pub fn points(&self) -> &[Vector4<f64>] {
        &self.points
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shape of one interpolated volume after the depth axis is averaged.
    pub fn output_shape(&self) -> Vec<usize> {
        match self.depth {
            Some(_) => self.shape[..self.shape.len() - 1].to_vec(),
            None => self.shape.clone(),
        }
    }

    /// Number of values one interpolated volume reduces to.
    pub fn n_outputs(&self) -> usize {
        self.output_shape().iter().product()
    }

    /// Collapse per-point samples to per-output values.
    ///
    /// With a depth axis each run of `depth` consecutive samples becomes
    /// its NaN-ignoring mean. A run that is entirely NaN stays NaN.
    pub fn reduce(&self, samples: Vec<f64>) -> Vec<f64> {
        debug_assert_eq!(samples.len(), self.points.len());
        match self.depth {
            Some(d) if d > 0 => samples.chunks(d).map(nan_mean).collect(),
            _ => samples,
        }
    }
}

/// Mean over the non-NaN entries; NaN when there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_mean_policy() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean(&[f64::NAN, f64::NAN]).is_nan());
        assert_eq!(nan_mean(&[4.0]), 4.0);
    }

    #[test]
    fn test_reduce_over_depth() {
        let pts = vec![Vector4::new(0.0, 0.0, 0.0, 1.0); 6];
        let batch = SamplingBatch::new(pts, vec![2, 3], Some(3));
        assert_eq!(batch.output_shape(), vec![2]);
        let out = batch.reduce(vec![1.0, 2.0, 3.0, f64::NAN, f64::NAN, f64::NAN]);
        assert_eq!(out[0], 2.0);
        assert!(out[1].is_nan());
    }

    #[test]
    fn test_reduce_without_depth_is_identity() {
        let pts = vec![Vector4::new(0.0, 0.0, 0.0, 1.0); 4];
        let batch = SamplingBatch::new(pts, vec![1, 2, 2], None);
        assert_eq!(batch.n_outputs(), 4);
        assert_eq!(batch.reduce(vec![1.0, 2.0, 3.0, 4.0]), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    #[should_panic(expected = "point count must match")]
    fn test_shape_mismatch_panics() {
        SamplingBatch::new(vec![Vector4::zeros(); 3], vec![2, 2], None);
    }
}
