//! Interpolator trait for sampling values at continuous coordinates.

use nalgebra::Vector3;
use ndarray::Array3;

/// Interpolator trait for sampling a 3-D array at continuous voxel indices.
///
/// Indices are in array order, `(i, j, k)` addressing `data[[i, j, k]]`.
/// Points outside `[0, len - 1]` on any axis yield the interpolator's
/// constant value instead of being extrapolated.
pub trait Interpolator {
    /// Sample one point.
    fn sample(&self, data: &Array3<f64>, index: &Vector3<f64>) -> f64;

    /// Sample a batch of points.
    ///
    /// # Returns
    /// One value per entry of `indices`, in order.
    fn interpolate(&self, data: &Array3<f64>, indices: &[Vector3<f64>]) -> Vec<f64> {
        indices.iter().map(|idx| self.sample(data, idx)).collect()
    }
}
