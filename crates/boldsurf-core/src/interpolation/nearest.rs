//! Nearest neighbor interpolation implementation.

use nalgebra::Vector3;
use ndarray::Array3;

use super::in_bounds;
use super::trait_::Interpolator;

/// Nearest Neighbor Interpolator (spline order 0).
///
/// Rounds half up: `floor(x + 0.5)`.
#[derive(Debug, Clone, Copy)]
pub struct NearestNeighborInterpolator {
    cval: f64,
}

impl NearestNeighborInterpolator {
    /// Create a new interpolator returning NaN outside the grid.
    pub fn new() -> Self {
        Self { cval: f64::NAN }
    }

    pub fn with_cval(mut self, cval: f64) -> Self {
        self.cval = cval;
        self
    }
}

impl Default for NearestNeighborInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpolator for NearestNeighborInterpolator {
    fn sample(&self, data: &Array3<f64>, index: &Vector3<f64>) -> f64 {
        let shape = data.shape();
        if !in_bounds(shape, index) {
            return self.cval;
        }
        let mut voxel = [0usize; 3];
        for axis in 0..3 {
            voxel[axis] = ((index[axis] + 0.5).floor() as usize).min(shape[axis] - 1);
        }
        data[voxel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_half_up() {
        let data = Array3::from_shape_fn((3, 1, 1), |(i, _, _)| i as f64 * 10.0);
        let interp = NearestNeighborInterpolator::new();
        assert_eq!(interp.sample(&data, &Vector3::new(0.5, 0.0, 0.0)), 10.0);
        assert_eq!(interp.sample(&data, &Vector3::new(1.49, 0.0, 0.0)), 10.0);
        assert_eq!(interp.sample(&data, &Vector3::new(2.0, 0.0, 0.0)), 20.0);
    }

    #[test]
    fn test_outside_returns_cval() {
        let data = Array3::from_elem((2, 2, 2), 1.0);
        let interp = NearestNeighborInterpolator::new().with_cval(-1.0);
        assert_eq!(interp.sample(&data, &Vector3::new(0.0, 2.5, 0.0)), -1.0);
        assert!(NearestNeighborInterpolator::new()
            .sample(&data, &Vector3::new(-0.2, 0.0, 0.0))
            .is_nan());
    }
}
