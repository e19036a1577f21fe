//! Linear interpolation implementation.

use nalgebra::Vector3;
use ndarray::Array3;

use super::in_bounds;
use super::trait_::Interpolator;

/// Linear Interpolator (spline order 1).
///
/// Trilinear blend of the eight surrounding voxels.
#[derive(Debug, Clone, Copy)]
pub struct LinearInterpolator {
    cval: f64,
}

impl LinearInterpolator {
    /// Create a new interpolator returning NaN outside the grid.
    pub fn new() -> Self {
        Self { cval: f64::NAN }
    }

    pub fn with_cval(mut self, cval: f64) -> Self {
        self.cval = cval;
        self
    }
}

impl Default for LinearInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpolator for LinearInterpolator {
    fn sample(&self, data: &Array3<f64>, index: &Vector3<f64>) -> f64 {
        let shape = data.shape();
        if !in_bounds(shape, index) {
            return self.cval;
        }

        let mut lo = [0usize; 3];
        let mut hi = [0usize; 3];
        let mut frac = [0.0f64; 3];
        for axis in 0..3 {
            let x = index[axis];
            let base = x.floor();
            lo[axis] = base as usize;
            hi[axis] = (lo[axis] + 1).min(shape[axis] - 1);
            frac[axis] = x - base;
        }

        let mut value = 0.0;
        for corner in 0..8usize {
            let mut w = 1.0;
            let mut voxel = [0usize; 3];
            for axis in 0..3 {
                if corner >> axis & 1 == 1 {
                    w *= frac[axis];
                    voxel[axis] = hi[axis];
                } else {
                    w *= 1.0 - frac[axis];
                    voxel[axis] = lo[axis];
                }
            }
            if w != 0.0 {
                value += w * data[voxel];
            }
        }
        value
    }
}
