//! B-Spline interpolation implementation.
//!
//! Samples spline coefficient arrays (see [`crate::filter::spline`]) with
//! the centred B-spline basis of order 2 to 5. Coefficients outside the
//! array are taken from its mirror extension, matching the prefilter's
//! boundary condition, so sampling the prefiltered array at a grid point
//! reproduces the original voxel.

use nalgebra::Vector3;
use ndarray::Array3;

use super::in_bounds;
use super::trait_::Interpolator;

const MAX_TAPS: usize = 6;

/// Centred B-spline basis of degree `order` evaluated at `x`.
///
/// β^n(x) = 1/n! Σ_{k=0}^{n+1} (-1)^k C(n+1, k) (x + (n+1)/2 - k)_+^n
pub fn bspline_basis(order: u8, x: f64) -> f64 {
    let n = order as i32;
    let half = (n + 1) as f64 / 2.0;
    let x = x.abs();
    if x >= half {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut binom = 1.0;
    for k in 0..=(n + 1) {
        let t = x + half - k as f64;
        if t <= 0.0 {
            break;
        }
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        sum += sign * binom * t.powi(n);
        binom = binom * (n + 1 - k) as f64 / (k + 1) as f64;
    }
    sum / factorial(n)
}

fn factorial(n: i32) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// Reflect an index into `[0, len)` without repeating the edge sample.
#[inline]
pub(crate) fn mirror_index(i: i64, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len as i64 - 1);
    let m = i.rem_euclid(period);
    if m >= len as i64 {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// B-Spline interpolator for spline orders 2 to 5.
///
/// `data` passed to [`Interpolator::sample`] must already hold spline
/// coefficients for the same order.
#[derive(Debug, Clone, Copy)]
pub struct BSplineInterpolator {
    order: u8,
    cval: f64,
}

impl BSplineInterpolator {
    /// # Panics
    /// If `order` is not in `2..=5`.
    pub fn new(order: u8) -> Self {
        assert!((2..=5).contains(&order), "B-spline order must be 2 to 5, got {}", order);
        Self { order, cval: f64::NAN }
    }

    pub fn with_cval(mut self, cval: f64) -> Self {
        self.cval = cval;
        self
    }

    pub fn order(&self) -> u8 {
        self.order
    }

    /// Coefficient indices and basis weights along one axis.
    fn axis_taps(&self, x: f64, len: usize) -> ([usize; MAX_TAPS], [f64; MAX_TAPS]) {
        let n = self.order as i64;
        let start = if n % 2 == 1 {
            x.floor() as i64 - n / 2
        } else {
            (x + 0.5).floor() as i64 - n / 2
        };
        let mut idx = [0usize; MAX_TAPS];
        let mut w = [0.0f64; MAX_TAPS];
        for k in 0..=n as usize {
            let i = start + k as i64;
            idx[k] = mirror_index(i, len);
            w[k] = bspline_basis(self.order, x - i as f64);
        }
        (idx, w)
    }
}

impl Interpolator for BSplineInterpolator {
    fn sample(&self, data: &Array3<f64>, index: &Vector3<f64>) -> f64 {
        let shape = data.shape();
        if !in_bounds(shape, index) {
            return self.cval;
        }
        let taps = self.order as usize + 1;
        let (ia, wa) = self.axis_taps(index.x, shape[0]);
        let (ib, wb) = self.axis_taps(index.y, shape[1]);
        let (ic, wc) = self.axis_taps(index.z, shape[2]);

        let mut value = 0.0;
        for a in 0..taps {
            let mut plane = 0.0;
            for b in 0..taps {
                let mut line = 0.0;
                for c in 0..taps {
                    line += wc[c] * data[[ia[a], ib[b], ic[c]]];
                }
                plane += wb[b] * line;
            }
            value += wa[a] * plane;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_basis_values() {
        assert!((bspline_basis(3, 0.0) - 2.0 / 3.0).abs() < 1e-15);
        assert!((bspline_basis(3, 1.0) - 1.0 / 6.0).abs() < 1e-15);
        assert_eq!(bspline_basis(3, 2.0), 0.0);
        assert!((bspline_basis(2, 0.0) - 0.75).abs() < 1e-15);
        assert!((bspline_basis(2, 1.0) - 0.125).abs() < 1e-15);
    }

    #[test]
    fn test_basis_partition_of_unity() {
        for order in 2..=5u8 {
            for &x in &[0.0, 0.13, 0.5, 0.77] {
                let s: f64 = (-4..=4).map(|k| bspline_basis(order, x - k as f64)).sum();
                assert!((s - 1.0).abs() < 1e-12, "order {} at {}: {}", order, x, s);
            }
        }
    }

    #[test]
    fn test_mirror_index() {
        assert_eq!(mirror_index(-1, 4), 1);
        assert_eq!(mirror_index(-2, 4), 2);
        assert_eq!(mirror_index(4, 4), 2);
        assert_eq!(mirror_index(5, 4), 1);
        assert_eq!(mirror_index(6, 4), 0);
        assert_eq!(mirror_index(3, 1), 0);
    }

    #[test]
    fn test_even_order_taps_are_centred() {
        let interp = BSplineInterpolator::new(2);
        let (idx, w) = interp.axis_taps(2.0, 5);
        assert_eq!(&idx[..3], &[1, 2, 3]);
        assert!((w[0] - 0.125).abs() < 1e-15);
        assert!((w[1] - 0.75).abs() < 1e-15);
        assert!((w[2] - 0.125).abs() < 1e-15);
    }

    #[test]
    #[should_panic(expected = "B-spline order must be 2 to 5")]
    fn test_rejects_linear_order() {
        BSplineInterpolator::new(1);
    }
}
