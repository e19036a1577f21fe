//! Spline prefilter.
//!
//! Converts voxel samples into B-spline coefficients so that evaluating the
//! spline at grid points reproduces the samples. The filter is a cascade of
//! causal/anti-causal first-order recursions, one pair per pole, applied
//! separably along each axis with mirror-symmetric boundaries.

use ndarray::{Array3, Axis};

use crate::interpolation::SplineOrder;

/// Poles of the recursive prefilter for `order`. Empty for orders 0 and 1.
pub fn spline_poles(order: SplineOrder) -> Vec<f64> {
    match order.get() {
        2 => vec![8.0f64.sqrt() - 3.0],
        3 => vec![3.0f64.sqrt() - 2.0],
        4 => vec![
            (664.0 - 438976.0f64.sqrt()).sqrt() + 304.0f64.sqrt() - 19.0,
            (664.0 + 438976.0f64.sqrt()).sqrt() - 304.0f64.sqrt() - 19.0,
        ],
        5 => vec![
            (67.5 - 4436.25f64.sqrt()).sqrt() + 26.25f64.sqrt() - 6.5,
            (67.5 + 4436.25f64.sqrt()).sqrt() - 26.25f64.sqrt() - 6.5,
        ],
        _ => Vec::new(),
    }
}

/// Spline coefficients of `data` for `order`.
///
/// Orders 0 and 1 interpolate raw samples and return a copy. Axes of length
/// 1 are left untouched.
pub fn spline_filter(data: &Array3<f64>, order: SplineOrder) -> Array3<f64> {
    let mut coeffs = data.clone();
    let poles = spline_poles(order);
    if poles.is_empty() {
        return coeffs;
    }
    let mut line = Vec::new();
    for axis in 0..3 {
        if coeffs.len_of(Axis(axis)) < 2 {
            continue;
        }
        for mut lane in coeffs.lanes_mut(Axis(axis)) {
            line.clear();
            line.extend(lane.iter().copied());
            filter_line(&mut line, &poles);
            for (dst, &src) in lane.iter_mut().zip(&line) {
                *dst = src;
            }
        }
    }
    coeffs
}

fn filter_line(c: &mut [f64], poles: &[f64]) {
    let n = c.len();
    if n < 2 {
        return;
    }
    let gain: f64 = poles.iter().map(|&z| (1.0 - z) * (1.0 - 1.0 / z)).product();
    for v in c.iter_mut() {
        *v *= gain;
    }
    for &z in poles {
        c[0] = causal_init(c, z);
        for i in 1..n {
            c[i] += z * c[i - 1];
        }
        c[n - 1] = anticausal_init(c, z);
        for i in (0..n - 1).rev() {
            c[i] = z * (c[i + 1] - c[i]);
        }
    }
}

/// Initial causal coefficient for a mirror-symmetric signal, summed over one
/// full period.
fn causal_init(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    let iz = 1.0 / z;
    let mut zn = z;
    let mut z2n = z.powi(n as i32 - 1);
    let mut sum = c[0] + z2n * c[n - 1];
    z2n *= z2n * iz;
    for &v in &c[1..n - 1] {
        sum += (zn + z2n) * v;
        zn *= z;
        z2n *= iz;
    }
    sum / (1.0 - zn * zn)
}

fn anticausal_init(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    (z / (z * z - 1.0)) * (c[n - 1] + z * c[n - 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{BSplineInterpolator, Interpolator};
    use nalgebra::Vector3;

    fn order(n: u8) -> SplineOrder {
        SplineOrder::new(n).unwrap()
    }

    #[test]
    fn test_low_orders_are_identity() {
        let data = Array3::from_shape_fn((3, 4, 5), |(i, j, k)| (i + 2 * j + 3 * k) as f64);
        assert_eq!(spline_filter(&data, order(0)), data);
        assert_eq!(spline_filter(&data, order(1)), data);
    }

    #[test]
    fn test_constant_stays_constant() {
        let data = Array3::from_elem((7, 4, 9), 5.0);
        for n in 2..=5 {
            let c = spline_filter(&data, order(n));
            for v in c.iter() {
                assert!((v - 5.0).abs() < 1e-10, "order {}: {}", n, v);
            }
        }
    }

    #[test]
    fn test_interpolating_spline_reproduces_grid_samples() {
        let data = Array3::from_shape_fn((6, 5, 4), |(i, j, k)| {
            (i as f64 * 0.7).sin() + (j as f64 * 1.3).cos() * (k as f64 + 1.0)
        });
        for n in 2..=5 {
            let coeffs = spline_filter(&data, order(n));
            let interp = BSplineInterpolator::new(n);
            for ((i, j, k), &v) in data.indexed_iter() {
                let s = interp.sample(&coeffs, &Vector3::new(i as f64, j as f64, k as f64));
                assert!((s - v).abs() < 1e-9, "order {} at {:?}: {} vs {}", n, (i, j, k), s, v);
            }
        }
    }

    #[test]
    fn test_singleton_axis_untouched() {
        let data = Array3::from_shape_fn((1, 1, 6), |(_, _, k)| k as f64);
        let coeffs = spline_filter(&data, order(3));
        let interp = BSplineInterpolator::new(3);
        let s = interp.sample(&coeffs, &Vector3::new(0.0, 0.0, 2.0));
        assert!((s - 2.0).abs() < 1e-9);
    }
}
