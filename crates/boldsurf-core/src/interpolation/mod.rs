//! Interpolation types and operations.
//!
//! This module provides the [`Interpolator`] trait and the spline family of
//! implementations used to sample voxel arrays at continuous indices.

pub mod bspline;
pub mod linear;
pub mod nearest;
pub mod trait_;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub use bspline::{bspline_basis, BSplineInterpolator};
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
pub use trait_::Interpolator;

/// Spline interpolation order, `0..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SplineOrder(u8);

impl SplineOrder {
    pub const NEAREST: Self = Self(0);
    pub const LINEAR: Self = Self(1);
    pub const CUBIC: Self = Self(3);
    pub const MAX: u8 = 5;

    pub fn new(order: u8) -> Result<Self, CoreError> {
        if order <= Self::MAX {
            Ok(Self(order))
        } else {
            Err(CoreError::InvalidOrder(order))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Orders above 1 sample spline coefficients, not raw voxels.
    pub fn needs_prefilter(self) -> bool {
        self.0 > 1
    }

    /// Interpolator for this order returning `cval` outside the grid.
    pub fn interpolator(self, cval: f64) -> Box<dyn Interpolator> {
        match self.0 {
            0 => Box::new(NearestNeighborInterpolator::new().with_cval(cval)),
            1 => Box::new(LinearInterpolator::new().with_cval(cval)),
            n => Box::new(BSplineInterpolator::new(n).with_cval(cval)),
        }
    }
}

impl TryFrom<u8> for SplineOrder {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SplineOrder> for u8 {
    fn from(order: SplineOrder) -> Self {
        order.0
    }
}

impl fmt::Display for SplineOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True when every component lies in `[0, len - 1]`.
///
/// NaN components are outside. An axis of length zero admits nothing.
#[inline]
pub fn in_bounds(shape: &[usize], index: &nalgebra::Vector3<f64>) -> bool {
    shape
        .iter()
        .zip(index.iter())
        .all(|(&n, &x)| n > 0 && x >= 0.0 && x <= (n - 1) as f64)
}
