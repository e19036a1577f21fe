//! Chained transform implementation.
//!
//! T(x) = T2(T1(x))

use nalgebra::Vector4;

use super::trait_::Transform;

/// Chained Transform (`second` after `first`).
#[derive(Debug, Clone)]
pub struct ChainedTransform<T1, T2> {
    pub first: T1,
    pub second: T2,
}

impl<T1, T2> ChainedTransform<T1, T2> {
    pub fn new(first: T1, second: T2) -> Self {
        Self { first, second }
    }
}

impl<T1: Transform, T2: Transform> Transform for ChainedTransform<T1, T2> {
    fn transform_point(&self, point: &Vector4<f64>) -> Vector4<f64> {
        self.second.transform_point(&self.first.transform_point(point))
    }

    fn transform_points(&self, points: &[Vector4<f64>]) -> Vec<Vector4<f64>> {
        let intermediate = self.first.transform_points(points);
        self.second.transform_points(&intermediate)
    }
}
