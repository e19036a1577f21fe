//! Transform trait for spatial coordinate transformations.

use nalgebra::Vector4;

/// Maps homogeneous points from one space to another.
pub trait Transform {
    /// Apply the transform to one homogeneous point.
    fn transform_point(&self, point: &Vector4<f64>) -> Vector4<f64>;

    /// Apply the transform to a batch of points.
    ///
    /// # Returns
    /// One transformed point per input, in order.
    fn transform_points(&self, points: &[Vector4<f64>]) -> Vec<Vector4<f64>> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }
}

impl<T: Transform + ?Sized> Transform for &T {
    fn transform_point(&self, point: &Vector4<f64>) -> Vector4<f64> {
        (**self).transform_point(point)
    }
}

/// An absent stage is the identity.
impl<T: Transform> Transform for Option<T> {
    fn transform_point(&self, point: &Vector4<f64>) -> Vector4<f64> {
        match self {
            Some(t) => t.transform_point(point),
            None => *point,
        }
    }
}
