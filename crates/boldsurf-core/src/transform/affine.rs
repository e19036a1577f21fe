//! Affine transform implementation.

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

use super::trait_::Transform;
use crate::spatial::lps_to_ras;

/// Homogeneous 4×4 affine transform.
///
/// Composition follows matrix order: `a.then(&b)` applies `a` first, and
/// its matrix is `b · a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix4<f64>,
}

impl AffineTransform {
    pub fn new(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self::new(Matrix4::identity())
    }

    /// Build from a linear part and a translation.
    pub fn from_parts(linear: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(linear);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self::new(m)
    }

    /// Build from ITK `MatrixOffsetTransformBase` parameters.
    ///
    /// `parameters` holds the row-major 3×3 matrix `A` followed by the
    /// translation `t`; `center` is the fixed parameter `c`. The resulting
    /// offset is `t + c - A·c`. The matrix stays in ITK's LPS world; see
    /// [`AffineTransform::lps_to_ras`].
    pub fn from_itk_parameters(parameters: &[f64; 12], center: &[f64; 3]) -> Self {
        let a = Matrix3::from_row_slice(&parameters[..9]);
        let t = Vector3::new(parameters[9], parameters[10], parameters[11]);
        let c = Vector3::from_column_slice(center);
        let offset = t + c - a * c;
        Self::from_parts(&a, &offset)
    }

    /// Re-express an LPS-world transform in RAS world.
    pub fn lps_to_ras(&self) -> Self {
        Self::new(lps_to_ras(&self.matrix))
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// `self` followed by `next`.
    pub fn then(&self, next: &AffineTransform) -> Self {
        Self::new(next.matrix * self.matrix)
    }

    pub fn try_inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(Self::new)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Matrix4<f64>> for AffineTransform {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self::new(matrix)
    }
}

impl Transform for AffineTransform {
    fn transform_point(&self, point: &Vector4<f64>) -> Vector4<f64> {
        self.matrix * point
    }

    fn transform_points(&self, points: &[Vector4<f64>]) -> Vec<Vector4<f64>> {
        points.iter().map(|p| self.matrix * p).collect()
    }
}
