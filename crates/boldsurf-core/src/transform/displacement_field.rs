//! Displacement field transform implementation.
//!
//! A dense field of 3-vectors on its own voxel grid. A point is mapped into
//! the field's voxel indices, the displacement there is sampled with linear
//! interpolation (zero outside the grid), and subtracted from the point.

use nalgebra::{Matrix4, Vector3, Vector4};
use ndarray::{Array3, Array4, Axis};

use super::trait_::Transform;
use crate::error::{CoreError, Result};
use crate::interpolation::{Interpolator, LinearInterpolator};

/// Dense displacement field with its voxel-to-world affine.
#[derive(Debug, Clone)]
pub struct DisplacementField {
    components: [Array3<f64>; 3],
    affine: Matrix4<f64>,
    world_to_index: Matrix4<f64>,
}

impl DisplacementField {
    /// Create a field from its three component volumes.
    ///
    /// # Errors
    /// If the component shapes differ or `affine` is singular.
    pub fn new(components: [Array3<f64>; 3], affine: Matrix4<f64>) -> Result<Self> {
        let expected = components[0].shape().to_vec();
        for c in &components[1..] {
            if c.shape() != expected.as_slice() {
                return Err(CoreError::ShapeMismatch {
                    expected,
                    actual: c.shape().to_vec(),
                });
            }
        }
        let world_to_index = affine
            .try_inverse()
            .ok_or_else(|| CoreError::singular("displacement field affine"))?;
        Ok(Self {
            components,
            affine,
            world_to_index,
        })
    }

    /// Create a field from an `(x, y, z, 3)` array.
    pub fn from_vector_volume(data: &Array4<f64>, affine: Matrix4<f64>) -> Result<Self> {
        if data.len_of(Axis(3)) != 3 {
            return Err(CoreError::ShapeMismatch {
                expected: vec![data.len_of(Axis(0)), data.len_of(Axis(1)), data.len_of(Axis(2)), 3],
                actual: data.shape().to_vec(),
            });
        }
        let component = |c: usize| data.index_axis(Axis(3), c).to_owned();
        Self::new([component(0), component(1), component(2)], affine)
    }

    /// Zero field on the given grid.
    pub fn zeros(shape: [usize; 3], affine: Matrix4<f64>) -> Result<Self> {
        let z = || Array3::zeros((shape[0], shape[1], shape[2]));
        Self::new([z(), z(), z()], affine)
    }

    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    pub fn shape(&self) -> [usize; 3] {
        let s = self.components[0].shape();
        [s[0], s[1], s[2]]
    }

    /// Displacement at a world point, zero outside the field's grid.
    pub fn displacement_at(&self, point: &Vector4<f64>) -> Vector3<f64> {
        let ijk = (self.world_to_index * point).xyz();
        let interp = LinearInterpolator::new().with_cval(0.0);
        Vector3::new(
            interp.sample(&self.components[0], &ijk),
            interp.sample(&self.components[1], &ijk),
            interp.sample(&self.components[2], &ijk),
        )
    }
}

impl Transform for DisplacementField {
    fn transform_point(&self, point: &Vector4<f64>) -> Vector4<f64> {
        let d = self.displacement_at(point);
        Vector4::new(point.x - d.x, point.y - d.y, point.z - d.z, point.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_field_subtracts() {
        let data = Array4::from_shape_fn((4, 4, 4, 3), |(_, _, _, c)| [1.0, -2.0, 0.5][c]);
        let field = DisplacementField::from_vector_volume(&data, Matrix4::identity()).unwrap();
        let p = field.transform_point(&Vector4::new(1.5, 2.0, 0.25, 1.0));
        assert_eq!(p, Vector4::new(0.5, 4.0, -0.25, 1.0));
    }

    #[test]
    fn test_outside_grid_is_zero_displacement() {
        let data = Array4::from_elem((2, 2, 2, 3), 7.0);
        let field = DisplacementField::from_vector_volume(&data, Matrix4::identity()).unwrap();
        let p = Vector4::new(5.0, 0.0, 0.0, 1.0);
        assert_eq!(field.transform_point(&p), p);
    }

    #[test]
    fn test_field_affine_is_inverted() {
        let data = Array4::from_shape_fn((3, 3, 3, 3), |(i, _, _, c)| if c == 0 { i as f64 } else { 0.0 });
        let mut aff = Matrix4::identity() * 2.0;
        aff[(3, 3)] = 1.0;
        let field = DisplacementField::from_vector_volume(&data, aff).unwrap();
        // world x = 3 is voxel 1.5, displacement 1.5
        let p = field.transform_point(&Vector4::new(3.0, 0.0, 0.0, 1.0));
        assert!((p.x - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_wrong_component_count() {
        let data = Array4::<f64>::zeros((2, 2, 2, 2));
        assert!(matches!(
            DisplacementField::from_vector_volume(&data, Matrix4::identity()),
            Err(CoreError::ShapeMismatch { .. })
        ));
    }
}
