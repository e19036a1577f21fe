//! Volume type: a 3-D array plus the affine mapping voxel indices to RAS mm.

use nalgebra::{Matrix4, Vector3, Vector4};
use ndarray::Array3;

use crate::error::{CoreError, Result};
use crate::spatial::orientation::{io_orientation, is_canonical};

/// Scalar volume with its voxel-to-world affine.
///
/// Index `(i, j, k)` sits at world position `affine · [i, j, k, 1]`.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f64>,
    affine: Matrix4<f64>,
}

impl Volume {
    pub fn new(data: Array3<f64>, affine: Matrix4<f64>) -> Self {
        Self { data, affine }
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    pub fn shape(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    pub fn into_parts(self) -> (Array3<f64>, Matrix4<f64>) {
        (self.data, self.affine)
    }

    /// World-to-index affine, the inverse of [`Volume::affine`].
    pub fn world_to_index(&self) -> Result<Matrix4<f64>> {
        self.affine
            .try_inverse()
            .ok_or_else(|| CoreError::singular("volume affine"))
    }

    /// World position of a (possibly fractional) voxel index.
    pub fn index_to_world(&self, index: &Vector3<f64>) -> Vector3<f64> {
        let p = self.affine * Vector4::new(index.x, index.y, index.z, 1.0);
        p.xyz()
    }

    /// World position of the centre voxel `shape / 2` (integer division).
    ///
    /// For a FreeSurfer conformed volume this is the `c_ras` offset between
    /// surface coordinates and scanner coordinates.
    pub fn center_world(&self) -> Vector3<f64> {
        let [a, b, c] = self.shape();
        self.index_to_world(&Vector3::new((a / 2) as f64, (b / 2) as f64, (c / 2) as f64))
    }

    /// Reorder and flip voxel axes so they run along +R, +A, +S.
    ///
    /// The world position of every voxel is preserved; only the index
    /// layout and the affine change.
    pub fn as_closest_canonical(&self) -> Volume {
        let orientation = io_orientation(&self.affine);
        if is_canonical(&orientation) {
            return self.clone();
        }

        let old_shape = self.shape();
        let mut new_shape = [0usize; 3];
        // maps a canonical index to the original index
        let mut new_to_old = Matrix4::zeros();
        new_to_old[(3, 3)] = 1.0;
        for (in_axis, o) in orientation.iter().enumerate() {
            new_shape[o.world_axis] = old_shape[in_axis];
            if o.flipped {
                new_to_old[(in_axis, o.world_axis)] = -1.0;
                new_to_old[(in_axis, 3)] = (old_shape[in_axis] as f64 - 1.0).max(0.0);
            } else {
                new_to_old[(in_axis, o.world_axis)] = 1.0;
            }
        }

        let data = Array3::from_shape_fn((new_shape[0], new_shape[1], new_shape[2]), |(a, b, c)| {
            let new_index = [a, b, c];
            let mut old = [0usize; 3];
            for (in_axis, o) in orientation.iter().enumerate() {
                let j = new_index[o.world_axis];
                old[in_axis] = if o.flipped { old_shape[in_axis] - 1 - j } else { j };
            }
            self.data[old]
        });

        Volume::new(data, self.affine * new_to_old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_world_uses_integer_division() {
        let mut aff = Matrix4::identity();
        aff[(0, 3)] = -10.0;
        let v = Volume::new(Array3::zeros((5, 4, 3)), aff);
        assert_eq!(v.center_world(), Vector3::new(-8.0, 2.0, 1.0));
    }

    #[test]
    fn test_canonical_preserves_world_positions() {
        #[rustfmt::skip]
        let aff = Matrix4::new(
            -2.0, 0.0, 0.0, 20.0,
             0.0, 0.0, 1.0, -5.0,
             0.0, -1.5, 0.0, 7.0,
             0.0, 0.0, 0.0, 1.0,
        );
        let data = Array3::from_shape_fn((4, 3, 2), |(i, j, k)| (i * 100 + j * 10 + k) as f64);
        let v = Volume::new(data, aff);
        let c = v.as_closest_canonical();
        assert_eq!(c.shape(), [4, 2, 3]);

        let o = io_orientation(c.affine());
        assert!(is_canonical(&o));

        for ((i, j, k), &val) in v.data().indexed_iter() {
            let w = v.index_to_world(&Vector3::new(i as f64, j as f64, k as f64));
            let back = c.world_to_index().unwrap() * Vector4::new(w.x, w.y, w.z, 1.0);
            let idx = [
                back.x.round() as usize,
                back.y.round() as usize,
                back.z.round() as usize,
            ];
            assert_eq!(c.data()[idx], val);
        }
    }

    #[test]
    fn test_singular_affine_is_reported() {
        let v = Volume::new(Array3::zeros((2, 2, 2)), Matrix4::zeros());
        assert!(matches!(v.world_to_index(), Err(CoreError::SingularAffine { .. })));
    }
}
