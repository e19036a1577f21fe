//! Spatial types shared by every crate in the workspace.
//!
//! World coordinates are RAS millimetres. Points that flow through transform
//! chains are homogeneous 4-vectors with `w = 1`.

pub mod orientation;

use nalgebra::{Matrix4, Vector3, Vector4};

pub use orientation::{io_orientation, AxisOrientation};

/// 4×4 homogeneous affine.
pub type Affine = Matrix4<f64>;

/// Homogeneous point, `w = 1`.
pub type HomogeneousPoint = Vector4<f64>;

/// Lift a 3-D point to homogeneous coordinates.
#[inline]
pub fn to_homogeneous(p: &Vector3<f64>) -> HomogeneousPoint {
    Vector4::new(p.x, p.y, p.z, 1.0)
}

/// ITK (LPS) ↔ RAS axis flip, `diag(-1, -1, 1, 1)`. It is its own inverse.
pub fn lps_flip() -> Affine {
    Matrix4::from_diagonal(&Vector4::new(-1.0, -1.0, 1.0, 1.0))
}

/// Convert an LPS-world affine to RAS-world: `LPS · M · LPS`.
pub fn lps_to_ras(m: &Affine) -> Affine {
    let flip = lps_flip();
    flip * m * flip
}
