//! Voxel-axis orientation relative to RAS world axes.

use nalgebra::{Matrix3, Matrix4};

/// Where a voxel axis points in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisOrientation {
    /// World axis (0 = R, 1 = A, 2 = S) the voxel axis runs along.
    pub world_axis: usize,
    /// `true` when increasing voxel index moves toward -world.
    pub flipped: bool,
}

/// Closest world axis and direction for each of the three voxel axes.
///
/// The linear part is stripped of zooms and replaced by its nearest
/// orthonormal matrix (polar factor `U·Vᵀ` of the SVD). Axes are then
/// assigned greedily in voxel-axis order, each picking the largest
/// remaining absolute component, so ties never map two voxel axes to the
/// same world axis.
pub fn io_orientation(affine: &Matrix4<f64>) -> [AxisOrientation; 3] {
    let mut rs: Matrix3<f64> = affine.fixed_view::<3, 3>(0, 0).into_owned();
    for mut col in rs.column_iter_mut() {
        let zoom = col.norm();
        if zoom > 0.0 {
            col /= zoom;
        }
    }

    let svd = rs.svd(true, true);
    let mut r = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => u * v_t,
        _ => rs,
    };

    let mut out = [AxisOrientation {
        world_axis: 0,
        flipped: false,
    }; 3];
    let mut used = [false; 3];
    for (in_axis, slot) in out.iter_mut().enumerate() {
        let mut best = None;
        for world_axis in 0..3 {
            if used[world_axis] {
                continue;
            }
            let v = r[(world_axis, in_axis)];
            match best {
                Some((_, bv)) if f64::abs(bv) >= v.abs() => {}
                _ => best = Some((world_axis, v)),
            }
        }
        // three voxel axes, three world axes: something is always left
        let (world_axis, v) = best.unwrap_or((in_axis, 1.0));
        used[world_axis] = true;
        for c in 0..3 {
            r[(world_axis, c)] = 0.0;
        }
        *slot = AxisOrientation {
            world_axis,
            flipped: v < 0.0,
        };
    }
    out
}

/// True when the voxel axes already run along +R, +A, +S in order.
pub fn is_canonical(orientation: &[AxisOrientation; 3]) -> bool {
    orientation
        .iter()
        .enumerate()
        .all(|(i, o)| o.world_axis == i && !o.flipped)
}
