use std::path::Path;

use anyhow::{bail, Context, Result};
use boldsurf_core::transform::DisplacementField;
use boldsurf_core::Volume;
use nalgebra::{Matrix4, Vector3};
use ndarray::{ArrayBase, ArrayD, Axis, Data, Dimension, Ix3, Ix4, RemoveAxis};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use tracing::debug;

/// Voxel-to-world affine of a NIfTI header.
///
/// The sform wins when its code is set, then the qform; otherwise the
/// voxel sizes alone are used.
pub fn nifti_affine(header: &NiftiHeader) -> Matrix4<f64> {
    let rows = if header.sform_code > 0 {
        [header.srow_x, header.srow_y, header.srow_z]
    } else if header.qform_code > 0 {
        let b = header.quatern_b;
        let c = header.quatern_c;
        let d = header.quatern_d;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();

        let qfac = if header.pixdim[0] == 0.0 { 1.0 } else { header.pixdim[0] };
        let dx = header.pixdim[1];
        let dy = header.pixdim[2];
        let dz = header.pixdim[3] * qfac;

        [
            [
                (a * a + b * b - c * c - d * d) * dx,
                (2.0 * b * c - 2.0 * a * d) * dy,
                (2.0 * b * d + 2.0 * a * c) * dz,
                header.quatern_x,
            ],
            [
                (2.0 * b * c + 2.0 * a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                (2.0 * c * d - 2.0 * a * b) * dz,
                header.quatern_y,
            ],
            [
                (2.0 * b * d - 2.0 * a * c) * dx,
                (2.0 * c * d + 2.0 * a * b) * dy,
                (a * a + d * d - c * c - b * b) * dz,
                header.quatern_z,
            ],
        ]
    } else {
        [
            [header.pixdim[1], 0.0, 0.0, 0.0],
            [0.0, header.pixdim[2], 0.0, 0.0],
            [0.0, 0.0, header.pixdim[3], 0.0],
        ]
    };

    let mut m = Matrix4::identity();
    for (r, row) in rows.iter().enumerate() {
        for (c, &v) in row.iter().enumerate() {
            m[(r, c)] = v as f64;
        }
    }
    m
}

fn read_array<P: AsRef<Path>>(path: P) -> Result<(ArrayD<f64>, Matrix4<f64>)> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {}", path.display()))?;
    let affine = nifti_affine(obj.header());
    let data = obj
        .into_volume()
        .into_ndarray::<f64>()
        .context("Failed to convert NIfTI volume to ndarray")?;
    Ok((data, affine))
}

/// Read a 3-D NIfTI volume. A 4-D file with a single frame is accepted.
///
/// Array index `(i, j, k)` is NIfTI voxel `(i, j, k)`; no axes are permuted.
pub fn read_nifti<P: AsRef<Path>>(path: P) -> Result<Volume> {
    let path = path.as_ref();
    let (mut data, affine) = read_array(path)?;
    if data.ndim() == 4 && data.len_of(Axis(3)) == 1 {
        data = data.index_axis_move(Axis(3), 0);
    }
    if data.ndim() != 3 {
        bail!("Expected 3D NIfTI file, found shape {:?}", data.shape());
    }
    let data = data.into_dimensionality::<Ix3>()?;
    debug!(path = %path.display(), shape = ?data.shape(), "read NIfTI volume");
    Ok(Volume::new(data, affine))
}

/// Read a displacement field stored as `x × y × z × 1 × 3` or `x × y × z × 3`.
pub fn read_displacement_field<P: AsRef<Path>>(path: P) -> Result<DisplacementField> {
    let path = path.as_ref();
    let (mut data, affine) = read_array(path)?;
    if data.ndim() == 5 && data.len_of(Axis(3)) == 1 {
        data = data.index_axis_move(Axis(3), 0);
    }
    if data.ndim() != 4 || data.len_of(Axis(3)) != 3 {
        bail!("Expected displacement field of shape (x, y, z, [1,] 3), found {:?}", data.shape());
    }
    let data = data.into_dimensionality::<Ix4>()?;
    DisplacementField::from_vector_volume(&data, affine)
        .with_context(|| format!("Invalid displacement field {}", path.display()))
}

/// Write an array to a NIfTI file with the given voxel-to-world affine.
///
/// The affine is stored as the sform (aligned code). Files ending in
/// `.nii.gz` are compressed. NIfTI-1 stores each dimension as an `i16`, so
/// longer axes are an error; see `write_mgh_frames` for per-vertex series.
pub fn write_nifti<P, S, D>(path: P, data: &ArrayBase<S, D>, affine: &Matrix4<f64>) -> Result<()>
where
    P: AsRef<Path>,
    S: Data<Elem = f32>,
    D: Dimension + RemoveAxis,
{
    let path = path.as_ref();
    if let Some(&len) = data.shape().iter().find(|&&len| len > i16::MAX as usize) {
        bail!(
            "Cannot write {}: axis of length {} exceeds the NIfTI-1 limit of {}",
            path.display(),
            len,
            i16::MAX
        );
    }
    let mut header = NiftiHeader::default();
    header.sform_code = 2;
    header.qform_code = 0;
    let row = |r: usize| {
        [
            affine[(r, 0)] as f32,
            affine[(r, 1)] as f32,
            affine[(r, 2)] as f32,
            affine[(r, 3)] as f32,
        ]
    };
    header.srow_x = row(0);
    header.srow_y = row(1);
    header.srow_z = row(2);
    for axis in 0..3 {
        let zoom = Vector3::new(affine[(0, axis)], affine[(1, axis)], affine[(2, axis)]).norm();
        header.pixdim[axis + 1] = zoom as f32;
    }

    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(data)
        .with_context(|| format!("Failed to write NIfTI file {}", path.display()))?;
    Ok(())
}
