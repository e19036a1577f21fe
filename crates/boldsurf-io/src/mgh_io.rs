//! FreeSurfer MGH volumes, plain or gzip-compressed (`.mgz`).
//!
//! Layout: a big-endian header followed at byte 284 by the voxel data in
//! column-major order (first axis fastest, frames slowest). Dimensions are
//! 32-bit, so per-vertex series with more than 65535 rows fit where NIfTI-1
//! does not. Data is always written as float32.

use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use boldsurf_core::Volume;
use byteordered::ByteOrdered;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use nalgebra::{Matrix3, Matrix4, Vector3};
use ndarray::{Array3, Array4, ArrayBase, Axis, Data, Ix4, ShapeBuilder};
use tracing::debug;

const DATA_OFFSET: usize = 284;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Voxel storage type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MghDataType {
    U8,
    I32,
    F32,
    I16,
}

impl MghDataType {
    fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => Self::U8,
            1 => Self::I32,
            3 => Self::F32,
            4 => Self::I16,
            other => bail!("Unsupported MGH data type {}", other),
        })
    }

    fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
        }
    }
}

#[derive(Debug, Clone)]
struct MghHeader {
    dims: [usize; 3],
    frames: usize,
    data_type: MghDataType,
    delta: Vector3<f64>,
    /// Direction cosines; columns are the x, y, z voxel axes in RAS.
    mdc: Matrix3<f64>,
    c_ras: Vector3<f64>,
}

impl MghHeader {
    /// Voxel-to-RAS: `[Mdc·diag(delta) | c_ras - Mdc·diag(delta)·dims/2]`.
    fn vox2ras(&self) -> Matrix4<f64> {
        let md = self.mdc * Matrix3::from_diagonal(&self.delta);
        let half = Vector3::new(self.dims[0] as f64, self.dims[1] as f64, self.dims[2] as f64) / 2.0;
        let t = self.c_ras - md * half;
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&md);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&t);
        m
    }
}

fn parse_header(bytes: &[u8]) -> Result<MghHeader> {
    let mut input = ByteOrdered::be(Cursor::new(bytes));
    let version = input.read_i32()?;
    if version != 1 {
        bail!("Unknown MGH version {}", version);
    }
    let mut dims = [0usize; 3];
    for d in dims.iter_mut() {
        let v = input.read_i32()?;
        *d = usize::try_from(v).with_context(|| format!("Negative MGH dimension {}", v))?;
    }
    let frames = input.read_i32()?;
    let frames = usize::try_from(frames).with_context(|| format!("Negative MGH frame count {}", frames))?;
    let data_type = MghDataType::from_code(input.read_i32()?)?;
    let _dof = input.read_i32()?;
    let good_ras = input.read_i16()?;

    let (delta, mdc, c_ras) = if good_ras > 0 {
        let mut delta = Vector3::zeros();
        for d in delta.iter_mut() {
            *d = input.read_f32()? as f64;
        }
        let mut mdc = Matrix3::zeros();
        for col in 0..3 {
            for row in 0..3 {
                mdc[(row, col)] = input.read_f32()? as f64;
            }
        }
        let mut c_ras = Vector3::zeros();
        for c in c_ras.iter_mut() {
            *c = input.read_f32()? as f64;
        }
        (delta, mdc, c_ras)
    } else {
        // coronal default when the header carries no geometry
        #[rustfmt::skip]
        let mdc = Matrix3::new(
            -1.0, 0.0, 0.0,
             0.0, 0.0, 1.0,
             0.0, -1.0, 0.0,
        );
        (Vector3::new(1.0, 1.0, 1.0), mdc, Vector3::zeros())
    };

    Ok(MghHeader {
        dims,
        frames,
        data_type,
        delta,
        mdc,
        c_ras,
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    File::open(path)?.read_to_end(&mut raw)?;
    if raw.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut inflated)?;
        Ok(inflated)
    } else {
        Ok(raw)
    }
}

fn read_values(bytes: &[u8], data_type: MghDataType, n: usize) -> Result<Vec<f64>> {
    let end = DATA_OFFSET + n * data_type.size();
    if bytes.len() < end {
        bail!("MGH data truncated: need {} bytes, have {}", end, bytes.len());
    }

    let mut input = ByteOrdered::be(Cursor::new(&bytes[DATA_OFFSET..end]));
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        let v = match data_type {
            MghDataType::U8 => input.read_u8()? as f64,
            MghDataType::I16 => input.read_i16()? as f64,
            MghDataType::I32 => input.read_i32()? as f64,
            MghDataType::F32 => input.read_f32()? as f64,
        };
        values.push(v);
    }
    Ok(values)
}

fn parse_mgh(bytes: &[u8]) -> Result<Volume> {
    let header = parse_header(bytes)?;
    let [nx, ny, nz] = header.dims;
    let values = read_values(bytes, header.data_type, nx * ny * nz)?;
    let data = Array3::from_shape_vec((nx, ny, nz).f(), values)?;
    Ok(Volume::new(data, header.vox2ras()))
}

fn parse_mgh_frames(bytes: &[u8]) -> Result<(Array4<f64>, Matrix4<f64>)> {
    let header = parse_header(bytes)?;
    let [nx, ny, nz] = header.dims;
    let nt = header.frames;
    if nt == 0 {
        bail!("MGH file has no frames");
    }
    let values = read_values(bytes, header.data_type, nx * ny * nz * nt)?;
    let data = Array4::from_shape_vec((nx, ny, nz, nt).f(), values)?;
    Ok((data, header.vox2ras()))
}

/// Read the first frame of an MGH or MGZ volume.
pub fn read_mgh<P: AsRef<Path>>(path: P) -> Result<Volume> {
    let path = path.as_ref();
    let bytes = read_bytes(path).with_context(|| format!("Failed to read MGH file {}", path.display()))?;
    let volume = parse_mgh(&bytes).with_context(|| format!("Failed to parse MGH file {}", path.display()))?;
    debug!(path = %path.display(), shape = ?volume.shape(), "read MGH volume");
    Ok(volume)
}

/// Read every frame of an MGH or MGZ file as `x × y × z × frames`, with
/// its voxel-to-RAS affine.
pub fn read_mgh_frames<P: AsRef<Path>>(path: P) -> Result<(Array4<f64>, Matrix4<f64>)> {
    let path = path.as_ref();
    let bytes = read_bytes(path).with_context(|| format!("Failed to read MGH file {}", path.display()))?;
    let (data, affine) =
        parse_mgh_frames(&bytes).with_context(|| format!("Failed to parse MGH file {}", path.display()))?;
    debug!(path = %path.display(), shape = ?data.shape(), "read MGH frames");
    Ok((data, affine))
}

fn encode_mgh<W, S>(output: W, data: &ArrayBase<S, Ix4>, affine: &Matrix4<f64>) -> Result<()>
where
    W: Write,
    S: Data<Elem = f32>,
{
    let (nx, ny, nz, nt) = data.dim();
    let mut dims = [0i32; 4];
    for (d, n) in dims.iter_mut().zip([nx, ny, nz, nt]) {
        *d = i32::try_from(n).with_context(|| format!("MGH dimension {} does not fit in 32 bits", n))?;
    }
    let linear = affine.fixed_view::<3, 3>(0, 0).into_owned();
    let delta = Vector3::new(linear.column(0).norm(), linear.column(1).norm(), linear.column(2).norm());
    if delta.iter().any(|&d| d == 0.0) {
        bail!("Affine has a zero-length voxel axis");
    }
    let mdc = linear * Matrix3::from_diagonal(&delta.map(|d| 1.0 / d));
    let half = Vector3::new(nx as f64, ny as f64, nz as f64) / 2.0;
    let c_ras = linear * half + affine.fixed_view::<3, 1>(0, 3);

    let mut out = ByteOrdered::be(output);
    for v in [1, dims[0], dims[1], dims[2], dims[3], 3, 0] {
        out.write_i32(v)?;
    }
    out.write_i16(1)?;
    let mut header_len = 7 * 4 + 2;
    let floats = delta
        .iter()
        .chain(mdc.iter())
        .chain(c_ras.iter());
    for &f in floats {
        out.write_f32(f as f32)?;
        header_len += 4;
    }
    for _ in header_len..DATA_OFFSET {
        out.write_u8(0)?;
    }
    // reversed axes iterate with the first axis fastest
    for &v in data.t().iter() {
        out.write_f32(v)?;
    }
    out.into_inner().flush()?;
    Ok(())
}

/// Write `volume` as a single-frame float32 MGH; paths ending in `.mgz` are
/// gzip-compressed.
pub fn write_mgh<P: AsRef<Path>>(path: P, volume: &Volume) -> Result<()> {
    let frames = volume.data().mapv(|v| v as f32).insert_axis(Axis(3));
    write_mgh_frames(path, &frames, volume.affine())
}

/// Write `x × y × z × frames` float32 data as MGH, or MGZ by extension.
pub fn write_mgh_frames<P, S>(path: P, data: &ArrayBase<S, Ix4>, affine: &Matrix4<f64>) -> Result<()>
where
    P: AsRef<Path>,
    S: Data<Elem = f32>,
{
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create MGH file {}", path.display()))?;
    let compressed = path.extension().is_some_and(|e| e == "mgz");
    let written = if compressed {
        let mut enc = GzEncoder::new(BufWriter::new(file), Compression::default());
        encode_mgh(&mut enc, data, affine).and_then(|_| enc.finish().map(|_| ()).map_err(Into::into))
    } else {
        encode_mgh(BufWriter::new(file), data, affine)
    };
    written.with_context(|| format!("Failed to write MGH file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Conformed-style LIA header with u8 data counting up in file order.
    fn fixture(dims: [i32; 3], c_ras: [f32; 3]) -> Vec<u8> {
        let mut b = Vec::new();
        for v in [1, dims[0], dims[1], dims[2], 1, 0, 0] {
            b.extend_from_slice(&v.to_be_bytes());
        }
        b.extend_from_slice(&1i16.to_be_bytes());
        // delta, then x/y/z direction cosines, then c_ras
        let floats: [f32; 15] = [
            1.0, 1.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0, c_ras[0], c_ras[1], c_ras[2],
        ];
        for f in floats {
            b.extend_from_slice(&f.to_be_bytes());
        }
        b.resize(DATA_OFFSET, 0);
        let n = (dims[0] * dims[1] * dims[2]) as usize;
        b.extend((0..n).map(|i| i as u8));
        b
    }

    #[test]
    fn test_lia_affine_and_fortran_order() -> Result<()> {
        let volume = parse_mgh(&fixture([4, 4, 4], [1.0, 2.0, 3.0]))?;
        #[rustfmt::skip]
        let expected = Matrix4::new(
            -1.0, 0.0, 0.0, 3.0,
             0.0, 0.0, 1.0, 0.0,
             0.0, -1.0, 0.0, 5.0,
             0.0, 0.0, 0.0, 1.0,
        );
        assert_eq!(volume.affine(), &expected);
        // first axis varies fastest on disk
        assert_eq!(volume.data()[[1, 0, 0]], 1.0);
        assert_eq!(volume.data()[[0, 1, 0]], 4.0);
        assert_eq!(volume.data()[[0, 0, 1]], 16.0);
        // centre voxel sits at c_ras
        assert_eq!(volume.center_world(), Vector3::new(1.0, 2.0, 3.0));
        Ok(())
    }

    #[test]
    fn test_mgz_is_decompressed() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("T1.mgz");
        let mut enc = GzEncoder::new(File::create(&path)?, Compression::default());
        enc.write_all(&fixture([2, 3, 4], [0.0, 0.0, 0.0]))?;
        enc.finish()?;

        let volume = read_mgh(&path)?;
        assert_eq!(volume.shape(), [2, 3, 4]);
        assert_eq!(volume.data()[[1, 2, 3]], (1 + 2 * 2 + 3 * 6) as f64);
        Ok(())
    }

    #[test]
    fn test_truncated_data_is_error() {
        let mut bytes = fixture([4, 4, 4], [0.0; 3]);
        bytes.truncate(DATA_OFFSET + 10);
        assert!(parse_mgh(&bytes).is_err());
    }

    #[test]
    fn test_unknown_type_is_error() {
        let mut bytes = fixture([2, 2, 2], [0.0; 3]);
        bytes[20..24].copy_from_slice(&7i32.to_be_bytes());
        assert!(parse_mgh(&bytes).is_err());
    }

    #[test]
    fn test_written_volume_reads_back() -> Result<()> {
        let dir = tempdir()?;
        let source = parse_mgh(&fixture([3, 4, 5], [10.0, -20.0, 5.0]))?;
        for name in ["brainmask.mgh", "brainmask.mgz"] {
            let path = dir.path().join(name);
            write_mgh(&path, &source)?;
            let volume = read_mgh(&path)?;
            assert_eq!(volume.shape(), [3, 4, 5]);
            assert_eq!(volume.data(), source.data());
            assert!((volume.affine() - source.affine()).abs().max() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_series_wider_than_sixteen_bits_reads_back() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("lh_fsavg.mgz");
        let rows = 163_842;
        let data = Array4::from_shape_fn((rows, 1, 1, 2), |(v, _, _, t)| (v + t * rows) as f32);
        write_mgh_frames(&path, &data, &Matrix4::identity())?;

        let (back, affine) = read_mgh_frames(&path)?;
        assert_eq!(back.shape(), &[rows, 1, 1, 2]);
        assert_eq!(back[[100_000, 0, 0, 0]], 100_000.0);
        assert_eq!(back[[rows - 1, 0, 0, 1]], (2 * rows - 1) as f64);
        assert!((affine - Matrix4::identity()).abs().max() < 1e-6);

        // the single-frame reader stops after the first frame
        let first = read_mgh(&path)?;
        assert_eq!(first.shape(), [rows, 1, 1]);
        assert_eq!(first.data()[[rows - 1, 0, 0]], (rows - 1) as f64);
        Ok(())
    }

    #[test]
    fn test_zero_frames_is_error() {
        let mut bytes = fixture([2, 2, 2], [0.0; 3]);
        bytes[16..20].copy_from_slice(&0i32.to_be_bytes());
        assert!(parse_mgh_frames(&bytes).is_err());
    }
}
