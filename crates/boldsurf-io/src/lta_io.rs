//! FreeSurfer linear transform arrays (`.lta`).
//!
//! Supported transform types are `LINEAR_VOX_TO_VOX` (0), converted to
//! RAS-to-RAS through the source and destination volume geometries, and
//! `LINEAR_RAS_TO_RAS` (1), used as is.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use boldsurf_core::transform::AffineTransform;
use nalgebra::{Matrix3, Matrix4, Vector3};
use tracing::debug;

const LINEAR_VOX_TO_VOX: i32 = 0;
const LINEAR_RAS_TO_RAS: i32 = 1;

/// Volume geometry block (`src volume info` / `dst volume info`).
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGeometry {
    pub volume: [f64; 3],
    pub voxel_size: [f64; 3],
    pub xras: Vector3<f64>,
    pub yras: Vector3<f64>,
    pub zras: Vector3<f64>,
    pub cras: Vector3<f64>,
}

impl Default for VolumeGeometry {
    fn default() -> Self {
        Self {
            volume: [0.0; 3],
            voxel_size: [1.0; 3],
            xras: Vector3::new(-1.0, 0.0, 0.0),
            yras: Vector3::new(0.0, 0.0, -1.0),
            zras: Vector3::new(0.0, 1.0, 0.0),
            cras: Vector3::zeros(),
        }
    }
}

impl VolumeGeometry {
    /// Voxel-to-RAS: `A = [xras yras zras]·diag(voxelsize)`,
    /// `b = cras - A·volume/2`.
    pub fn as_affine(&self) -> Matrix4<f64> {
        let a = Matrix3::from_columns(&[self.xras, self.yras, self.zras])
            * Matrix3::from_diagonal(&Vector3::from_column_slice(&self.voxel_size));
        let half = Vector3::from_column_slice(&self.volume) / 2.0;
        let b = self.cras - a * half;
        *AffineTransform::from_parts(&a, &b).matrix()
    }
}

/// Parsed LTA with its first transform matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct LtaTransform {
    pub kind: i32,
    pub matrix: Matrix4<f64>,
    pub src: VolumeGeometry,
    pub dst: VolumeGeometry,
}

impl LtaTransform {
    /// The transform as a RAS-to-RAS affine.
    pub fn to_ras(&self) -> Result<AffineTransform> {
        match self.kind {
            LINEAR_RAS_TO_RAS => Ok(AffineTransform::new(self.matrix)),
            LINEAR_VOX_TO_VOX => {
                let src_inv = self
                    .src
                    .as_affine()
                    .try_inverse()
                    .context("Singular source volume geometry")?;
                Ok(AffineTransform::new(self.dst.as_affine() * self.matrix * src_inv))
            }
            other => bail!("Unsupported LTA transform type {}", other),
        }
    }
}

fn numbers<const N: usize>(value: &str, key: &str) -> Result<[f64; N]> {
    let v: Vec<f64> = value
        .split_whitespace()
        .take(N)
        .map(|t| t.parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid numbers for {}", key))?;
    v.try_into()
        .map_err(|v: Vec<f64>| anyhow::anyhow!("{} expects {} values, found {}", key, N, v.len()))
}

fn parse_lta(text: &str) -> Result<LtaTransform> {
    let mut kind = None;
    let mut matrix = None;
    let mut src = VolumeGeometry::default();
    let mut dst = VolumeGeometry::default();
    // 0 = preamble, 1 = src volume info, 2 = dst volume info
    let mut section = 0;

    let mut lines = text
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .peekable();

    while let Some(line) = lines.next() {
        if line.starts_with("src volume info") {
            section = 1;
            continue;
        }
        if line.starts_with("dst volume info") {
            section = 2;
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            let geometry = match section {
                1 => Some(&mut src),
                2 => Some(&mut dst),
                _ => None,
            };
            match (key, geometry) {
                ("type", None) => {
                    kind = Some(value.parse::<i32>().with_context(|| format!("Invalid LTA type {:?}", value))?)
                }
                ("volume", Some(g)) => g.volume = numbers::<3>(value, key)?,
                ("voxelsize", Some(g)) => g.voxel_size = numbers::<3>(value, key)?,
                ("xras", Some(g)) => g.xras = Vector3::from(numbers::<3>(value, key)?),
                ("yras", Some(g)) => g.yras = Vector3::from(numbers::<3>(value, key)?),
                ("zras", Some(g)) => g.zras = Vector3::from(numbers::<3>(value, key)?),
                ("cras", Some(g)) => g.cras = Vector3::from(numbers::<3>(value, key)?),
                _ => {}
            }
            continue;
        }

        // matrix block header: "<nxforms> 4 4", then four rows
        if section == 0 && matrix.is_none() {
            let dims: Vec<&str> = line.split_whitespace().collect();
            if dims.len() == 3 && dims[1] == "4" && dims[2] == "4" {
                let mut m = Matrix4::zeros();
                for r in 0..4 {
                    let row = lines.next().context("LTA matrix ended early")?;
                    let vals = numbers::<4>(row, "matrix row")?;
                    for (c, v) in vals.iter().enumerate() {
                        m[(r, c)] = *v;
                    }
                }
                matrix = Some(m);
            }
        }
    }

    Ok(LtaTransform {
        kind: kind.context("LTA has no type")?,
        matrix: matrix.context("LTA has no 4x4 matrix")?,
        src,
        dst,
    })
}

/// Read an LTA file and return its transform as RAS-to-RAS.
pub fn read_lta<P: AsRef<Path>>(path: P) -> Result<AffineTransform> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read LTA {}", path.display()))?;
    let lta = parse_lta(&text).with_context(|| format!("Failed to parse LTA {}", path.display()))?;
    debug!(path = %path.display(), kind = lta.kind, "read LTA");
    lta.to_ras()
}
