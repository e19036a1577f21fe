//! ITK text transform files (`#Insight Transform File V1.0`).
//!
//! A file holds one or more `#Transform k` blocks, each with a
//! `Transform:` type line, `Parameters:` and `FixedParameters:`. Only
//! affine (matrix + offset) transforms in 3-D are accepted. Matrices are
//! returned in RAS world.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use boldsurf_core::transform::AffineTransform;
use tracing::debug;

const ACCEPTED_TYPES: [&str; 2] = ["AffineTransform", "MatrixOffsetTransformBase"];

#[derive(Debug, Default)]
struct RawTransform {
    kind: Option<String>,
    parameters: Option<Vec<f64>>,
    fixed: Option<Vec<f64>>,
}

impl RawTransform {
    fn into_affine(self, index: usize) -> Result<AffineTransform> {
        let kind = self.kind.with_context(|| format!("Transform {} has no type", index))?;
        if !ACCEPTED_TYPES.iter().any(|t| kind.starts_with(t)) || !kind.ends_with("_3_3") {
            bail!("Transform {} has unsupported type {}", index, kind);
        }
        let params = self
            .parameters
            .with_context(|| format!("Transform {} has no Parameters", index))?;
        let params: [f64; 12] = params
            .try_into()
            .map_err(|p: Vec<f64>| anyhow::anyhow!("Transform {} expects 12 parameters, found {}", index, p.len()))?;
        let fixed = self.fixed.unwrap_or_else(|| vec![0.0; 3]);
        let center: [f64; 3] = fixed
            .try_into()
            .map_err(|f: Vec<f64>| anyhow::anyhow!("Transform {} expects 3 fixed parameters, found {}", index, f.len()))?;
        Ok(AffineTransform::from_itk_parameters(&params, &center).lps_to_ras())
    }
}

fn parse_numbers(s: &str) -> Result<Vec<f64>> {
    s.split_whitespace()
        .map(|t| t.parse::<f64>().with_context(|| format!("Invalid number {:?}", t)))
        .collect()
}

fn parse_transforms(text: &str) -> Result<Vec<AffineTransform>> {
    let mut blocks: Vec<RawTransform> = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("#Transform") {
            blocks.push(RawTransform::default());
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            bail!("Malformed line {:?}", line);
        };
        if blocks.is_empty() {
            blocks.push(RawTransform::default());
        }
        let current = blocks.last_mut().context("no transform block")?;
        match key.trim() {
            "Transform" => current.kind = Some(value.trim().to_string()),
            "Parameters" => current.parameters = Some(parse_numbers(value)?),
            "FixedParameters" => current.fixed = Some(parse_numbers(value)?),
            _ => {}
        }
    }
    blocks
        .into_iter()
        .enumerate()
        .map(|(i, b)| b.into_affine(i))
        .collect()
}

/// Read every affine in an ITK transform array file, e.g. per-volume head
/// motion parameters.
pub fn read_itk_transform_array<P: AsRef<Path>>(path: P) -> Result<Vec<AffineTransform>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read ITK transform {}", path.display()))?;
    let transforms = parse_transforms(&text).with_context(|| format!("Failed to parse ITK transform {}", path.display()))?;
    debug!(path = %path.display(), count = transforms.len(), "read ITK transforms");
    Ok(transforms)
}

/// Read a file holding exactly one ITK affine.
pub fn read_itk_transform<P: AsRef<Path>>(path: P) -> Result<AffineTransform> {
    let path = path.as_ref();
    let mut transforms = read_itk_transform_array(path)?;
    match transforms.len() {
        1 => Ok(transforms.remove(0)),
        n => bail!("Expected one transform in {}, found {}", path.display(), n),
    }
}
