//! Volumetric resampling of a source series at arbitrary world points.
//!
//! [`VolumetricResampler`] pushes a [`SamplingBatch`] through the
//! [`TransformChain`] of each source volume and samples that volume with a
//! spline interpolator, yielding one row per volume.

use nalgebra::{Matrix4, Vector3};
use ndarray::{Array2, Array3, ArrayView1};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::image::Volume;
use crate::interpolation::{Interpolator, SplineOrder};
use crate::sampling::SamplingBatch;
use crate::transform::{Transform, TransformChain};

/// Ordered source volumes sharing a shape, each with its own affine.
#[derive(Debug, Clone)]
pub struct SourceSeries {
    frames: Vec<Array3<f64>>,
    affines: Vec<Matrix4<f64>>,
    world_to_index: Vec<Matrix4<f64>>,
}

impl SourceSeries {
    /// # Errors
    /// If the volumes differ in shape or any affine is singular.
    pub fn new(volumes: Vec<Volume>) -> Result<Self> {
        let mut frames: Vec<Array3<f64>> = Vec::with_capacity(volumes.len());
        let mut affines = Vec::with_capacity(volumes.len());
        let mut world_to_index = Vec::with_capacity(volumes.len());
        for (i, volume) in volumes.into_iter().enumerate() {
            let inverse = volume
                .world_to_index()
                .map_err(|_| CoreError::singular(format!("source volume {}", i)))?;
            let (data, affine) = volume.into_parts();
            if let Some(first) = frames.first() {
                if first.shape() != data.shape() {
                    return Err(CoreError::ShapeMismatch {
                        expected: first.shape().to_vec(),
                        actual: data.shape().to_vec(),
                    });
                }
            }
            frames.push(data);
            affines.push(affine);
            world_to_index.push(inverse);
        }
        Ok(Self {
            frames,
            affines,
            world_to_index,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Array3<f64>] {
        &self.frames
    }

    pub fn affine(&self, volume: usize) -> &Matrix4<f64> {
        &self.affines[volume]
    }

    pub fn world_to_index(&self, volume: usize) -> &Matrix4<f64> {
        &self.world_to_index[volume]
    }
}

/// Interpolated values, one row per source volume.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledSeries {
    data: Array2<f64>,
    shape: Vec<usize>,
}

impl ResampledSeries {
    /// # Panics
    /// If the column count disagrees with `shape`.
    pub fn new(data: Array2<f64>, shape: Vec<usize>) -> Self {
        assert_eq!(data.ncols(), shape.iter().product::<usize>(), "columns must match output shape");
        Self { data, shape }
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array2<f64> {
        self.data
    }

    /// Shape of a single volume's output.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn n_volumes(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_outputs(&self) -> usize {
        self.data.ncols()
    }

    pub fn volume(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }
}

/// Samples every source volume at a batch of world points.
pub struct VolumetricResampler<'a> {
    chain: &'a TransformChain,
    interpolator: Box<dyn Interpolator>,
    order: SplineOrder,
}

impl<'a> VolumetricResampler<'a> {
    /// Resampler for `order` returning NaN outside each volume's grid.
    pub fn new(chain: &'a TransformChain, order: SplineOrder) -> Self {
        Self {
            chain,
            interpolator: order.interpolator(f64::NAN),
            order,
        }
    }

    pub fn order(&self) -> SplineOrder {
        self.order
    }

    /// Interpolate all volumes at `batch`.
    ///
    /// `data` holds one array per volume of `series`: the raw frames for
    /// orders 0 and 1, spline coefficients of the same order otherwise.
    ///
    /// # Errors
    /// If `data`, `series` and the chain disagree on the volume count.
    pub fn apply(&self, series: &SourceSeries, data: &[Array3<f64>], batch: &SamplingBatch) -> Result<ResampledSeries> {
        let n = series.len();
        if data.len() != n {
            return Err(CoreError::count("sampled arrays", n, data.len()));
        }
        if self.chain.n_volumes() != n {
            return Err(CoreError::count("transform chain volumes", n, self.chain.n_volumes()));
        }

        let n_outputs = batch.n_outputs();
        let mut out = Array2::from_elem((n, n_outputs), f64::NAN);
        for (i, frame) in data.iter().enumerate() {
            let transform = self.chain.for_volume(i, series.world_to_index(i));
            let indices: Vec<Vector3<f64>> = transform
                .transform_points(batch.points())
                .iter()
                .map(|p| p.xyz())
                .collect();
            let samples = self.interpolator.interpolate(frame, &indices);
            let values = batch.reduce(samples);
            for (dst, v) in out.row_mut(i).iter_mut().zip(values) {
                *dst = v;
            }
        }
        debug!(
            volumes = n,
            points = batch.len(),
            order = self.order.get(),
            "volumetric interpolation done"
        );
        Ok(ResampledSeries::new(out, batch.output_shape()))
    }
}
