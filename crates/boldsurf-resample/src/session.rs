//! Subject-level interpolation of the BOLD series.
//!
//! An [`InterpolationSession`] owns every source frame, the per-volume
//! transform chain and the brain-mask grid of one subject. It is only ever
//! built fully prepared, either from disk with
//! [`InterpolationSession::prepare`] or from in-memory parts with
//! [`InterpolationSession::new`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use boldsurf_core::filter::spline_filter;
use boldsurf_core::resample::{ResampledSeries, SourceSeries, VolumetricResampler};
use boldsurf_core::sampling::{canonical_volume_coords, VolumeGrid};
use boldsurf_core::transform::TransformChain;
use boldsurf_core::{SamplingBatch, SplineOrder, Volume};
use boldsurf_io::{read_displacement_field, read_itk_transform, read_itk_transform_array, read_lta, read_mgh, read_nifti};
use ndarray::Array3;
use tracing::{debug, info};

use crate::error::{ResampleError, Result};
use crate::hemisphere::{ProjectionType, Space};
use crate::layout::SubjectLayout;

/// Margin, in voxels, around the brain mask's bounding box.
pub const VOLUME_MARGIN: usize = 2;

/// Prepared interpolation context of one subject.
///
/// Spline coefficients are computed once per order and kept for the
/// lifetime of the session.
#[derive(Debug)]
pub struct InterpolationSession {
    series: SourceSeries,
    chain: TransformChain,
    grid: VolumeGrid,
    filtered: RefCell<BTreeMap<SplineOrder, Rc<[Array3<f64>]>>>,
}

impl InterpolationSession {
    /// Load the brain mask, transforms, source frames and warps of a subject,
    /// then prefilter every order in `orders` above 1.
    ///
    /// # Errors
    /// If any input is unreadable, or warps exist but their count differs
    /// from the number of source frames.
    pub fn prepare(layout: &SubjectLayout, orders: &[SplineOrder]) -> Result<Self> {
        info!("Preparing interpolation session for sub-{}", layout.subject());
        let brain_mask = read_mgh(layout.brain_mask())?;

        let hmc = read_itk_transform_array(layout.hmc_transforms())?;
        let registration = read_itk_transform(layout.registration())?;
        let anat_to_canonical = read_lta(layout.anat_to_canonical())?;

        let frame_paths = layout.source_frames()?;
        let warp_paths = layout.warp_fields()?;
        if !warp_paths.is_empty() && warp_paths.len() != frame_paths.len() {
            return Err(ResampleError::dimension(format!(
                "{} warp fields for {} source frames",
                warp_paths.len(),
                frame_paths.len()
            )));
        }
        info!(
            "Found {} source frames, {} warp fields",
            frame_paths.len(),
            warp_paths.len()
        );

        let frames = frame_paths
            .iter()
            .map(|p| read_nifti(p).map_err(ResampleError::from))
            .collect::<Result<Vec<_>>>()?;
        let series = SourceSeries::new(frames)?;

        let warps = if warp_paths.is_empty() {
            None
        } else {
            Some(
                warp_paths
                    .iter()
                    .map(|p| read_displacement_field(p).map_err(ResampleError::from))
                    .collect::<Result<Vec<_>>>()?,
            )
        };
        let chain = TransformChain::new(hmc, registration, anat_to_canonical, warps, series.len())?;

        Self::new(series, chain, &brain_mask, orders)
    }

    /// Assemble a session from loaded parts and prefilter `orders`.
    ///
    /// # Errors
    /// If the chain does not hold one transform per source volume.
    pub fn new(series: SourceSeries, chain: TransformChain, brain_mask: &Volume, orders: &[SplineOrder]) -> Result<Self> {
        if chain.n_volumes() != series.len() {
            return Err(ResampleError::dimension(format!(
                "transform chain covers {} volumes, series has {}",
                chain.n_volumes(),
                series.len()
            )));
        }
        let grid = canonical_volume_coords(brain_mask, VOLUME_MARGIN);
        debug!("Volume grid shape {:?}", grid.batch.shape());

        let session = Self {
            series,
            chain,
            grid,
            filtered: RefCell::new(BTreeMap::new()),
        };
        for &order in orders {
            if order.needs_prefilter() {
                session.coefficients(order);
            }
        }
        Ok(session)
    }

    pub fn n_volumes(&self) -> usize {
        self.series.len()
    }

    pub fn series(&self) -> &SourceSeries {
        &self.series
    }

    pub fn chain(&self) -> &TransformChain {
        &self.chain
    }

    /// Truncated canonical grid used by [`Self::interpolate_volume`].
    pub fn volume_grid(&self) -> &VolumeGrid {
        &self.grid
    }

    /// Orders whose spline coefficients are cached.
    pub fn prefiltered_orders(&self) -> Vec<SplineOrder> {
        self.filtered.borrow().keys().copied().collect()
    }

    /// Sample every volume at the `projection` points of `space`.
    ///
    /// Depth samples are averaged per vertex ignoring NaN. With
    /// `standard_space` the result is transported onto the standard sphere.
    ///
    /// # Errors
    /// If `space` has no points for `projection`, or `standard_space` is
    /// requested for a space without a correspondence.
    pub fn interpolate_surface(
        &self,
        space: &Space,
        projection: ProjectionType,
        standard_space: bool,
        order: SplineOrder,
    ) -> Result<ResampledSeries> {
        let batch = space
            .batch(projection)
            .ok_or_else(|| ResampleError::projection_unavailable(space.name(), projection))?;
        let correspondence = if standard_space {
            Some(
                space
                    .to_standard()
                    .ok_or_else(|| ResampleError::missing_correspondence(space.name()))?,
            )
        } else {
            None
        };

        debug!(
            "Interpolating space {} ({}) at order {}",
            space.name(),
            projection,
            order
        );
        let native = self.sample(batch, order)?;
        match correspondence {
            Some(corr) => {
                let data = corr.transport(native.data());
                Ok(ResampledSeries::new(data, vec![corr.n_target()]))
            }
            None => Ok(native),
        }
    }

    /// Sample every volume over the truncated brain-mask grid.
    pub fn interpolate_volume(&self, order: SplineOrder) -> Result<ResampledSeries> {
        debug!("Interpolating volume grid at order {}", order);
        self.sample(&self.grid.batch, order)
    }

    fn sample(&self, batch: &SamplingBatch, order: SplineOrder) -> Result<ResampledSeries> {
        let resampler = VolumetricResampler::new(&self.chain, order);
        let result = if order.needs_prefilter() {
            let coefficients = self.coefficients(order);
            resampler.apply(&self.series, &coefficients, batch)?
        } else {
            resampler.apply(&self.series, self.series.frames(), batch)?
        };
        Ok(result)
    }

    fn coefficients(&self, order: SplineOrder) -> Rc<[Array3<f64>]> {
        if let Some(cached) = self.filtered.borrow().get(&order) {
            return Rc::clone(cached);
        }
        info!("Prefiltering {} frames for order {}", self.series.len(), order);
        let coefficients: Rc<[Array3<f64>]> = self
            .series
            .frames()
            .iter()
            .map(|frame| spline_filter(frame, order))
            .collect();
        self.filtered.borrow_mut().insert(order, Rc::clone(&coefficients));
        coefficients
    }
}
