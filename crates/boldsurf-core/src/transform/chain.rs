//! The per-subject transform chain from sampling space to source voxels.

use nalgebra::Matrix4;
use tracing::debug;

use super::affine::AffineTransform;
use super::chained::ChainedTransform;
use super::displacement_field::DisplacementField;
use crate::error::{CoreError, Result};

/// Composite mapping for one source volume: pre-warp affine, optional
/// displacement, then head motion and world-to-index.
pub type VolumeTransform<'a> =
    ChainedTransform<ChainedTransform<AffineTransform, Option<&'a DisplacementField>>, AffineTransform>;

/// Transforms linking anatomical sampling points to each source volume.
///
/// Applied to a point `p` for volume `i`:
/// 1. `registration · anat_to_canonical`
/// 2. subtract the displacement of `warps[i]`, if warps are present
/// 3. `hmc[i]`, then the volume's world-to-index affine
///
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct TransformChain {
    hmc: Vec<AffineTransform>,
    registration: AffineTransform,
    anat_to_canonical: AffineTransform,
    warps: Option<Vec<DisplacementField>>,
}

impl TransformChain {
    /// # Errors
    /// If the head-motion list or the warp list does not have one entry per
    /// source volume.
    pub fn new(
        hmc: Vec<AffineTransform>,
        registration: AffineTransform,
        anat_to_canonical: AffineTransform,
        warps: Option<Vec<DisplacementField>>,
        n_volumes: usize,
    ) -> Result<Self> {
        if hmc.len() != n_volumes {
            return Err(CoreError::count("head-motion transforms", n_volumes, hmc.len()));
        }
        if let Some(w) = &warps {
            if w.len() != n_volumes {
                return Err(CoreError::count("displacement fields", n_volumes, w.len()));
            }
        }
        debug!(
            n_volumes,
            warped = warps.is_some(),
            "transform chain assembled"
        );
        Ok(Self {
            hmc,
            registration,
            anat_to_canonical,
            warps,
        })
    }

    /// Identity chain for `n_volumes` volumes without warps.
    pub fn identity(n_volumes: usize) -> Self {
        Self {
            hmc: vec![AffineTransform::identity(); n_volumes],
            registration: AffineTransform::identity(),
            anat_to_canonical: AffineTransform::identity(),
            warps: None,
        }
    }

    pub fn n_volumes(&self) -> usize {
        self.hmc.len()
    }

    pub fn hmc(&self, volume: usize) -> &AffineTransform {
        &self.hmc[volume]
    }

    pub fn registration(&self) -> &AffineTransform {
        &self.registration
    }

    pub fn anat_to_canonical(&self) -> &AffineTransform {
        &self.anat_to_canonical
    }

    pub fn has_warps(&self) -> bool {
        self.warps.is_some()
    }

    pub fn warp(&self, volume: usize) -> Option<&DisplacementField> {
        self.warps.as_ref().map(|w| &w[volume])
    }

    /// Affine shared by every volume ahead of the warp:
    /// `registration · anat_to_canonical`.
    pub fn pre_warp(&self) -> AffineTransform {
        self.anat_to_canonical.then(&self.registration)
    }

    /// Full mapping for volume `volume` into voxel indices of a frame whose
    /// world-to-index affine is `world_to_index`.
    pub fn for_volume(&self, volume: usize, world_to_index: &Matrix4<f64>) -> VolumeTransform<'_> {
        let post = self.hmc[volume].then(&AffineTransform::new(*world_to_index));
        ChainedTransform::new(ChainedTransform::new(self.pre_warp(), self.warp(volume)), post)
    }
}
