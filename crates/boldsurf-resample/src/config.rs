//! Run configuration for one subject.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use boldsurf_core::SplineOrder;
use serde::{Deserialize, Serialize};

use crate::error::{ResampleError, Result};
use crate::hemisphere::{Hemi, ProjectionType};
use crate::layout::SubjectLayout;

/// Which outputs to produce for a subject and where to find its inputs.
///
/// Missing JSON fields take their [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Subject identifier without the `sub-` prefix.
    pub subject: String,
    pub hemispheres: Vec<Hemi>,
    /// FreeSurfer subjects directory.
    pub fs_dir: PathBuf,
    /// Preprocessing workflow directory of the run.
    pub wf_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Spline orders, checked by [`ResampleConfig::validate`].
    pub orders: Vec<u8>,
    pub projections: Vec<ProjectionType>,
    /// Transport surface outputs onto the standard sphere.
    pub standard_space: bool,
    /// Also resample the truncated brain-mask grid.
    pub volume: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            subject: String::new(),
            hemispheres: Hemi::BOTH.to_vec(),
            fs_dir: PathBuf::from("."),
            wf_dir: PathBuf::from("."),
            out_dir: PathBuf::from("."),
            orders: vec![1],
            projections: vec![ProjectionType::NormalsSine],
            standard_space: true,
            volume: false,
        }
    }
}

impl ResampleConfig {
    /// Create a config with default outputs for `subject`.
    pub fn new(
        subject: impl Into<String>,
        fs_dir: impl Into<PathBuf>,
        wf_dir: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            subject: subject.into(),
            fs_dir: fs_dir.into(),
            wf_dir: wf_dir.into(),
            out_dir: out_dir.into(),
            ..Self::default()
        }
    }

    /// Read a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        Ok(text)
    }

    /// Set the hemispheres.
    pub fn with_hemispheres(mut self, hemispheres: Vec<Hemi>) -> Self {
        self.hemispheres = hemispheres;
        self
    }

    /// Set the spline orders.
    pub fn with_orders(mut self, orders: Vec<u8>) -> Self {
        self.orders = orders;
        self
    }

    /// Set the projections.
    pub fn with_projections(mut self, projections: Vec<ProjectionType>) -> Self {
        self.projections = projections;
        self
    }

    /// Keep surface outputs on the native topology.
    pub fn without_standard_space(mut self) -> Self {
        self.standard_space = false;
        self
    }

    /// Also resample the brain-mask grid.
    pub fn with_volume(mut self) -> Self {
        self.volume = true;
        self
    }

    pub fn surface_requested(&self) -> bool {
        !self.projections.is_empty()
    }

    /// Check the configuration before any file is touched.
    pub fn validate(&self) -> Result<()> {
        if self.subject.is_empty() {
            return Err(ResampleError::invalid_config("subject is empty"));
        }
        if self.orders.is_empty() {
            return Err(ResampleError::invalid_config("no spline orders given"));
        }
        self.spline_orders()?;
        if self.surface_requested() && self.hemispheres.is_empty() {
            return Err(ResampleError::invalid_config(
                "surface output requested without hemispheres",
            ));
        }
        if !self.surface_requested() && !self.volume {
            return Err(ResampleError::invalid_config("no output requested"));
        }
        Ok(())
    }

    /// Orders as [`SplineOrder`], sorted and deduplicated.
    pub fn spline_orders(&self) -> Result<Vec<SplineOrder>> {
        let mut orders = self
            .orders
            .iter()
            .map(|&o| SplineOrder::new(o).map_err(|_| ResampleError::InvalidOrder(o)))
            .collect::<Result<Vec<_>>>()?;
        orders.sort();
        orders.dedup();
        Ok(orders)
    }

    pub fn layout(&self) -> SubjectLayout {
        SubjectLayout::new(self.subject.clone(), self.fs_dir.clone(), self.wf_dir.clone())
    }
}
