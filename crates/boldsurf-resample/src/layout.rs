//! On-disk layout of one subject's FreeSurfer and preprocessing outputs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use walkdir::WalkDir;

use crate::error::Result;
use crate::hemisphere::Hemi;

/// Resolves every input path of a subject from the two root directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectLayout {
    subject: String,
    fs_dir: PathBuf,
    wf_dir: PathBuf,
}

impl SubjectLayout {
    /// `subject` is the bare identifier, without the `sub-` prefix.
    pub fn new(subject: impl Into<String>, fs_dir: impl Into<PathBuf>, wf_dir: impl Into<PathBuf>) -> Self {
        Self {
            subject: subject.into(),
            fs_dir: fs_dir.into(),
            wf_dir: wf_dir.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn fs_dir(&self) -> &Path {
        &self.fs_dir
    }

    pub fn wf_dir(&self) -> &Path {
        &self.wf_dir
    }

    /// `{fs_dir}/sub-{sid}`
    pub fn subject_dir(&self) -> PathBuf {
        self.fs_dir.join(format!("sub-{}", self.subject))
    }

    /// A surface or per-vertex file, e.g. `name = "white"` gives `surf/lh.white`.
    pub fn surface(&self, hemi: Hemi, name: &str) -> PathBuf {
        self.subject_dir()
            .join("surf")
            .join(format!("{}.{}", hemi.file_prefix(), name))
    }

    pub fn t1(&self) -> PathBuf {
        self.subject_dir().join("mri").join("T1.mgz")
    }

    pub fn brain_mask(&self) -> PathBuf {
        self.subject_dir().join("mri").join("brainmask.mgz")
    }

    /// Registered sphere of the standard template subject.
    pub fn standard_sphere(&self, hemi: Hemi) -> PathBuf {
        self.fs_dir
            .join("fsaverage")
            .join("surf")
            .join(format!("{}.sphere.reg", hemi.file_prefix()))
    }

    pub fn hmc_transforms(&self) -> PathBuf {
        self.wf_dir.join("bold_hmc_wf").join("fsl2itk").join("mat2itk.txt")
    }

    pub fn registration(&self) -> PathBuf {
        self.wf_dir
            .join("bold_reg_wf")
            .join("bbreg_wf")
            .join("concat_xfm")
            .join("out_fwd.tfm")
    }

    pub fn anat_to_canonical(&self) -> PathBuf {
        self.wf_dir.join("bold_surf_wf").join("itk2lta").join("out.lta")
    }

    pub fn source_dir(&self) -> PathBuf {
        self.wf_dir.join("bold_split")
    }

    pub fn warp_dir(&self) -> PathBuf {
        self.wf_dir.join("unwarp_wf").join("resample")
    }

    /// `bold_split/vol*.nii.gz`, sorted by file name.
    ///
    /// # Errors
    /// If the directory cannot be listed.
    pub fn source_frames(&self) -> Result<Vec<PathBuf>> {
        let dir = self.source_dir();
        let frames = list_matching(&dir, "vol", ".nii.gz")
            .with_context(|| format!("Failed to list source frames in {}", dir.display()))?;
        Ok(frames)
    }

    /// `unwarp_wf/resample/vol*_xfm.nii.gz`, sorted by file name.
    ///
    /// A missing directory is the same as no warps.
    pub fn warp_fields(&self) -> Result<Vec<PathBuf>> {
        let dir = self.warp_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let warps = list_matching(&dir, "vol", "_xfm.nii.gz")
            .with_context(|| format!("Failed to list warp fields in {}", dir.display()))?;
        Ok(warps)
    }
}

/// Regular files directly inside `dir` named `{prefix}*{suffix}`.
fn list_matching(dir: &Path, prefix: &str, suffix: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.len() >= prefix.len() + suffix.len() && name.starts_with(prefix) && name.ends_with(suffix) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}
