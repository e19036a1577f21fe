use anyhow::{Context, Result};
use boldsurf_core::resample::ResampledSeries;
use boldsurf_core::sampling::VolumeGrid;
use boldsurf_io::{write_mgh_frames, write_nifti};
use boldsurf_resample::{
    run_combinations, Combination, Hemi, Hemisphere, InterpolationSession, ProjectionType, ResampleConfig, Target,
};
use clap::{Args, Parser, Subcommand};
use nalgebra::Matrix4;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "boldsurf")]
#[command(about = "Resample preprocessed BOLD runs onto cortical surfaces")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample one subject and write every output as NIfTI
    Resample(RunArgs),

    /// Print the resolved configuration as JSON
    ShowConfig(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// JSON config file; replaces all other options
    #[arg(short, long, conflicts_with_all = ["subject", "fs_dir", "wf_dir"])]
    config: Option<PathBuf>,

    /// Subject identifier, without the "sub-" prefix
    #[arg(short, long, required_unless_present = "config")]
    subject: Option<String>,

    /// FreeSurfer subjects directory
    #[arg(long, required_unless_present = "config")]
    fs_dir: Option<PathBuf>,

    /// Preprocessing workflow directory
    #[arg(long, required_unless_present = "config")]
    wf_dir: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "resampled")]
    out_dir: PathBuf,

    /// Hemispheres (l, r)
    #[arg(long = "hemi", value_delimiter = ',')]
    hemispheres: Vec<Hemi>,

    /// Spline orders, 0 to 5
    #[arg(long = "order", value_delimiter = ',')]
    orders: Vec<u8>,

    /// Projections (normals-sine, normals-equal, pial)
    #[arg(long = "projection", value_delimiter = ',')]
    projections: Vec<ProjectionType>,

    /// Keep surface outputs on the subject's own topology
    #[arg(long)]
    native_only: bool,

    /// Also resample the brain-mask volume grid
    #[arg(long)]
    volume: bool,
}

impl RunArgs {
    fn into_config(self) -> Result<ResampleConfig> {
        if let Some(path) = self.config {
            return Ok(ResampleConfig::from_json_file(path)?);
        }
        let subject = self.subject.context("--subject is required")?;
        let fs_dir = self.fs_dir.context("--fs-dir is required")?;
        let wf_dir = self.wf_dir.context("--wf-dir is required")?;

        let mut config = ResampleConfig::new(subject, fs_dir, wf_dir, self.out_dir);
        if !self.hemispheres.is_empty() {
            config = config.with_hemispheres(self.hemispheres);
        }
        if !self.orders.is_empty() {
            config = config.with_orders(self.orders);
        }
        if !self.projections.is_empty() {
            config = config.with_projections(self.projections);
        }
        if self.native_only {
            config = config.without_standard_space();
        }
        if self.volume {
            config = config.with_volume();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resample(args) => {
            resample(&args.into_config()?)?;
        }
        Commands::ShowConfig(args) => {
            println!("{}", args.into_config()?.to_json_string()?);
        }
    }

    Ok(())
}

fn resample(config: &ResampleConfig) -> Result<()> {
    config.validate()?;
    let layout = config.layout();
    let combos = Combination::expand(config)?;
    info!("sub-{}: {} outputs", config.subject, combos.len());

    let session = InterpolationSession::prepare(&layout, &config.spline_orders()?)?;
    let hemispheres = if config.surface_requested() {
        config
            .hemispheres
            .iter()
            .map(|&hemi| Hemisphere::load(&layout, hemi))
            .collect::<boldsurf_resample::Result<Vec<_>>>()?
    } else {
        Vec::new()
    };

    let out_dir = config.out_dir.join(format!("sub-{}", config.subject));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let results = run_combinations(&session, &hemispheres, &combos)?;
    for (combo, (label, series)) in combos.iter().zip(&results) {
        let path = match combo.target {
            Target::Surface { .. } => {
                let path = out_dir.join(format!("{}.mgz", label));
                write_surface_series(&path, series)?;
                path
            }
            Target::Volume => {
                let path = out_dir.join(format!("{}.nii.gz", label));
                write_volume_series(&path, series, session.volume_grid())?;
                path
            }
        };
        info!("Wrote {}", path.display());
    }

    Ok(())
}

/// `n_outputs x 1 x 1 x n_volumes` MGZ, identity affine. Vertex counts
/// routinely exceed what a NIfTI-1 header can hold.
fn write_surface_series(path: &Path, series: &ResampledSeries) -> Result<()> {
    let data = series.data();
    let array = Array4::from_shape_fn((series.n_outputs(), 1, 1, series.n_volumes()), |(v, _, _, t)| {
        data[[t, v]] as f32
    });
    write_mgh_frames(path, &array, &Matrix4::identity())
}

/// `x x y x z x n_volumes` on the truncated canonical grid.
fn write_volume_series(path: &Path, series: &ResampledSeries, grid: &VolumeGrid) -> Result<()> {
    let shape = series.shape();
    let (nx, ny, nz) = match *shape {
        [nx, ny, nz] => (nx, ny, nz),
        _ => anyhow::bail!("Expected a 3-D grid, got shape {:?}", shape),
    };
    let data = series.data();
    let array = Array4::from_shape_fn((nx, ny, nz, series.n_volumes()), |(i, j, k, t)| {
        data[[t, (i * ny + j) * nz + k]] as f32
    });
    write_nifti(path, &array, &grid.output_affine())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boldsurf_io::read_mgh_frames;
    use ndarray::Array2;

    #[test]
    fn test_flags_build_config() {
        let cli = Cli::try_parse_from([
            "boldsurf", "resample", "-s", "01", "--fs-dir", "/fs", "--wf-dir", "/wf", "--hemi", "l", "--order",
            "0,3", "--projection", "pial", "--native-only",
        ])
        .unwrap();
        let Commands::Resample(args) = cli.command else {
            panic!("expected the resample command");
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.subject, "01");
        assert_eq!(config.hemispheres, vec![Hemi::Left]);
        assert_eq!(config.orders, vec![0, 3]);
        assert_eq!(config.projections, vec![ProjectionType::Pial]);
        assert!(!config.standard_space);
        assert_eq!(config.out_dir, PathBuf::from("resampled"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_excludes_subject_flags() {
        assert!(Cli::try_parse_from(["boldsurf", "resample", "-c", "run.json", "-s", "01"]).is_err());
        assert!(Cli::try_parse_from(["boldsurf", "show-config", "-c", "run.json"]).is_ok());
        assert!(Cli::try_parse_from(["boldsurf", "resample", "-s", "01"]).is_err());
    }

    #[test]
    fn test_unknown_projection_is_rejected() {
        let parsed = Cli::try_parse_from([
            "boldsurf", "resample", "-s", "01", "--fs-dir", "/fs", "--wf-dir", "/wf", "--projection", "radial",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_surface_series_keeps_every_vertex() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("lh_native_pial_order-1_fsavg.mgz");
        let n_vertices = 163_842;
        let data = Array2::from_shape_fn((2, n_vertices), |(t, v)| if t == 0 { v as f64 } else { -1.0 });
        write_surface_series(&path, &ResampledSeries::new(data, vec![n_vertices]))?;

        let (back, _) = read_mgh_frames(&path)?;
        assert_eq!(back.shape(), &[n_vertices, 1, 1, 2]);
        assert_eq!(back[[n_vertices - 1, 0, 0, 0]], (n_vertices - 1) as f64);
        assert_eq!(back[[n_vertices - 1, 0, 0, 1]], -1.0);
        Ok(())
    }
}
