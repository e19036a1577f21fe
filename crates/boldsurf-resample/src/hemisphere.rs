//! Per-hemisphere surface geometry and the sampling points derived from it.
//!
//! A [`Hemisphere`] is built in three steps: the native surfaces are
//! loaded, the cortical sampling points of every projection are computed,
//! and the nearest-neighbour correspondence onto the standard sphere is
//! built. Additional spaces (other topologies registered to the same
//! sphere) are added afterwards with [`Hemisphere::resample`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use boldsurf_core::mesh::barycentric::{barycentric_resample, resample_field};
use boldsurf_core::mesh::{
    mesh_correspondence, vertex_normals_equal_weight, vertex_normals_sine_weight, MeshCorrespondence,
};
use boldsurf_core::sampling::{default_depth_fractions, surface_coords_normal, surface_coords_pial};
use boldsurf_core::{Mesh, SamplingBatch};
use boldsurf_io::{read_mgh, read_morph_data, read_surface};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ResampleError, Result};
use crate::layout::SubjectLayout;

/// Name of the space holding the subject's own topology.
pub const NATIVE: &str = "native";

/// Cortical hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Hemi {
    #[serde(rename = "l", alias = "lh")]
    Left,
    #[serde(rename = "r", alias = "rh")]
    Right,
}

impl Hemi {
    pub const BOTH: [Hemi; 2] = [Hemi::Left, Hemi::Right];

    /// FreeSurfer file prefix, `"lh"` or `"rh"`.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Hemi::Left => "lh",
            Hemi::Right => "rh",
        }
    }
}

impl fmt::Display for Hemi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_prefix())
    }
}

impl FromStr for Hemi {
    type Err = ResampleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "l" | "lh" => Ok(Hemi::Left),
            "r" | "rh" => Ok(Hemi::Right),
            other => Err(ResampleError::invalid_config(format!("unknown hemisphere '{other}'"))),
        }
    }
}

/// How sampling points are placed between the white and pial surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProjectionType {
    /// Along sine-weighted vertex normals, scaled by cortical thickness.
    #[serde(rename = "normals-sine", alias = "normals_sine")]
    NormalsSine,
    /// Along equally weighted vertex normals, scaled by cortical thickness.
    #[serde(rename = "normals-equal", alias = "normals_equal")]
    NormalsEqual,
    /// On the straight segment from each white vertex to its pial vertex.
    #[serde(rename = "pial")]
    Pial,
}

impl ProjectionType {
    pub const ALL: [ProjectionType; 3] = [
        ProjectionType::NormalsSine,
        ProjectionType::NormalsEqual,
        ProjectionType::Pial,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProjectionType::NormalsSine => "normals-sine",
            ProjectionType::NormalsEqual => "normals-equal",
            ProjectionType::Pial => "pial",
        }
    }
}

impl fmt::Display for ProjectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProjectionType {
    type Err = ResampleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normals-sine" | "normals_sine" => Ok(ProjectionType::NormalsSine),
            "normals-equal" | "normals_equal" => Ok(ProjectionType::NormalsEqual),
            "pial" => Ok(ProjectionType::Pial),
            other => Err(ResampleError::invalid_config(format!("unknown projection '{other}'"))),
        }
    }
}

/// One surface topology of a hemisphere with its sampling points.
#[derive(Debug, Clone)]
pub struct Space {
    name: String,
    white: Vec<Vector3<f64>>,
    pial: Vec<Vector3<f64>>,
    faces: Option<Vec<[usize; 3]>>,
    thickness: Option<Vec<f64>>,
    normals: BTreeMap<ProjectionType, Vec<Vector3<f64>>>,
    batches: BTreeMap<ProjectionType, SamplingBatch>,
    to_standard: Option<MeshCorrespondence>,
}

impl Space {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn white(&self) -> &[Vector3<f64>] {
        &self.white
    }

    pub fn pial(&self) -> &[Vector3<f64>] {
        &self.pial
    }

    pub fn faces(&self) -> Option<&[[usize; 3]]> {
        self.faces.as_deref()
    }

    pub fn n_vertices(&self) -> usize {
        self.white.len()
    }

    pub fn thickness(&self) -> Option<&[f64]> {
        self.thickness.as_deref()
    }

    /// Vertex normals behind a normal-based projection.
    pub fn normals(&self, projection: ProjectionType) -> Option<&[Vector3<f64>]> {
        self.normals.get(&projection).map(Vec::as_slice)
    }

    /// Sampling points for `projection`, if this space has them.
    pub fn batch(&self, projection: ProjectionType) -> Option<&SamplingBatch> {
        self.batches.get(&projection)
    }

    pub fn projections(&self) -> impl Iterator<Item = ProjectionType> + '_ {
        self.batches.keys().copied()
    }

    /// `(n_vertices, n_depths)`, shared by every projection of the space.
    pub fn shape(&self) -> &[usize] {
        self.batches
            .values()
            .next()
            .map(|b| b.shape())
            .unwrap_or(&[])
    }

    /// Transport onto the standard sphere; only the native space has one.
    pub fn to_standard(&self) -> Option<&MeshCorrespondence> {
        self.to_standard.as_ref()
    }
}

/// Native surfaces of one hemisphere, all sharing the white topology.
#[derive(Debug, Clone)]
pub struct NativeSurfaces {
    pub white: Mesh,
    pub pial: Vec<Vector3<f64>>,
    pub thickness: Vec<f64>,
    pub sphere_reg: Vec<Vector3<f64>>,
}

/// Geometry of one hemisphere across all of its spaces.
#[derive(Debug, Clone)]
pub struct Hemisphere {
    hemi: Hemi,
    c_ras: Vector3<f64>,
    sphere: Mesh,
    spaces: Vec<Space>,
}

impl Hemisphere {
    /// Read the native surfaces, `c_ras` and the standard sphere from disk.
    pub fn load(layout: &SubjectLayout, hemi: Hemi) -> Result<Self> {
        info!("Loading {} surfaces for sub-{}", hemi, layout.subject());
        let white = read_surface(layout.surface(hemi, "white"))?;
        let pial = read_surface(layout.surface(hemi, "pial"))?;
        let thickness = read_morph_data(layout.surface(hemi, "thickness"))?;
        let sphere_reg = read_surface(layout.surface(hemi, "sphere.reg"))?;
        let c_ras = read_mgh(layout.t1())?.center_world();
        let standard = read_surface(layout.standard_sphere(hemi))?;

        let native = NativeSurfaces {
            white,
            pial: pial.into_parts().0,
            thickness,
            sphere_reg: sphere_reg.into_parts().0,
        };
        Self::new(hemi, native, c_ras, standard.vertices())
    }

    /// Build the native space and its correspondence onto `standard_sphere`.
    ///
    /// # Errors
    /// If the native surfaces disagree on vertex count or the white surface
    /// has no faces.
    pub fn new(
        hemi: Hemi,
        native: NativeSurfaces,
        c_ras: Vector3<f64>,
        standard_sphere: &[Vector3<f64>],
    ) -> Result<Self> {
        let n = native.white.n_vertices();
        for (what, len) in [
            ("pial", native.pial.len()),
            ("thickness", native.thickness.len()),
            ("sphere.reg", native.sphere_reg.len()),
        ] {
            if len != n {
                return Err(ResampleError::dimension(format!(
                    "{hemi} {what} has {len} vertices, white has {n}"
                )));
            }
        }
        if native.white.n_faces() == 0 {
            return Err(ResampleError::invalid_config(format!("{hemi} white surface has no faces")));
        }

        let (white, faces) = native.white.into_parts();
        let normals = BTreeMap::from([
            (ProjectionType::NormalsSine, vertex_normals_sine_weight(&white, &faces)),
            (ProjectionType::NormalsEqual, vertex_normals_equal_weight(&white, &faces)),
        ]);
        let batches = native_batches(&white, &native.pial, &native.thickness, &normals, &c_ras);
        let sphere = Mesh::new(native.sphere_reg, faces.clone());
        let to_standard = mesh_correspondence(sphere.vertices(), standard_sphere, true);
        info!(
            "{} native space: {} vertices, {} standard vertices",
            hemi,
            n,
            to_standard.n_target()
        );

        let space = Space {
            name: NATIVE.to_string(),
            white,
            pial: native.pial,
            faces: Some(faces),
            thickness: Some(native.thickness),
            normals,
            batches,
            to_standard: Some(to_standard),
        };
        Ok(Self {
            hemi,
            c_ras,
            sphere,
            spaces: vec![space],
        })
    }

    pub fn hemi(&self) -> Hemi {
        self.hemi
    }

    pub fn c_ras(&self) -> &Vector3<f64> {
        &self.c_ras
    }

    /// Native registered sphere, with the white topology.
    pub fn sphere(&self) -> &Mesh {
        &self.sphere
    }

    pub fn native(&self) -> &Space {
        &self.spaces[0]
    }

    /// Spaces in creation order, native first.
    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    pub fn space(&self, name: &str) -> Result<&Space> {
        self.spaces
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ResampleError::unknown_space(name))
    }

    /// Carry white and pial coordinates onto the topology whose sphere
    /// positions are `new_coords`, and register it as space `name`.
    ///
    /// Each new vertex is located on the native sphere and the native
    /// coordinates are blended with its barycentric weights. The new space
    /// has only [`ProjectionType::Pial`] sampling points and no
    /// standard-space correspondence. A space of the same name is replaced
    /// in place.
    ///
    /// # Errors
    /// If `name` is the native space.
    ///
    /// # Panics
    /// If `new_faces` references a vertex beyond `new_coords`.
    pub fn resample(
        &mut self,
        name: &str,
        new_coords: &[Vector3<f64>],
        new_faces: Option<Vec<[usize; 3]>>,
    ) -> Result<&Space> {
        if name == NATIVE {
            return Err(ResampleError::invalid_config("the native space cannot be replaced"));
        }
        if let Some(faces) = &new_faces {
            assert!(
                faces.iter().flatten().all(|&v| v < new_coords.len()),
                "face index out of range"
            );
        }

        let located = barycentric_resample(&self.sphere, new_coords);
        let native = self.native();
        let white = resample_field(native.white(), &located);
        let pial = resample_field(native.pial(), &located);

        let mut batches = BTreeMap::new();
        batches.insert(
            ProjectionType::Pial,
            surface_coords_pial(&white, &self.c_ras, &pial, &default_depth_fractions()),
        );
        let space = Space {
            name: name.to_string(),
            white,
            pial,
            faces: new_faces,
            thickness: None,
            normals: BTreeMap::new(),
            batches,
            to_standard: None,
        };
        debug!("{} space {}: {} vertices", self.hemi, name, space.n_vertices());

        let index = match self.spaces.iter().position(|s| s.name == name) {
            Some(i) => {
                self.spaces[i] = space;
                i
            }
            None => {
                self.spaces.push(space);
                self.spaces.len() - 1
            }
        };
        Ok(&self.spaces[index])
    }
}

fn native_batches(
    white: &[Vector3<f64>],
    pial: &[Vector3<f64>],
    thickness: &[f64],
    normals: &BTreeMap<ProjectionType, Vec<Vector3<f64>>>,
    c_ras: &Vector3<f64>,
) -> BTreeMap<ProjectionType, SamplingBatch> {
    let fracs = default_depth_fractions();
    let mut batches: BTreeMap<ProjectionType, SamplingBatch> = normals
        .iter()
        .map(|(&projection, n)| (projection, surface_coords_normal(white, c_ras, n, thickness, &fracs)))
        .collect();
    batches.insert(ProjectionType::Pial, surface_coords_pial(white, c_ras, pial, &fracs));

    let shape = batches[&ProjectionType::Pial].shape();
    for batch in batches.values() {
        assert_eq!(batch.shape(), shape, "projection shapes disagree");
    }
    batches
}
