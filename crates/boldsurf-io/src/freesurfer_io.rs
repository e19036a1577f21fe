//! FreeSurfer triangle surfaces (`lh.white`, `rh.sphere.reg`, ...) and
//! "new"-format per-vertex morphometry (`lh.thickness`, `lh.curv`, ...).
//!
//! Both formats are big-endian and start with a 3-byte magic number.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use boldsurf_core::Mesh;
use byteordered::ByteOrdered;
use nalgebra::Vector3;
use tracing::debug;

const TRIANGLE_MAGIC: [u8; 3] = [0xFF, 0xFF, 0xFE];
const NEW_CURV_MAGIC: [u8; 3] = [0xFF, 0xFF, 0xFF];

fn read_magic<R: Read>(input: &mut R) -> Result<[u8; 3]> {
    let mut magic = [0u8; 3];
    input.read_exact(&mut magic)?;
    Ok(magic)
}

fn read_count<R: Read>(input: &mut ByteOrdered<R, byteordered::Endianness>, what: &str) -> Result<usize> {
    let n = input.read_i32()?;
    usize::try_from(n).with_context(|| format!("Negative {} count {}", what, n))
}

/// Read a triangle surface into a [`Mesh`].
pub fn read_surface<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open surface {}", path.display()))?;
    let mut input = BufReader::new(file);
    parse_surface(&mut input).with_context(|| format!("Failed to parse surface {}", path.display()))
}

fn parse_surface<R: BufRead>(input: &mut R) -> Result<Mesh> {
    if read_magic(input)? != TRIANGLE_MAGIC {
        bail!("Not a FreeSurfer triangle surface");
    }
    // creation stamp, then an empty line
    let mut line = Vec::new();
    for _ in 0..2 {
        line.clear();
        input.read_until(b'\n', &mut line)?;
    }

    let mut input = ByteOrdered::runtime(input, byteordered::Endianness::Big);
    let n_vertices = read_count(&mut input, "vertex")?;
    let n_faces = read_count(&mut input, "face")?;

    let mut vertices = Vec::with_capacity(n_vertices);
    for _ in 0..n_vertices {
        let x = input.read_f32()?;
        let y = input.read_f32()?;
        let z = input.read_f32()?;
        vertices.push(Vector3::new(x as f64, y as f64, z as f64));
    }

    let mut faces = Vec::with_capacity(n_faces);
    for _ in 0..n_faces {
        let mut face = [0usize; 3];
        for slot in face.iter_mut() {
            let v = input.read_i32()?;
            *slot = match usize::try_from(v) {
                Ok(v) if v < n_vertices => v,
                _ => bail!("Face index {} out of range for {} vertices", v, n_vertices),
            };
        }
        faces.push(face);
    }

    debug!(n_vertices, n_faces, "parsed triangle surface");
    Ok(Mesh::new(vertices, faces))
}

/// Write a triangle surface.
pub fn write_surface<P: AsRef<Path>>(path: P, mesh: &Mesh) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create surface {}", path.display()))?;
    let mut out = BufWriter::new(file);
    out.write_all(&TRIANGLE_MAGIC)?;
    out.write_all(b"created by boldsurf\n\n")?;

    let mut out = ByteOrdered::be(out);
    out.write_i32(mesh.n_vertices() as i32)?;
    out.write_i32(mesh.n_faces() as i32)?;
    for v in mesh.vertices() {
        for c in v.iter() {
            out.write_f32(*c as f32)?;
        }
    }
    for face in mesh.faces() {
        for &i in face {
            out.write_i32(i as i32)?;
        }
    }
    out.into_inner().flush()?;
    Ok(())
}

/// Read "new"-format morphometry data, one value per vertex.
pub fn read_morph_data<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open morph data {}", path.display()))?;
    let mut input = BufReader::new(file);
    parse_morph(&mut input).with_context(|| format!("Failed to parse morph data {}", path.display()))
}

fn parse_morph<R: Read>(input: &mut R) -> Result<Vec<f64>> {
    if read_magic(input)? != NEW_CURV_MAGIC {
        bail!("Not a new-format FreeSurfer curv file");
    }
    let mut input = ByteOrdered::runtime(input, byteordered::Endianness::Big);
    let n_vertices = read_count(&mut input, "vertex")?;
    let _n_faces = read_count(&mut input, "face")?;
    let per_vertex = read_count(&mut input, "values-per-vertex")?;
    if per_vertex != 1 {
        bail!("Expected one value per vertex, found {}", per_vertex);
    }
    (0..n_vertices)
        .map(|_| -> Result<f64> { Ok(input.read_f32()? as f64) })
        .collect()
}

/// Write "new"-format morphometry data.
pub fn write_morph_data<P: AsRef<Path>>(path: P, values: &[f64], n_faces: usize) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create morph data {}", path.display()))?;
    let mut out = BufWriter::new(file);
    out.write_all(&NEW_CURV_MAGIC)?;
    let mut out = ByteOrdered::be(out);
    out.write_i32(values.len() as i32)?;
    out.write_i32(n_faces as i32)?;
    out.write_i32(1)?;
    for &v in values {
        out.write_f32(v as f32)?;
    }
    out.into_inner().flush()?;
    Ok(())
}
