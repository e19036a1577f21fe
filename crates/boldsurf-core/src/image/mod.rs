//! Voxel volumes with a voxel-to-world affine, and voxel grid helpers.

pub mod grid;
pub mod volume;

pub use volume::Volume;
