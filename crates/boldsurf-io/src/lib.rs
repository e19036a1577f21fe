pub mod freesurfer_io;
pub mod itk_io;
pub mod lta_io;
pub mod mgh_io;
pub mod nifti_io;

pub use freesurfer_io::{read_morph_data, read_surface, write_morph_data, write_surface};
pub use itk_io::{read_itk_transform, read_itk_transform_array};
pub use lta_io::{read_lta, LtaTransform, VolumeGeometry};
pub use mgh_io::{read_mgh, read_mgh_frames, write_mgh, write_mgh_frames};
pub use nifti_io::{read_displacement_field, read_nifti, write_nifti};
