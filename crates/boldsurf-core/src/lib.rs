pub mod error;
pub mod spatial;
pub mod image;
pub mod mesh;
pub mod sampling;
pub mod transform;
pub mod interpolation;
pub mod filter;

pub use filter::resample;

pub use error::{CoreError, Result};
pub use image::Volume;
pub use mesh::Mesh;
pub use sampling::SamplingBatch;
pub use interpolation::SplineOrder;
