pub mod resample;
pub mod spline;

pub use resample::{ResampledSeries, SourceSeries, VolumetricResampler};
pub use spline::{spline_filter, spline_poles};
