//! Per-subject orchestration of BOLD resampling onto cortical surfaces.
//!
//! [`Hemisphere`] holds the surface geometry and sampling points of one
//! hemisphere, [`InterpolationSession`] holds the BOLD series and its
//! transforms, and [`run_combinations`] drives both for every output a
//! [`ResampleConfig`] asks for.

pub mod combination;
pub mod config;
pub mod error;
pub mod hemisphere;
pub mod layout;
pub mod session;

pub use combination::{run_combinations, Combination, Target};
pub use config::ResampleConfig;
pub use error::{ResampleError, Result};
pub use hemisphere::{Hemi, Hemisphere, NativeSurfaces, ProjectionType, Space, NATIVE};
pub use layout::SubjectLayout;
pub use session::InterpolationSession;
