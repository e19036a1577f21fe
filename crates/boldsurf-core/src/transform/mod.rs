//! Transform types and operations.
//!
//! This module provides the [`Transform`] trait, the affine and
//! displacement-field transforms, their composition, and the per-subject
//! [`TransformChain`] that maps sampling points into source voxel indices.

pub mod affine;
pub mod chain;
pub mod chained;
pub mod displacement_field;
pub mod trait_;

pub use affine::AffineTransform;
pub use chain::{TransformChain, VolumeTransform};
pub use chained::ChainedTransform;
pub use displacement_field::DisplacementField;
pub use trait_::Transform;
