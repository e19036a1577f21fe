//! Error types for resampling workflows.
//!
//! File-level failures from `boldsurf-io` pass through [`ResampleError::FileAccess`]
//! untouched; everything else is a structured variant.

use boldsurf_core::CoreError;
use thiserror::Error;

use crate::hemisphere::ProjectionType;

/// Main error type for hemisphere, session and combination operations.
#[derive(Error, Debug)]
pub enum ResampleError {
    /// Reading or writing an input or output file failed.
    #[error(transparent)]
    FileAccess(#[from] anyhow::Error),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Dimension mismatch.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A space name the hemisphere does not know.
    #[error("Unknown space: {0}")]
    UnknownSpace(String),

    /// The space carries no sampling points for this projection.
    #[error("Projection {projection} is not available for space {space}")]
    ProjectionUnavailable {
        space: String,
        projection: ProjectionType,
    },

    /// Standard-space output requested for a space without a correspondence map.
    #[error("Space {0} has no standard-space correspondence")]
    MissingCorrespondence(String),

    /// Spline order outside 0 to 5.
    #[error("Invalid spline order {0} (supported: 0 to 5)")]
    InvalidOrder(u8),
}

/// Result type for resampling operations.
pub type Result<T> = std::result::Result<T, ResampleError>;

impl ResampleError {
    /// Create a dimension mismatch error.
    pub fn dimension(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an unknown space error.
    pub fn unknown_space(name: impl Into<String>) -> Self {
        Self::UnknownSpace(name.into())
    }

    /// Create a projection unavailable error.
    pub fn projection_unavailable(space: impl Into<String>, projection: ProjectionType) -> Self {
        Self::ProjectionUnavailable {
            space: space.into(),
            projection,
        }
    }

    /// Create a missing correspondence error.
    pub fn missing_correspondence(space: impl Into<String>) -> Self {
        Self::MissingCorrespondence(space.into())
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

impl From<CoreError> for ResampleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ShapeMismatch { expected, actual } => Self::ShapeMismatch { expected, actual },
            CoreError::CountMismatch { .. } => Self::DimensionMismatch(err.to_string()),
            CoreError::InvalidOrder(order) => Self::InvalidOrder(order),
            CoreError::SingularAffine { .. } => Self::InvalidConfiguration(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_matching_variants() {
        let err: ResampleError = CoreError::InvalidOrder(7).into();
        assert!(matches!(err, ResampleError::InvalidOrder(7)));

        let err: ResampleError = CoreError::count("warps", 3, 2).into();
        match err {
            ResampleError::DimensionMismatch(msg) => assert!(msg.contains("warps")),
            other => panic!("unexpected variant: {other:?}"),
        }

        let err: ResampleError = CoreError::ShapeMismatch {
            expected: vec![2, 2, 2],
            actual: vec![3, 3, 3],
        }
        .into();
        assert!(matches!(err, ResampleError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_file_errors_are_transparent() {
        let err: ResampleError = anyhow::anyhow!("Failed to read MGH file").into();
        assert_eq!(err.to_string(), "Failed to read MGH file");
    }

    #[test]
    fn test_projection_message_names_space() {
        let err = ResampleError::projection_unavailable("fsavg6", ProjectionType::NormalsSine);
        assert_eq!(
            err.to_string(),
            "Projection normals-sine is not available for space fsavg6"
        );
    }
}
