//! Error type for construction-time checks in the geometry and transform layer.

use thiserror::Error;

/// Errors raised while assembling volumes, series and transform chains.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// An affine that must be inverted has no inverse.
    #[error("Singular affine for {what}")]
    SingularAffine { what: String },

    /// A per-volume list does not have one entry per source volume.
    #[error("Count mismatch for {what}: expected {expected}, got {actual}")]
    CountMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Array shapes that must agree do not.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Spline order outside the supported range.
    #[error("Unsupported spline order {0} (supported: 0 to 5)")]
    InvalidOrder(u8),
}

impl CoreError {
    pub fn singular(what: impl Into<String>) -> Self {
        Self::SingularAffine { what: what.into() }
    }

    pub fn count(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::CountMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
