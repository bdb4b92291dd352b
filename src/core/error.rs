//! Core domain errors.
//!
//! These are bounded and stable: core errors represent domain/refusal
//! states, not library implementation details.

use thiserror::Error;

pub use super::version::InvalidVersion;

/// Canonical error enum for the document model.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidVersion(#[from] InvalidVersion),

    #[error(
        "snapshot doc type `{got}` does not match document `{identifier}` (doc type `{expected}`)"
    )]
    SnapshotDocTypeMismatch {
        identifier: String,
        expected: String,
        got: String,
    },
}
