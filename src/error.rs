//! Crate-level error surface.
//!
//! Not a "god error": a thin wrapper over the canonical capability
//! errors, each of which stays matchable on its own. Per-item migration
//! failures never appear here (they live inside `MigrationResult`); this
//! type is for infrastructure failures that abort a whole call.

use thiserror::Error;

use crate::core::CoreError;
use crate::manifest::ManifestError;
use crate::plan::PlanFileError;
use crate::merge::MergeError;
use crate::quarantine::QuarantineError;
use crate::registry::{ConfigurationError, RegistryError};
use crate::runner::RunnerError;
use crate::snapshot::SnapshotError;
use crate::store::StoreError;
use crate::txn::TxnError;

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (transient contention/outage).
    Retryable,
    /// Unknown if retry will help.
    Unknown,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// Crate-level convenience error.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Txn(#[from] TxnError),

    #[error(transparent)]
    Quarantine(#[from] QuarantineError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    PlanFile(#[from] PlanFileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The batch ran to completion but some documents failed; used by the
    /// CLI to surface a non-zero exit.
    #[error("{failed} of {processed} documents failed")]
    BatchFailed { failed: usize, processed: usize },
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Core(_) | Error::Configuration(_) | Error::Registry(_) => Transience::Permanent,
            Error::Snapshot(e) => e.transience(),
            Error::Store(e) => e.transience(),
            Error::Merge(_) => Transience::Permanent,
            Error::Runner(_) => Transience::Permanent,
            Error::Txn(e) => e.transience(),
            Error::Quarantine(_) | Error::Manifest(_) => Transience::Unknown,
            Error::PlanFile(_) | Error::Io(_) => Transience::Unknown,
            Error::Json(_) => Transience::Permanent,
            Error::BatchFailed { .. } => Transience::Retryable,
        }
    }
}
