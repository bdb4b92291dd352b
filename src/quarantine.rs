//! Quarantine store.
//!
//! Side storage for documents the kernel refuses to migrate. The source
//! file moves into the quarantine directory under a name embedding its
//! content hash, with a JSON diagnostic report written next to it. The
//! move and the report are completed before the failure is reported, so
//! the report path is deterministic for the caller.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fsio;
use crate::outcome::QuarantineRecord;

const REPORT_SUFFIX: &str = ".quarantine.json";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuarantineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where one quarantined document ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantinePaths {
    pub quarantined: PathBuf,
    pub report: PathBuf,
}

/// Moves refused documents aside; disabled when no directory is
/// configured.
#[derive(Debug, Clone, Default)]
pub struct QuarantineStore {
    dir: Option<PathBuf>,
}

impl QuarantineStore {
    pub fn new(dir: Option<PathBuf>) -> Self {
        QuarantineStore { dir }
    }

    pub fn disabled() -> Self {
        QuarantineStore { dir: None }
    }

    /// Move `source_path` into quarantine and write its report.
    ///
    /// Returns `None` when no quarantine directory is configured; nothing
    /// is touched in that case. Overwriting a previously quarantined file
    /// with the same name is permitted. A source that no longer exists
    /// still gets its report.
    pub fn quarantine(
        &self,
        source_path: &Path,
        record: &QuarantineRecord,
    ) -> Result<Option<QuarantinePaths>, QuarantineError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        std::fs::create_dir_all(dir)?;

        let quarantined = dir.join(quarantined_name(source_path, &record.content_hash));
        if source_path.exists() {
            fsio::move_file(source_path, &quarantined)?;
        } else {
            tracing::warn!(
                "quarantine: source {} is gone, writing report only",
                source_path.display()
            );
        }

        let report = quarantined.with_file_name(format!(
            "{}{REPORT_SUFFIX}",
            quarantined
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));
        let mut bytes = serde_json::to_vec_pretty(record)?;
        bytes.push(b'\n');
        fsio::atomic_write(&report, &bytes)?;

        Ok(Some(QuarantinePaths {
            quarantined,
            report,
        }))
    }
}

/// `config.json` + hash `deadbeef…` becomes `config.deadbeef.json`; the
/// short hash keeps quarantined files traceable and unique.
fn quarantined_name(source_path: &Path, content_hash: &str) -> String {
    let short = &content_hash[..content_hash.len().min(8)];
    let stem = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    match source_path.extension() {
        Some(ext) => format!("{stem}.{short}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{short}"),
    }
}
