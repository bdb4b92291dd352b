//! Migration results and quarantine diagnostics.
//!
//! Per-item outcomes are data, not errors: a batch run always yields a
//! `MigrationResult` whose `failures` carry structured quarantine records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{DocumentBundle, Meta, Snapshot};

pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_ROLLED_BACK: &str = "Rolled Back";

/// Why a document was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarantineReason {
    SchemaValidationFailure,
    SnapshotIntegrityFailure,
    ExecutionFailure,
    PlannedQuarantine,
    NoMigrationPath,
}

impl QuarantineReason {
    fn suggested_next_steps(self) -> &'static str {
        match self {
            QuarantineReason::SchemaValidationFailure => {
                "fix the document so it matches its registered shape, then retry"
            }
            QuarantineReason::SnapshotIntegrityFailure => {
                "restore the snapshot file from backup or remove it, then retry"
            }
            QuarantineReason::ExecutionFailure => {
                "inspect the failure details; the migration may succeed on retry"
            }
            QuarantineReason::PlannedQuarantine => {
                "re-plan against a target version this document can reach"
            }
            QuarantineReason::NoMigrationPath => {
                "register a migration step covering this document's version"
            }
        }
    }
}

/// Structured diagnostic for one refused document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineRecord {
    pub identifier: String,
    pub reason: QuarantineReason,
    pub details: String,
    pub content_hash: String,
    pub suggested_next_steps: String,
}

impl QuarantineRecord {
    pub fn new(
        identifier: impl Into<String>,
        reason: QuarantineReason,
        details: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> Self {
        QuarantineRecord {
            identifier: identifier.into(),
            reason,
            details: details.into(),
            content_hash: content_hash.into(),
            suggested_next_steps: reason.suggested_next_steps().to_string(),
        }
    }
}

/// Per-document outcome of loading from the store.
///
/// Integrity and validation failures surface here as data so the planner
/// can still classify the document and the runner can still report it,
/// instead of one bad file aborting the batch.
#[derive(Clone, Debug)]
pub enum BundleLoad {
    Loaded(DocumentBundle),
    Failed(ItemFailure),
}

impl BundleLoad {
    pub fn identifier(&self) -> &str {
        match self {
            BundleLoad::Loaded(bundle) => &bundle.current.identifier,
            BundleLoad::Failed(failure) => &failure.identifier,
        }
    }
}

/// What one successful migration produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMigrationResult {
    pub data: Value,
    pub new_meta: Meta,
    pub snapshots_to_persist: Vec<Snapshot>,
    pub snapshots_to_delete: Vec<Meta>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSuccess {
    pub identifier: String,
    pub outcome: DataMigrationResult,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub identifier: String,
    pub original_data: Value,
    pub original_meta: Meta,
    pub record: QuarantineRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub status: String,
    pub duration_ms: u64,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// The full outcome of one batch run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub summary: MigrationSummary,
    pub successes: Vec<ItemSuccess>,
    pub failures: Vec<ItemFailure>,
}

impl MigrationResult {
    pub fn assemble(
        successes: Vec<ItemSuccess>,
        failures: Vec<ItemFailure>,
        skipped: usize,
        duration_ms: u64,
    ) -> Self {
        let summary = MigrationSummary {
            status: STATUS_COMPLETED.to_string(),
            duration_ms,
            processed: successes.len() + failures.len(),
            succeeded: successes.len(),
            failed: failures.len(),
            skipped,
        };
        MigrationResult {
            summary,
            successes,
            failures,
        }
    }

    /// An empty result for a resume-as-rollback run.
    pub fn rolled_back(duration_ms: u64) -> Self {
        MigrationResult {
            summary: MigrationSummary {
                status: STATUS_ROLLED_BACK.to_string(),
                duration_ms,
                processed: 0,
                succeeded: 0,
                failed: 0,
                skipped: 0,
            },
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn failed_identifiers(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.identifier.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SchemaVersion;
    use serde_json::json;

    #[test]
    fn reason_serializes_as_bare_name() {
        let json = serde_json::to_value(QuarantineReason::SnapshotIntegrityFailure).unwrap();
        assert_eq!(json, json!("SnapshotIntegrityFailure"));
    }

    #[test]
    fn summary_counts_add_up() {
        let meta = Meta::new("PkgConf", SchemaVersion::parse("1.0").unwrap());
        let result = MigrationResult::assemble(
            vec![ItemSuccess {
                identifier: "a.json".into(),
                outcome: DataMigrationResult {
                    data: json!({}),
                    new_meta: meta.clone(),
                    snapshots_to_persist: vec![],
                    snapshots_to_delete: vec![],
                },
            }],
            vec![ItemFailure {
                identifier: "b.json".into(),
                original_data: json!({}),
                original_meta: meta,
                record: QuarantineRecord::new(
                    "b.json",
                    QuarantineReason::ExecutionFailure,
                    "step failed",
                    "00",
                ),
            }],
            1,
            5,
        );
        assert_eq!(result.summary.status, STATUS_COMPLETED);
        assert_eq!(result.summary.processed, 2);
        assert_eq!(result.summary.succeeded, 1);
        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.summary.skipped, 1);
    }
}
