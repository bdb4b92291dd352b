//! Versioned documents, snapshots, and bundles.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CoreError;
use super::meta::Meta;
use super::version::SchemaVersion;

/// A document as the kernel sees it: opaque identifier, data tree, tag.
///
/// The identifier is opaque to the kernel. The command-line driver uses
/// file paths; an embedding application may use primary keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionedDocument {
    pub identifier: String,
    pub data: Value,
    pub meta: Meta,
}

/// An immutable historical state of a document at a prior version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub data: Value,
    pub meta: Meta,
}

impl Snapshot {
    pub fn new(data: Value, meta: Meta) -> Self {
        Snapshot { data, meta }
    }
}

/// A document plus the historical snapshots associated with it.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentBundle {
    pub current: VersionedDocument,
    pub snapshots: Vec<Snapshot>,
}

impl DocumentBundle {
    /// Build a bundle, enforcing that every snapshot belongs to the same
    /// document family as the current document.
    pub fn new(
        current: VersionedDocument,
        snapshots: Vec<Snapshot>,
    ) -> Result<Self, CoreError> {
        for snapshot in &snapshots {
            if snapshot.meta.doc_type != current.meta.doc_type {
                return Err(CoreError::SnapshotDocTypeMismatch {
                    identifier: current.identifier.clone(),
                    expected: current.meta.doc_type.clone(),
                    got: snapshot.meta.doc_type.clone(),
                });
            }
        }
        Ok(DocumentBundle { current, snapshots })
    }

    /// True when a snapshot exists at a strictly newer version than the
    /// current document, the signature of rollback history.
    pub fn has_newer_snapshot(&self) -> bool {
        self.snapshots
            .iter()
            .any(|s| s.meta.version > self.current.meta.version)
    }

    /// Lowest-version snapshot, the common ancestor for a merge.
    pub fn oldest_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.iter().min_by(|a, b| a.meta.version.cmp(&b.meta.version))
    }

    /// Highest-version snapshot, the pre-rollback edited state.
    pub fn newest_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.iter().max_by(|a, b| a.meta.version.cmp(&b.meta.version))
    }

    pub fn version(&self) -> &SchemaVersion {
        &self.current.meta.version
    }

    pub fn doc_type(&self) -> &str {
        &self.current.meta.doc_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(doc_type: &str, version: &str) -> Meta {
        Meta::new(doc_type, SchemaVersion::parse(version).unwrap())
    }

    fn doc(version: &str) -> VersionedDocument {
        VersionedDocument {
            identifier: "a.json".into(),
            data: json!({"timeout": 30}),
            meta: meta("PkgConf", version),
        }
    }

    #[test]
    fn rejects_foreign_snapshots() {
        let err = DocumentBundle::new(
            doc("1.0"),
            vec![Snapshot::new(json!({}), meta("Other", "1.0"))],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::SnapshotDocTypeMismatch { .. }));
    }

    #[test]
    fn newer_snapshot_detection() {
        let without = DocumentBundle::new(
            doc("1.0"),
            vec![Snapshot::new(json!({}), meta("PkgConf", "0.9"))],
        )
        .unwrap();
        assert!(!without.has_newer_snapshot());

        let with = DocumentBundle::new(
            doc("1.0"),
            vec![
                Snapshot::new(json!({}), meta("PkgConf", "0.9")),
                Snapshot::new(json!({}), meta("PkgConf", "2.0")),
            ],
        )
        .unwrap();
        assert!(with.has_newer_snapshot());
        assert_eq!(with.oldest_snapshot().unwrap().meta.version.to_string(), "0.9");
        assert_eq!(with.newest_snapshot().unwrap().meta.version.to_string(), "2.0");
    }
}
