//! Document store: bundle loading and result persistence.
//!
//! Loading reads a document file, extracts its `_meta` tag, verifies and
//! attaches every sibling snapshot, and applies the validation
//! collaborator's verdict. Anything wrong with one document becomes a
//! per-item `BundleLoad::Failed` so the batch keeps going; only real IO
//! trouble aborts the call.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::core::{CoreError, DocumentBundle, Meta, Snapshot, VersionedDocument};
use crate::error::Transience;
use crate::fsio;
use crate::outcome::{BundleLoad, DataMigrationResult, ItemFailure, QuarantineReason, QuarantineRecord};
use crate::registry::MigrationRegistry;
use crate::snapshot::{SnapshotError, SnapshotStore, content_hash};
use crate::validate::validate_document;
use crate::wire;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("IO error on `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Wire(#[from] wire::WireError),
}

impl StoreError {
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::Io { .. } => Transience::Unknown,
            StoreError::Snapshot(e) => e.transience(),
            StoreError::Core(_) | StoreError::Wire(_) => Transience::Permanent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentStore {
    snapshots: SnapshotStore,
}

impl DocumentStore {
    pub fn new() -> Self {
        DocumentStore {
            snapshots: SnapshotStore::new(),
        }
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Load one document and its snapshot history.
    pub fn load_bundle(
        &self,
        registry: &MigrationRegistry,
        path: &Path,
    ) -> Result<BundleLoad, StoreError> {
        let identifier = path.display().to_string();
        let bytes = fs::read(path).map_err(|source| StoreError::Io {
            path: identifier.clone(),
            source,
        })?;
        let hash = content_hash(&bytes);

        // A document without `_meta` belongs to the host's only registered
        // doc type, when that is unambiguous.
        let doc_types = registry.registered_doc_types();
        let fallback = match doc_types.as_slice() {
            [only] => Some(*only),
            _ => None,
        };

        let (data, meta) = match wire::decode(&bytes, fallback) {
            Ok(decoded) => decoded,
            Err(err) => {
                return Ok(BundleLoad::Failed(ItemFailure {
                    identifier: identifier.clone(),
                    original_data: serde_json::Value::Null,
                    original_meta: Meta::new(
                        fallback.unwrap_or("unknown"),
                        crate::core::SchemaVersion::initial(),
                    ),
                    record: QuarantineRecord::new(
                        identifier,
                        QuarantineReason::SchemaValidationFailure,
                        format!("document failed to parse: {err}"),
                        hash,
                    ),
                }));
            }
        };

        // Validation collaborator: only documents whose shape is known can
        // be validated; unknown shapes are the planner's business.
        if let Ok(shape_id) = registry.shape_for(&meta.doc_type, &meta.version)
            && let Err(err) = validate_document(registry.shape(shape_id), &data)
        {
            return Ok(BundleLoad::Failed(ItemFailure {
                identifier: identifier.clone(),
                original_data: data,
                original_meta: meta,
                record: QuarantineRecord::new(
                    identifier,
                    QuarantineReason::SchemaValidationFailure,
                    err.to_string(),
                    hash,
                ),
            }));
        }

        let mut snapshots = Vec::new();
        for (snapshot_path, name) in self.snapshots.list_for(path)? {
            let snapshot_bytes = match self.snapshots.read_and_verify(&snapshot_path) {
                Ok(bytes) => bytes,
                Err(err @ SnapshotError::Integrity { .. })
                | Err(err @ SnapshotError::MalformedName { .. }) => {
                    return Ok(BundleLoad::Failed(ItemFailure {
                        identifier: identifier.clone(),
                        original_data: data,
                        original_meta: meta,
                        record: QuarantineRecord::new(
                            identifier,
                            QuarantineReason::SnapshotIntegrityFailure,
                            err.to_string(),
                            hash,
                        ),
                    }));
                }
                Err(err) => return Err(err.into()),
            };

            let (snapshot_data, snapshot_meta) =
                match wire::decode(&snapshot_bytes, Some(&meta.doc_type)) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        return Ok(BundleLoad::Failed(ItemFailure {
                            identifier: identifier.clone(),
                            original_data: data,
                            original_meta: meta,
                            record: QuarantineRecord::new(
                                identifier,
                                QuarantineReason::SnapshotIntegrityFailure,
                                format!(
                                    "snapshot {} failed to parse: {err}",
                                    snapshot_path.display()
                                ),
                                hash,
                            ),
                        }));
                    }
                };

            if snapshot_meta.version != name.version {
                return Ok(BundleLoad::Failed(ItemFailure {
                    identifier: identifier.clone(),
                    original_data: data,
                    original_meta: meta,
                    record: QuarantineRecord::new(
                        identifier,
                        QuarantineReason::SnapshotIntegrityFailure,
                        format!(
                            "snapshot {} is tagged {} but named v{}",
                            snapshot_path.display(),
                            snapshot_meta.version,
                            name.version
                        ),
                        hash,
                    ),
                }));
            }
            if snapshot_meta.doc_type != meta.doc_type {
                tracing::warn!(
                    "ignoring snapshot {} of foreign doc type `{}`",
                    snapshot_path.display(),
                    snapshot_meta.doc_type
                );
                continue;
            }

            snapshots.push(Snapshot::new(snapshot_data, snapshot_meta));
        }

        let bundle = DocumentBundle::new(
            VersionedDocument {
                identifier,
                data,
                meta,
            },
            snapshots,
        )?;
        Ok(BundleLoad::Loaded(bundle))
    }

    /// Persist one successful migration.
    ///
    /// Order matters: new snapshots land before the document is
    /// overwritten, deletions only after. A merge may persist a snapshot
    /// at the same version as the history it consumed, so deletion spares
    /// anything this call just wrote.
    pub fn persist(&self, path: &Path, outcome: &DataMigrationResult) -> Result<(), StoreError> {
        let mut created = Vec::new();
        for snapshot in &outcome.snapshots_to_persist {
            let bytes = wire::encode(&snapshot.data, &snapshot.meta)?;
            created.push(self.snapshots.create(path, &bytes, &snapshot.meta.version)?);
        }

        let bytes = wire::encode(&outcome.data, &outcome.new_meta)?;
        fsio::atomic_write(path, &bytes).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;

        if !outcome.snapshots_to_delete.is_empty() {
            for (snapshot_path, name) in self.snapshots.list_for(path)? {
                let retired = outcome
                    .snapshots_to_delete
                    .iter()
                    .any(|meta| meta.version == name.version);
                if retired && !created.contains(&snapshot_path) {
                    fs::remove_file(&snapshot_path).map_err(|source| StoreError::Io {
                        path: snapshot_path.display().to_string(),
                        source,
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Read just the `_meta` tag of a persisted document.
    pub fn read_meta(
        &self,
        registry: &MigrationRegistry,
        path: &Path,
    ) -> Result<Meta, StoreError> {
        let bytes = fs::read(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let doc_types = registry.registered_doc_types();
        let fallback = match doc_types.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        let (_, meta) = wire::decode(&bytes, fallback)?;
        Ok(meta)
    }
}
