//! High-level facade over the migration kernel.
//!
//! A `Migrator` owns the registry and the stores it was constructed with;
//! nothing here reaches for global state. The command-line driver and
//! embedding applications call these entry points.

use std::path::{Path, PathBuf};
use std::time::Instant;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::SchemaVersion;
use crate::error::Error;
use crate::outcome::{BundleLoad, MigrationResult};
use crate::plan::{ActionKind, Plan, plan_downgrade, plan_upgrade};
use crate::quarantine::QuarantineStore;
use crate::registry::MigrationRegistry;
use crate::runner::Runner;
use crate::snapshot::GcReport;
use crate::store::DocumentStore;
use crate::txn::TransactionManager;
use crate::{fsio, outcome};

/// GC outcomes per document.
#[derive(Debug, Default)]
pub struct GcSummary {
    pub documents: Vec<(PathBuf, GcReport)>,
}

impl GcSummary {
    pub fn deleted(&self) -> usize {
        self.documents.iter().map(|(_, r)| r.deleted.len()).sum()
    }

    pub fn kept(&self) -> usize {
        self.documents.iter().map(|(_, r)| r.kept.len()).sum()
    }

    pub fn unverifiable(&self) -> usize {
        self.documents
            .iter()
            .map(|(_, r)| r.unverifiable.len())
            .sum()
    }
}

pub struct Migrator {
    registry: MigrationRegistry,
    store: DocumentStore,
    quarantine: QuarantineStore,
}

impl Migrator {
    pub fn new(registry: MigrationRegistry, quarantine: QuarantineStore) -> Self {
        Migrator {
            registry,
            store: DocumentStore::new(),
            quarantine,
        }
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Load bundles for a set of document paths.
    pub fn load(&self, paths: &[PathBuf]) -> Result<Vec<BundleLoad>, Error> {
        let mut loads = Vec::with_capacity(paths.len());
        for path in paths {
            loads.push(self.store.load_bundle(&self.registry, path)?);
        }
        Ok(loads)
    }

    /// Plan an upgrade of `paths` to the latest registered versions.
    pub fn plan_upgrade(&self, paths: &[PathBuf]) -> Result<Plan, Error> {
        let loads = self.load(paths)?;
        Ok(plan_upgrade(&self.registry, &loads, now_utc()))
    }

    /// Plan a rollback of `paths` to one explicit version.
    pub fn plan_rollback(&self, paths: &[PathBuf], target: &SchemaVersion) -> Result<Plan, Error> {
        let loads = self.load(paths)?;
        Ok(plan_downgrade(
            &self.registry,
            &loads,
            target.clone(),
            now_utc(),
        ))
    }

    /// Build a fresh upgrade plan over exactly the failed identifiers of
    /// a previous result. Targets re-resolve from the registry per doc
    /// type at execution time.
    pub fn retry_failed(&self, previous: &MigrationResult) -> Result<Plan, Error> {
        let paths: Vec<PathBuf> = previous
            .failed_identifiers()
            .into_iter()
            .map(PathBuf::from)
            .collect();
        self.plan_upgrade(&paths)
    }

    /// Execute a plan against the filesystem.
    ///
    /// With a transaction directory the whole batch is resumable: refuse
    /// if a prior journal is `InProgress`, back up originals, and leave
    /// the journal behind on a crash so `resume` can restore them.
    pub fn execute(
        &self,
        plan: &Plan,
        transactions_dir: Option<&Path>,
    ) -> Result<MigrationResult, Error> {
        let paths: Vec<PathBuf> = plan
            .actions
            .iter()
            .map(|action| PathBuf::from(&action.identifier))
            .collect();
        let loads = self.load(&paths)?;

        let manager = match transactions_dir {
            Some(dir) => Some(TransactionManager::new(dir)?),
            None => None,
        };
        let mut txn = match &manager {
            Some(manager) => {
                let mutating: Vec<PathBuf> = plan
                    .actions
                    .iter()
                    .filter(|action| action.kind != ActionKind::Skip)
                    .map(|action| PathBuf::from(&action.identifier))
                    .collect();
                let mut txn = manager.begin(mutating)?;
                txn.backup()?;
                Some(txn)
            }
            None => None,
        };

        let result = Runner::new(&self.registry).run(plan, loads)?;

        for success in &result.successes {
            let action = plan
                .actions
                .iter()
                .find(|action| action.identifier == success.identifier);
            if matches!(action, Some(action) if action.kind == ActionKind::Skip) {
                continue;
            }
            let path = Path::new(&success.identifier);
            if let Some(txn) = &mut txn {
                txn.mark_processing(path)?;
            }
            self.store.persist(path, &success.outcome)?;
            if let Some(txn) = &mut txn {
                txn.mark_completed(path)?;
            }
        }

        for failure in &result.failures {
            let path = Path::new(&failure.identifier);
            let moved = self.quarantine.quarantine(path, &failure.record)?;
            if let Some(paths) = &moved {
                // The document's history goes with it.
                self.move_snapshots_aside(path, &paths.quarantined)?;
                tracing::info!(
                    "quarantined {} -> {}",
                    failure.identifier,
                    paths.report.display()
                );
            }
            if let Some(txn) = &mut txn {
                txn.mark_completed(path)?;
            }
        }

        if let Some(txn) = txn {
            txn.commit()?;
        }
        Ok(result)
    }

    /// Roll back an interrupted transaction under `transactions_dir`.
    pub fn resume(&self, transactions_dir: &Path) -> Result<MigrationResult, Error> {
        let started = Instant::now();
        let manager = TransactionManager::new(transactions_dir)?;
        let report = manager.resume()?;
        tracing::info!(
            "resume: transaction {} rolled back ({} files)",
            report.transaction_id,
            report.restored.len()
        );
        Ok(MigrationResult::rolled_back(
            started.elapsed().as_millis() as u64
        ))
    }

    /// Garbage-collect obsolete snapshots for a set of documents.
    pub fn gc(&self, paths: &[PathBuf]) -> Result<GcSummary, Error> {
        let mut summary = GcSummary::default();
        for path in paths {
            let meta = match self.store.read_meta(&self.registry, path) {
                Ok(meta) => meta,
                Err(err) => {
                    tracing::warn!("gc: skipping {}: {err}", path.display());
                    continue;
                }
            };
            let report = self.store.snapshots().gc(path, &meta.version)?;
            summary.documents.push((path.clone(), report));
        }
        Ok(summary)
    }

    fn move_snapshots_aside(
        &self,
        source: &Path,
        quarantined_doc: &Path,
    ) -> Result<(), Error> {
        let Some(dir) = quarantined_doc.parent() else {
            return Ok(());
        };
        for (snapshot_path, name) in self.store.snapshots().list_for(source)? {
            let dest = dir.join(name.render());
            fsio::move_file(&snapshot_path, &dest).map_err(|source| {
                crate::store::StoreError::Io {
                    path: snapshot_path.display().to_string(),
                    source,
                }
            })?;
        }
        Ok(())
    }
}

fn now_utc() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

/// Convenience: summary status plus failure count decide the process exit.
pub fn batch_error(result: &MigrationResult) -> Option<Error> {
    if result.summary.failed > 0 && result.summary.status == outcome::STATUS_COMPLETED {
        Some(Error::BatchFailed {
            failed: result.summary.failed,
            processed: result.summary.processed,
        })
    } else {
        None
    }
}
