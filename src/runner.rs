//! Plan execution.
//!
//! The runner walks a plan in order and turns every action into a
//! per-item success or failure; a single document never aborts the batch.
//! Only infrastructure problems (a malformed submission) surface as
//! errors from the whole run.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use thiserror::Error;

use crate::core::{DocumentBundle, Meta, SchemaVersion, Snapshot};
use crate::merge;
use crate::outcome::{
    BundleLoad, DataMigrationResult, ItemFailure, ItemSuccess, MigrationResult, QuarantineReason,
    QuarantineRecord,
};
use crate::plan::{ActionKind, NO_PATH_DETAIL, Plan, PlanAction, PlanTarget};
use crate::registry::MigrationRegistry;
use crate::snapshot::content_hash;
use crate::wire;

/// Malformed plan submission. Per-item failures never appear here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    #[error("plan names identifier `{identifier}` more than once")]
    DuplicateIdentifier { identifier: String },

    #[error("no bundle was loaded for planned identifier `{identifier}`")]
    MissingBundle { identifier: String },
}

pub struct Runner<'a> {
    registry: &'a MigrationRegistry,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a MigrationRegistry) -> Self {
        Runner { registry }
    }

    /// Execute `plan` against the loaded bundles.
    pub fn run(
        &self,
        plan: &Plan,
        loads: Vec<BundleLoad>,
    ) -> Result<MigrationResult, RunnerError> {
        let started = Instant::now();

        let mut seen = BTreeSet::new();
        for action in &plan.actions {
            if !seen.insert(action.identifier.as_str()) {
                return Err(RunnerError::DuplicateIdentifier {
                    identifier: action.identifier.clone(),
                });
            }
        }

        let mut by_id: BTreeMap<String, BundleLoad> = loads
            .into_iter()
            .map(|load| (load.identifier().to_string(), load))
            .collect();

        let mut successes: Vec<ItemSuccess> = Vec::new();
        let mut failures: Vec<ItemFailure> = Vec::new();
        let mut skipped = 0usize;

        for action in &plan.actions {
            let Some(load) = by_id.remove(&action.identifier) else {
                return Err(RunnerError::MissingBundle {
                    identifier: action.identifier.clone(),
                });
            };
            match load {
                BundleLoad::Failed(failure) => {
                    tracing::debug!(
                        "runner: `{}` failed at load: {}",
                        failure.identifier,
                        failure.record.details
                    );
                    failures.push(failure);
                }
                BundleLoad::Loaded(bundle) => {
                    match self.execute(action, &bundle, &plan.header.target) {
                        Ok(outcome) => {
                            if action.kind == ActionKind::Skip {
                                skipped += 1;
                            }
                            successes.push(ItemSuccess {
                                identifier: action.identifier.clone(),
                                outcome,
                            });
                        }
                        Err(failure) => failures.push(failure),
                    }
                }
            }
        }

        Ok(MigrationResult::assemble(
            successes,
            failures,
            skipped,
            started.elapsed().as_millis() as u64,
        ))
    }

    fn execute(
        &self,
        action: &PlanAction,
        bundle: &DocumentBundle,
        target: &PlanTarget,
    ) -> Result<DataMigrationResult, ItemFailure> {
        match action.kind {
            ActionKind::Skip => Ok(DataMigrationResult {
                data: bundle.current.data.clone(),
                new_meta: bundle.current.meta.clone(),
                snapshots_to_persist: Vec::new(),
                snapshots_to_delete: Vec::new(),
            }),
            ActionKind::StandardUpgrade => self.upgrade(bundle, target),
            ActionKind::StandardDowngrade => self.downgrade(bundle, target),
            ActionKind::ThreeWayMerge => self.merge(bundle, target),
            ActionKind::Quarantine => {
                let reason = if action.details.starts_with(NO_PATH_DETAIL) {
                    QuarantineReason::NoMigrationPath
                } else {
                    QuarantineReason::PlannedQuarantine
                };
                Err(self.fail(bundle, reason, action.details.clone()))
            }
        }
    }

    fn upgrade(
        &self,
        bundle: &DocumentBundle,
        target: &PlanTarget,
    ) -> Result<DataMigrationResult, ItemFailure> {
        let target_version = self.resolve_upgrade_target(bundle, target)?;
        let data = self.apply_chain(bundle, bundle.version(), &target_version)?;
        Ok(DataMigrationResult {
            data,
            new_meta: Meta::new(bundle.doc_type(), target_version),
            snapshots_to_persist: vec![Snapshot::new(
                bundle.current.data.clone(),
                bundle.current.meta.clone(),
            )],
            snapshots_to_delete: Vec::new(),
        })
    }

    fn downgrade(
        &self,
        bundle: &DocumentBundle,
        target: &PlanTarget,
    ) -> Result<DataMigrationResult, ItemFailure> {
        let PlanTarget::Version(target_version) = target else {
            return Err(self.fail(
                bundle,
                QuarantineReason::ExecutionFailure,
                "downgrade requires an explicit target version".to_string(),
            ));
        };

        // The registered chain runs forward target -> current; downgrading
        // walks it backwards through each step's reverse.
        let doc_type = bundle.doc_type();
        let chain = self
            .registry
            .shape_for(doc_type, target_version)
            .and_then(|to| {
                let from = self.registry.shape_for(doc_type, bundle.version())?;
                self.registry.find_path(to, from)
            })
            .map_err(|err| {
                self.fail(bundle, QuarantineReason::NoMigrationPath, err.to_string())
            })?;

        let mut data = bundle.current.data.clone();
        for step_id in chain.iter().rev() {
            data = self.registry.step(*step_id).reverse(data).map_err(|err| {
                self.fail(bundle, QuarantineReason::ExecutionFailure, err.to_string())
            })?;
        }

        Ok(DataMigrationResult {
            data,
            new_meta: Meta::new(doc_type, target_version.clone()),
            snapshots_to_persist: vec![Snapshot::new(
                bundle.current.data.clone(),
                bundle.current.meta.clone(),
            )],
            snapshots_to_delete: Vec::new(),
        })
    }

    fn merge(
        &self,
        bundle: &DocumentBundle,
        target: &PlanTarget,
    ) -> Result<DataMigrationResult, ItemFailure> {
        let target_version = self.resolve_upgrade_target(bundle, target)?;
        let (Some(base), Some(theirs)) = (bundle.oldest_snapshot(), bundle.newest_snapshot())
        else {
            return Err(self.fail(
                bundle,
                QuarantineReason::ExecutionFailure,
                "merge planned but no rollback history is present".to_string(),
            ));
        };

        let data = merge::merge(self.registry, base, &bundle.current, theirs, &target_version)
            .map_err(|err| {
                let reason = match &err {
                    merge::MergeError::Registry(_) => QuarantineReason::NoMigrationPath,
                    _ => QuarantineReason::ExecutionFailure,
                };
                self.fail(bundle, reason, err.to_string())
            })?;

        let mut snapshots_to_delete = vec![base.meta.clone()];
        if theirs.meta != base.meta {
            snapshots_to_delete.push(theirs.meta.clone());
        }

        Ok(DataMigrationResult {
            data,
            new_meta: Meta::new(bundle.doc_type(), target_version),
            snapshots_to_persist: vec![Snapshot::new(
                bundle.current.data.clone(),
                bundle.current.meta.clone(),
            )],
            snapshots_to_delete,
        })
    }

    fn resolve_upgrade_target(
        &self,
        bundle: &DocumentBundle,
        target: &PlanTarget,
    ) -> Result<SchemaVersion, ItemFailure> {
        match target {
            PlanTarget::Version(version) => Ok(version.clone()),
            PlanTarget::Latest => self
                .registry
                .latest_version(bundle.doc_type())
                .cloned()
                .ok_or_else(|| {
                    self.fail(
                        bundle,
                        QuarantineReason::NoMigrationPath,
                        format!(
                            "{NO_PATH_DETAIL}: doc type `{}` has no registered versions",
                            bundle.doc_type()
                        ),
                    )
                }),
        }
    }

    fn apply_chain(
        &self,
        bundle: &DocumentBundle,
        from: &SchemaVersion,
        to: &SchemaVersion,
    ) -> Result<serde_json::Value, ItemFailure> {
        let doc_type = bundle.doc_type();
        let chain = self
            .registry
            .shape_for(doc_type, from)
            .and_then(|from| {
                let to = self.registry.shape_for(doc_type, to)?;
                self.registry.find_path(from, to)
            })
            .map_err(|err| {
                self.fail(bundle, QuarantineReason::NoMigrationPath, err.to_string())
            })?;

        let mut data = bundle.current.data.clone();
        for step_id in chain {
            data = self.registry.step(step_id).apply(data).map_err(|err| {
                self.fail(bundle, QuarantineReason::ExecutionFailure, err.to_string())
            })?;
        }
        Ok(data)
    }

    fn fail(
        &self,
        bundle: &DocumentBundle,
        reason: QuarantineReason,
        details: String,
    ) -> ItemFailure {
        let hash = wire::encode(&bundle.current.data, &bundle.current.meta)
            .map(|bytes| content_hash(&bytes))
            .unwrap_or_default();
        ItemFailure {
            identifier: bundle.current.identifier.clone(),
            original_data: bundle.current.data.clone(),
            original_meta: bundle.current.meta.clone(),
            record: QuarantineRecord::new(
                bundle.current.identifier.clone(),
                reason,
                details,
                hash,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VersionedDocument;
    use crate::plan::{PlanHeader, plan_upgrade};
    use crate::registry::{FnStep, RegistryBuilder, Shape, StepError};
    use serde_json::json;

    fn v(raw: &str) -> SchemaVersion {
        SchemaVersion::parse(raw).unwrap()
    }

    fn registry() -> MigrationRegistry {
        RegistryBuilder::new()
            .doc_type(
                "PkgConf",
                vec![
                    Shape::new("PkgConf", v("1.0"), Vec::new()),
                    Shape::new("PkgConf", v("2.0"), Vec::new()),
                ],
            )
            .step(
                "PkgConf",
                "1.0",
                "2.0",
                FnStep::new(
                    |mut data| {
                        let obj = data
                            .as_object_mut()
                            .ok_or_else(|| StepError::new("not an object"))?;
                        if let Some(timeout) = obj.shift_remove("timeout") {
                            obj.insert("execution_timeout".into(), timeout);
                        }
                        Ok(data)
                    },
                    |mut data| {
                        let obj = data
                            .as_object_mut()
                            .ok_or_else(|| StepError::new("not an object"))?;
                        if let Some(timeout) = obj.shift_remove("execution_timeout") {
                            obj.insert("timeout".into(), timeout);
                        }
                        Ok(data)
                    },
                ),
            )
            .build()
            .unwrap()
    }

    fn load(identifier: &str, version: &str, data: serde_json::Value) -> BundleLoad {
        BundleLoad::Loaded(
            DocumentBundle::new(
                VersionedDocument {
                    identifier: identifier.into(),
                    data,
                    meta: Meta::new("PkgConf", v(version)),
                },
                vec![],
            )
            .unwrap(),
        )
    }

    #[test]
    fn skip_round_trips_data_with_empty_deltas() {
        let registry = registry();
        let loads = vec![load("a.json", "2.0", json!({"execution_timeout": 9}))];
        let plan = plan_upgrade(&registry, &loads, "t");
        let result = Runner::new(&registry).run(&plan, loads).unwrap();

        assert_eq!(result.summary.skipped, 1);
        assert_eq!(result.summary.succeeded, 1);
        let outcome = &result.successes[0].outcome;
        assert_eq!(outcome.data, json!({"execution_timeout": 9}));
        assert_eq!(outcome.new_meta, Meta::new("PkgConf", v("2.0")));
        assert!(outcome.snapshots_to_persist.is_empty());
        assert!(outcome.snapshots_to_delete.is_empty());
    }

    #[test]
    fn upgrade_records_pre_upgrade_snapshot() {
        let registry = registry();
        let loads = vec![load("a.json", "1.0", json!({"timeout": 30}))];
        let plan = plan_upgrade(&registry, &loads, "t");
        let result = Runner::new(&registry).run(&plan, loads).unwrap();

        let outcome = &result.successes[0].outcome;
        assert_eq!(outcome.data, json!({"execution_timeout": 30}));
        assert_eq!(outcome.new_meta.version, v("2.0"));
        assert_eq!(outcome.snapshots_to_persist.len(), 1);
        assert_eq!(outcome.snapshots_to_persist[0].meta.version, v("1.0"));
        assert_eq!(outcome.snapshots_to_persist[0].data, json!({"timeout": 30}));
    }

    #[test]
    fn step_failure_becomes_execution_failure() {
        let registry = registry();
        // Non-object data makes the step refuse.
        let loads = vec![BundleLoad::Loaded(
            DocumentBundle::new(
                VersionedDocument {
                    identifier: "bad.json".into(),
                    data: json!("not an object"),
                    meta: Meta::new("PkgConf", v("1.0")),
                },
                vec![],
            )
            .unwrap(),
        )];
        let plan = plan_upgrade(&registry, &loads, "t");
        let result = Runner::new(&registry).run(&plan, loads).unwrap();

        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.summary.succeeded, 0);
        assert_eq!(
            result.failures[0].record.reason,
            QuarantineReason::ExecutionFailure
        );
    }

    #[test]
    fn quarantine_action_materializes_planner_details() {
        let registry = registry();
        let loads = vec![load("new.json", "2.5", json!({}))];
        let plan = plan_upgrade(&registry, &loads, "t");
        assert_eq!(plan.actions[0].kind, ActionKind::Quarantine);
        let result = Runner::new(&registry).run(&plan, loads).unwrap();

        let failure = &result.failures[0];
        assert_eq!(failure.record.reason, QuarantineReason::PlannedQuarantine);
        assert!(failure.record.details.contains("newer than target"));
    }

    #[test]
    fn duplicate_identifiers_are_rejected_at_submission() {
        let registry = registry();
        let loads = vec![load("a.json", "1.0", json!({"timeout": 1}))];
        let mut plan = plan_upgrade(&registry, &loads, "t");
        plan.actions.push(plan.actions[0].clone());

        assert!(matches!(
            Runner::new(&registry).run(&plan, loads),
            Err(RunnerError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn merge_action_deletes_consumed_history() {
        let registry = registry();
        let bundle = DocumentBundle::new(
            VersionedDocument {
                identifier: "a.json".into(),
                data: json!({"timeout": 45}),
                meta: Meta::new("PkgConf", v("1.0")),
            },
            vec![
                Snapshot::new(json!({"timeout": 30}), Meta::new("PkgConf", v("1.0"))),
                Snapshot::new(
                    json!({"execution_timeout": 100}),
                    Meta::new("PkgConf", v("2.0")),
                ),
            ],
        )
        .unwrap();
        let loads = vec![BundleLoad::Loaded(bundle)];
        let plan = plan_upgrade(&registry, &loads, "t");
        assert_eq!(plan.actions[0].kind, ActionKind::ThreeWayMerge);

        let result = Runner::new(&registry).run(&plan, loads).unwrap();
        let outcome = &result.successes[0].outcome;
        // Theirs wins on the conflicting timeout.
        assert_eq!(outcome.data["execution_timeout"], json!(100));
        assert_eq!(outcome.snapshots_to_persist.len(), 1);
        assert_eq!(outcome.snapshots_to_delete.len(), 2);
    }

    #[test]
    fn load_failure_surfaces_with_its_own_reason() {
        let registry = registry();
        let loads = vec![BundleLoad::Failed(ItemFailure {
            identifier: "broken.json".into(),
            original_data: json!(null),
            original_meta: Meta::new("PkgConf", v("1.0")),
            record: QuarantineRecord::new(
                "broken.json",
                QuarantineReason::SnapshotIntegrityFailure,
                "snapshot hash mismatch",
                "00",
            ),
        })];
        let plan = plan_upgrade(&registry, &loads, "t");
        let result = Runner::new(&registry).run(&plan, loads).unwrap();

        assert_eq!(result.summary.failed, 1);
        assert_eq!(
            result.failures[0].record.reason,
            QuarantineReason::SnapshotIntegrityFailure
        );
    }

    #[test]
    fn downgrade_walks_reverse_chain() {
        let registry = registry();
        let loads = vec![load("a.json", "2.0", json!({"execution_timeout": 9}))];
        let plan = Plan {
            header: PlanHeader {
                target: PlanTarget::Version(v("1.0")),
                generated_at_utc: "t".into(),
            },
            actions: vec![PlanAction {
                identifier: "a.json".into(),
                kind: ActionKind::StandardDowngrade,
                details: "downgrade 2.0 -> 1.0".into(),
            }],
        };
        let result = Runner::new(&registry).run(&plan, loads).unwrap();
        let outcome = &result.successes[0].outcome;
        assert_eq!(outcome.data, json!({"timeout": 9}));
        assert_eq!(outcome.new_meta.version, v("1.0"));
        assert_eq!(outcome.snapshots_to_persist[0].meta.version, v("2.0"));
    }
}
