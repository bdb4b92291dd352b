//! End-to-end batch scenarios over the built-in PkgConf schemas.

mod fixtures;

use serde_json::json;
use tempfile::TempDir;

use fixtures::{migrator, pkgconf_v1, read_doc, snapshot_files, write_doc};
use molt::{ActionKind, QuarantineReason};

#[test]
fn standard_upgrade_reshapes_document_and_snapshots_original() {
    let tmp = TempDir::new().unwrap();
    let migrator = migrator();
    let path = write_doc(tmp.path(), "config.json", &pkgconf_v1(30, &["auth"]));

    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    assert_eq!(plan.actions.len(), 1);
    assert_eq!(plan.actions[0].kind, ActionKind::StandardUpgrade);

    let result = migrator.execute(&plan, None).unwrap();
    assert_eq!(result.summary.succeeded, 1);
    assert_eq!(result.summary.failed, 0);

    let upgraded = read_doc(&path);
    assert_eq!(
        upgraded,
        json!({
            "_meta": {"DocType": "PkgConf", "SchemaVersion": "2.0"},
            "execution_timeout": 30,
            "plugins": {"auth": {"enabled": true}},
            "reporting": {"format": "json"}
        })
    );

    // One snapshot of the v1.0 original.
    let snapshots = snapshot_files(&path);
    assert_eq!(snapshots.len(), 1);
    let snapshot = read_doc(&snapshots[0]);
    assert_eq!(snapshot["_meta"]["SchemaVersion"], "1.0");
    assert_eq!(snapshot["timeout"], 30);
}

#[test]
fn document_at_target_is_skipped_untouched() {
    let tmp = TempDir::new().unwrap();
    let migrator = migrator();
    let path = write_doc(tmp.path(), "config.json", &pkgconf_v1(30, &["auth"]));

    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    migrator.execute(&plan, None).unwrap();
    let after_first = read_doc(&path);

    // Plan again: already at 2.0.
    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    assert_eq!(plan.actions[0].kind, ActionKind::Skip);

    let result = migrator.execute(&plan, None).unwrap();
    assert_eq!(result.summary.skipped, 1);
    assert_eq!(result.summary.succeeded, 1);
    assert_eq!(read_doc(&path), after_first);
    assert_eq!(snapshot_files(&path).len(), 1);
}

#[test]
fn newer_than_target_documents_are_quarantined() {
    let tmp = TempDir::new().unwrap();
    let migrator = migrator();
    let path = write_doc(
        tmp.path(),
        "config.json",
        &json!({
            "_meta": {"DocType": "PkgConf", "SchemaVersion": "2.5"},
            "execution_timeout": 1
        }),
    );

    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    assert_eq!(plan.actions[0].kind, ActionKind::Quarantine);
    assert!(plan.actions[0].details.contains("newer than target"));

    let result = migrator.execute(&plan, None).unwrap();
    assert_eq!(result.summary.failed, 1);
    assert_eq!(
        result.failures[0].record.reason,
        QuarantineReason::PlannedQuarantine
    );
}

#[test]
fn rollback_restores_shape_and_keeps_pre_rollback_snapshot() {
    let tmp = TempDir::new().unwrap();
    let migrator = migrator();
    let path = write_doc(tmp.path(), "config.json", &pkgconf_v1(30, &["auth"]));

    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    migrator.execute(&plan, None).unwrap();

    let target = "1.0".parse().unwrap();
    let plan = migrator.plan_rollback(&[path.clone()], &target).unwrap();
    assert_eq!(plan.actions[0].kind, ActionKind::StandardDowngrade);
    let result = migrator.execute(&plan, None).unwrap();
    assert_eq!(result.summary.succeeded, 1);

    let rolled_back = read_doc(&path);
    assert_eq!(rolled_back["_meta"]["SchemaVersion"], "1.0");
    assert_eq!(rolled_back["timeout"], 30);
    assert_eq!(rolled_back["plugins"], json!(["auth"]));

    // v1.0 snapshot from the upgrade plus v2.0 snapshot from the rollback.
    assert_eq!(snapshot_files(&path).len(), 2);
}

#[test]
fn failures_move_documents_into_quarantine_with_reports() {
    let tmp = TempDir::new().unwrap();
    let qdir = tmp.path().join("quarantine");
    let migrator = fixtures::migrator_with_quarantine(&qdir);

    // Plugin entries must be strings; the step refuses numbers.
    let path = write_doc(
        tmp.path(),
        "config.json",
        &json!({
            "_meta": {"DocType": "PkgConf", "SchemaVersion": "1.0"},
            "timeout": 30,
            "plugins": [1]
        }),
    );

    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    let result = migrator.execute(&plan, None).unwrap();
    assert_eq!(result.summary.failed, 1);
    assert_eq!(
        result.failures[0].record.reason,
        QuarantineReason::ExecutionFailure
    );

    // The source moved aside and a report landed next to it.
    assert!(!path.exists());
    let mut entries: Vec<String> = std::fs::read_dir(&qdir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].starts_with("config."));
    assert!(entries[1].ends_with(".quarantine.json"));
}
