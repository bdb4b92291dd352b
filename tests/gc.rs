//! Snapshot garbage collection over a document set.

mod fixtures;

use serde_json::json;
use tempfile::TempDir;

use fixtures::{migrator, pkgconf_v1, snapshot_files, write_doc};

#[test]
fn gc_retires_only_snapshots_at_or_below_the_live_version() {
    let tmp = TempDir::new().unwrap();
    let migrator = migrator();
    let path = write_doc(tmp.path(), "config.json", &pkgconf_v1(30, &["auth"]));

    // Upgrade then roll back: one obsolete v1.0 snapshot and one v2.0
    // snapshot guarding the rollback history.
    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    migrator.execute(&plan, None).unwrap();
    let target = "1.0".parse().unwrap();
    let plan = migrator.plan_rollback(&[path.clone()], &target).unwrap();
    migrator.execute(&plan, None).unwrap();
    assert_eq!(snapshot_files(&path).len(), 2);

    let summary = migrator.gc(&[path.clone()]).unwrap();
    assert_eq!(summary.deleted(), 1);
    assert_eq!(summary.kept(), 1);
    assert_eq!(summary.unverifiable(), 0);

    // The critical pre-rollback snapshot survives.
    let remaining = snapshot_files(&path);
    assert_eq!(remaining.len(), 1);
    let snapshot = fixtures::read_doc(&remaining[0]);
    assert_eq!(snapshot["_meta"]["SchemaVersion"], "2.0");

    // And the re-upgrade merge still works afterwards.
    let upgrade = migrator.plan_upgrade(&[path.clone()]).unwrap();
    assert_eq!(upgrade.actions[0].kind, molt::ActionKind::ThreeWayMerge);
}

#[test]
fn gc_reports_tampered_snapshots_without_deleting_them() {
    let tmp = TempDir::new().unwrap();
    let migrator = migrator();
    let path = write_doc(tmp.path(), "config.json", &pkgconf_v1(30, &["auth"]));

    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    migrator.execute(&plan, None).unwrap();
    let target = "1.0".parse().unwrap();
    let plan = migrator.plan_rollback(&[path.clone()], &target).unwrap();
    migrator.execute(&plan, None).unwrap();

    // Corrupt the obsolete v1.0 snapshot; GC must keep it and say so.
    let snapshots = snapshot_files(&path);
    let v1 = snapshots
        .iter()
        .find(|p| p.to_str().unwrap().contains(".v1.0."))
        .unwrap();
    std::fs::write(v1, json!({"tampered": true}).to_string()).unwrap();

    let summary = migrator.gc(&[path.clone()]).unwrap();
    assert_eq!(summary.deleted(), 0);
    assert_eq!(summary.unverifiable(), 1);
    assert!(v1.exists());
}
