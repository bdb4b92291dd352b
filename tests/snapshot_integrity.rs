//! Tamper detection on persisted snapshots.

mod fixtures;

use std::fs;

use tempfile::TempDir;

use fixtures::{migrator, pkgconf_v1, snapshot_files, write_doc};
use molt::QuarantineReason;

#[test]
fn tampered_snapshot_fails_rollback_with_integrity_reason() {
    let tmp = TempDir::new().unwrap();
    let migrator = migrator();
    let path = write_doc(tmp.path(), "config.json", &pkgconf_v1(30, &["auth"]));

    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    migrator.execute(&plan, None).unwrap();

    // Flip one byte of the persisted snapshot.
    let snapshot = &snapshot_files(&path)[0];
    let mut bytes = fs::read(snapshot).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;
    fs::write(snapshot, bytes).unwrap();

    let target = "1.0".parse().unwrap();
    let plan = migrator.plan_rollback(&[path.clone()], &target).unwrap();
    let result = migrator.execute(&plan, None).unwrap();

    assert_eq!(result.summary.succeeded, 0);
    assert_eq!(result.summary.failed, 1);
    assert_eq!(
        result.failures[0].record.reason,
        QuarantineReason::SnapshotIntegrityFailure
    );
    // The document itself was not modified.
    let doc = fixtures::read_doc(&path);
    assert_eq!(doc["_meta"]["SchemaVersion"], "2.0");
}

#[test]
fn renamed_snapshot_is_treated_as_malformed_integrity_failure() {
    let tmp = TempDir::new().unwrap();
    let migrator = migrator();
    let path = write_doc(tmp.path(), "config.json", &pkgconf_v1(30, &["auth"]));

    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    migrator.execute(&plan, None).unwrap();

    // Rename the snapshot so its embedded hash no longer matches.
    let snapshot = snapshot_files(&path)[0].clone();
    let renamed = snapshot
        .to_str()
        .unwrap()
        .replace(".v1.0.", ".v1.5.");
    fs::rename(&snapshot, &renamed).unwrap();

    let target = "1.0".parse().unwrap();
    let plan = migrator.plan_rollback(&[path.clone()], &target).unwrap();
    let result = migrator.execute(&plan, None).unwrap();
    assert_eq!(result.summary.failed, 1);
    assert_eq!(
        result.failures[0].record.reason,
        QuarantineReason::SnapshotIntegrityFailure
    );
}
