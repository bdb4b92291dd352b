//! Resumable transactions: crash between backup and commit, then resume.

mod fixtures;

use std::fs;

use tempfile::TempDir;

use fixtures::{migrator, pkgconf_v1, read_doc, write_doc};
use molt::txn::{TransactionManager, TxnError};

#[test]
fn migrate_under_transaction_commits_cleanly() {
    let tmp = TempDir::new().unwrap();
    let txn_dir = tmp.path().join("txns");
    let migrator = migrator();
    let path = write_doc(tmp.path(), "config.json", &pkgconf_v1(30, &["auth"]));

    let plan = migrator.plan_upgrade(&[path.clone()]).unwrap();
    let result = migrator.execute(&plan, Some(&txn_dir)).unwrap();
    assert_eq!(result.summary.succeeded, 1);

    // Journal and backups are gone after commit.
    let leftovers: Vec<_> = fs::read_dir(&txn_dir).unwrap().flatten().collect();
    assert!(leftovers.is_empty());
    assert_eq!(read_doc(&path)["_meta"]["SchemaVersion"], "2.0");
}

#[test]
fn crash_between_backup_and_commit_is_resumable() {
    let tmp = TempDir::new().unwrap();
    let txn_dir = tmp.path().join("txns");
    let migrator = migrator();

    let originals: Vec<_> = ["a.json", "b.json", "c.json"]
        .iter()
        .enumerate()
        .map(|(idx, name)| write_doc(tmp.path(), name, &pkgconf_v1(idx as u64, &["auth"])))
        .collect();
    let pristine: Vec<Vec<u8>> = originals.iter().map(|p| fs::read(p).unwrap()).collect();

    // Back the files up, clobber them, and drop the transaction without
    // committing, exactly what a mid-batch crash leaves behind.
    let manager = TransactionManager::new(&txn_dir).unwrap();
    let mut txn = manager.begin(originals.clone()).unwrap();
    txn.backup().unwrap();
    for path in &originals {
        fs::write(path, "half-migrated garbage").unwrap();
    }
    drop(txn);

    // A new transactional batch refuses while the journal is in progress.
    let begun = manager.begin(originals.clone());
    assert!(matches!(begun, Err(TxnError::IncompleteTransaction { .. })));

    // Resume restores every original bit-exactly and cleans up.
    let result = migrator.resume(&txn_dir).unwrap();
    assert_eq!(result.summary.status, "Rolled Back");
    assert_eq!(result.summary.processed, 0);
    for (path, bytes) in originals.iter().zip(&pristine) {
        assert_eq!(&fs::read(path).unwrap(), bytes);
    }
    let leftovers: Vec<_> = fs::read_dir(&txn_dir).unwrap().flatten().collect();
    assert!(leftovers.is_empty());
}
