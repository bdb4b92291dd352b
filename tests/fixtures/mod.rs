//! Shared helpers for the scenario tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use molt::quarantine::QuarantineStore;
use molt::{MigrationRegistry, Migrator};

/// The binary's own registry: PkgConf 1.0 -> 2.0.
pub fn registry() -> MigrationRegistry {
    molt::schemas::registry().expect("builtin registry")
}

pub fn migrator() -> Migrator {
    Migrator::new(registry(), QuarantineStore::disabled())
}

pub fn migrator_with_quarantine(dir: &Path) -> Migrator {
    Migrator::new(registry(), QuarantineStore::new(Some(dir.to_path_buf())))
}

/// Write a document file as-is (caller includes `_meta` if wanted).
pub fn write_doc(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    let mut bytes = serde_json::to_vec_pretty(value).expect("encode doc");
    bytes.push(b'\n');
    fs::write(&path, bytes).expect("write doc");
    path
}

/// Read a document file back, `_meta` included.
pub fn read_doc(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).expect("read doc")).expect("parse doc")
}

/// Paths of the snapshot files currently next to `path`.
pub fn snapshot_files(path: &Path) -> Vec<PathBuf> {
    let dir = path.parent().expect("parent dir");
    let basename = path.file_name().expect("file name").to_str().expect("utf8");
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read dir")
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(basename) && n.ends_with(".snapshot.json"))
        })
        .collect();
    found.sort();
    found
}

/// A v1.0 PkgConf document body with its `_meta` tag.
pub fn pkgconf_v1(timeout: u64, plugins: &[&str]) -> Value {
    serde_json::json!({
        "_meta": {"DocType": "PkgConf", "SchemaVersion": "1.0"},
        "timeout": timeout,
        "plugins": plugins,
    })
}
