//! Content-hash-addressed snapshot store.
//!
//! A snapshot file lives next to its source document and is named
//! `<source_basename>.v<VERSION>.<HASH8>.snapshot.json`, where `HASH8` is
//! the first 8 lowercase hex characters of SHA-256 over the file bytes.
//! New content always yields a new name; a snapshot is never rewritten in
//! place with different content. The short hash is an integrity check
//! only, not a security boundary.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::SchemaVersion;
use crate::error::Transience;
use crate::fsio;

const SNAPSHOT_SUFFIX: &str = ".snapshot.json";
const SHORT_HASH_LEN: usize = 8;

/// Snapshot store errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot name `{name}` does not match the canonical pattern")]
    MalformedName { name: String },

    #[error("snapshot `{name}` failed integrity check: expected hash {expected}, got {actual}")]
    Integrity {
        name: String,
        expected: String,
        actual: String,
    },
}

impl SnapshotError {
    pub fn transience(&self) -> Transience {
        match self {
            SnapshotError::Io(_) => Transience::Unknown,
            SnapshotError::MalformedName { .. } | SnapshotError::Integrity { .. } => {
                Transience::Permanent
            }
        }
    }
}

/// First 8 lowercase hex characters of SHA-256 over `bytes`.
pub fn short_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..SHORT_HASH_LEN / 2])
}

/// Full SHA-256 of `bytes` as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Parsed canonical snapshot file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotName {
    pub source_basename: String,
    pub version: SchemaVersion,
    pub short_hash: String,
}

impl SnapshotName {
    pub fn new(source_basename: &str, version: &SchemaVersion, short_hash: &str) -> Self {
        SnapshotName {
            source_basename: source_basename.to_string(),
            version: version.clone(),
            short_hash: short_hash.to_string(),
        }
    }

    /// Parse a file name against the canonical pattern.
    pub fn parse(file_name: &str) -> Result<Self, SnapshotError> {
        let malformed = || SnapshotError::MalformedName {
            name: file_name.to_string(),
        };

        let stem = file_name.strip_suffix(SNAPSHOT_SUFFIX).ok_or_else(malformed)?;
        let (head, hash) = stem.rsplit_once('.').ok_or_else(malformed)?;
        if hash.len() != SHORT_HASH_LEN
            || !hash.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            return Err(malformed());
        }

        // The version marker is the rightmost `.v` followed by digits and
        // dots only; the source basename may itself contain dots.
        let mut marker = None;
        let mut search_end = head.len();
        while let Some(at) = head[..search_end].rfind(".v") {
            let tail = &head[at + 2..];
            if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
                marker = Some(at);
                break;
            }
            search_end = at;
        }
        let at = marker.ok_or_else(malformed)?;
        let source_basename = &head[..at];
        if source_basename.is_empty() {
            return Err(malformed());
        }
        let version = SchemaVersion::parse(&head[at + 2..]).map_err(|_| malformed())?;

        Ok(SnapshotName {
            source_basename: source_basename.to_string(),
            version,
            short_hash: hash.to_string(),
        })
    }

    pub fn render(&self) -> String {
        format!(
            "{}.v{}.{}{}",
            self.source_basename, self.version, self.short_hash, SNAPSHOT_SUFFIX
        )
    }
}

/// Outcome of one garbage-collection pass over a document's snapshots.
#[derive(Debug, Default)]
pub struct GcReport {
    pub deleted: Vec<PathBuf>,
    pub kept: Vec<PathBuf>,
    /// Snapshots that failed verification; GC never deletes these.
    pub unverifiable: Vec<(PathBuf, String)>,
}

/// Store for snapshot files living next to their source documents.
#[derive(Clone, Copy, Debug, Default)]
pub struct SnapshotStore;

impl SnapshotStore {
    pub fn new() -> Self {
        SnapshotStore
    }

    /// Persist `content` as a snapshot of `source_path` at `version`.
    ///
    /// The write is atomic; re-creating identical content at the same
    /// version lands on the same name and is a no-op overwrite.
    pub fn create(
        &self,
        source_path: &Path,
        content: &[u8],
        version: &SchemaVersion,
    ) -> Result<PathBuf, SnapshotError> {
        let basename = source_basename(source_path)?;
        let name = SnapshotName::new(basename, version, &short_hash(content));
        let dest = source_path.with_file_name(name.render());
        fsio::atomic_write(&dest, content)?;
        Ok(dest)
    }

    /// Read a snapshot and verify its content against the hash embedded in
    /// its name.
    pub fn read_and_verify(&self, snapshot_path: &Path) -> Result<Vec<u8>, SnapshotError> {
        let file_name = file_name_str(snapshot_path)?;
        let name = SnapshotName::parse(file_name)?;
        let bytes = fs::read(snapshot_path)?;
        let actual = short_hash(&bytes);
        if actual != name.short_hash {
            return Err(SnapshotError::Integrity {
                name: file_name.to_string(),
                expected: name.short_hash,
                actual,
            });
        }
        Ok(bytes)
    }

    /// All well-formed snapshot files for a source document, oldest
    /// version first.
    pub fn list_for(
        &self,
        source_path: &Path,
    ) -> Result<Vec<(PathBuf, SnapshotName)>, SnapshotError> {
        let basename = source_basename(source_path)?;
        let dir = source_path.parent().unwrap_or_else(|| Path::new("."));
        let mut found = Vec::new();
        if !dir.exists() {
            return Ok(found);
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(name) = SnapshotName::parse(&file_name) else {
                continue;
            };
            if name.source_basename == basename {
                found.push((entry.path(), name));
            }
        }
        found.sort_by(|(_, a), (_, b)| a.version.cmp(&b.version));
        Ok(found)
    }

    /// Remove obsolete snapshots of one document.
    ///
    /// A snapshot is obsolete iff its version is `<=` the document's live
    /// version; anything strictly newer is pre-rollback history and is
    /// always preserved. Snapshots that fail verification are reported
    /// and left in place.
    pub fn gc(
        &self,
        source_path: &Path,
        live_version: &SchemaVersion,
    ) -> Result<GcReport, SnapshotError> {
        let mut report = GcReport::default();
        for (path, name) in self.list_for(source_path)? {
            if name.version > *live_version {
                report.kept.push(path);
                continue;
            }
            match self.read_and_verify(&path) {
                Ok(_) => {
                    fs::remove_file(&path)?;
                    report.deleted.push(path);
                }
                Err(err) => {
                    tracing::warn!("gc: keeping unverifiable snapshot {}: {err}", path.display());
                    report.unverifiable.push((path, err.to_string()));
                }
            }
        }
        Ok(report)
    }
}

fn source_basename(source_path: &Path) -> Result<&str, SnapshotError> {
    file_name_str(source_path)
}

fn file_name_str(path: &Path) -> Result<&str, SnapshotError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SnapshotError::MalformedName {
            name: path.display().to_string(),
        })
}
