//! Discovery manifest.
//!
//! The manifest names the document set a batch operates on. The kernel
//! consumes only the resulting list of paths; discovery rules are carried
//! through for external tooling and deliberately not interpreted here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("manifest include path `{path}` does not exist")]
    MissingPath { path: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRule {
    pub rule_name: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub include_paths: Vec<PathBuf>,
    #[serde(default)]
    pub discovery_rules: Vec<DiscoveryRule>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Expand include paths into concrete document paths.
    ///
    /// Relative paths resolve against `base_dir`. A directory contributes
    /// its immediate `*.json` files, excluding snapshot files and
    /// quarantine reports. Output order is deterministic.
    pub fn discover(&self, base_dir: &Path) -> Result<Vec<PathBuf>, ManifestError> {
        if !self.discovery_rules.is_empty() {
            tracing::debug!(
                "manifest: {} discovery rules present; rules are resolved by external tooling",
                self.discovery_rules.len()
            );
        }

        let mut documents = Vec::new();
        for include in &self.include_paths {
            let resolved = if include.is_absolute() {
                include.clone()
            } else {
                base_dir.join(include)
            };

            if resolved.is_file() {
                documents.push(resolved);
            } else if resolved.is_dir() {
                let mut in_dir = Vec::new();
                for entry in fs::read_dir(&resolved)? {
                    let path = entry?.path();
                    if is_document(&path) {
                        in_dir.push(path);
                    }
                }
                in_dir.sort();
                documents.append(&mut in_dir);
            } else {
                return Err(ManifestError::MissingPath {
                    path: resolved.display().to_string(),
                });
            }
        }
        documents.dedup();
        Ok(documents)
    }
}

fn is_document(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".json")
        && !name.ends_with(".snapshot.json")
        && !name.ends_with(".quarantine.json")
        && path.is_file()
}
