pub(crate) mod gc;
pub(crate) mod migrate;
pub(crate) mod plan_rollback;
pub(crate) mod plan_upgrade;
pub(crate) mod resume;
pub(crate) mod retry;

use std::path::{Path, PathBuf};

use crate::Result;
use crate::manifest::Manifest;

/// Load the manifest and expand it into document paths.
pub(crate) fn discover_documents(manifest_path: &Path) -> Result<Vec<PathBuf>> {
    let manifest = Manifest::load(manifest_path)?;
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(manifest.discover(base)?)
}
