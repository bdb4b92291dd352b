use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Effective configuration after layering and env overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Directory refused documents are moved into. Quarantine is disabled
    /// when unset.
    pub quarantine_dir: Option<PathBuf>,
    /// Journal/backup directory for resumable batches. Plain
    /// non-transactional execution when unset.
    pub transactions_dir: Option<PathBuf>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Tracing filter directive, e.g. `molt=debug`.
    pub filter: Option<String>,
}

/// One configuration file; unset fields defer to lower layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigLayer {
    pub quarantine_dir: Option<PathBuf>,
    pub transactions_dir: Option<PathBuf>,
    pub logging: Option<LoggingConfig>,
}

impl ConfigLayer {
    pub fn apply_to(&self, target: &mut Config) {
        if self.quarantine_dir.is_some() {
            target.quarantine_dir = self.quarantine_dir.clone();
        }
        if self.transactions_dir.is_some() {
            target.transactions_dir = self.transactions_dir.clone();
        }
        if let Some(logging) = &self.logging {
            target.logging = logging.clone();
        }
    }
}
