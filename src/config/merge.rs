use std::path::PathBuf;

use super::schema::{Config, ConfigLayer};

pub fn merge_layers(user: Option<ConfigLayer>, workspace: Option<ConfigLayer>) -> Config {
    let mut config = Config::default();
    if let Some(layer) = user {
        layer.apply_to(&mut config);
    }
    if let Some(layer) = workspace {
        layer.apply_to(&mut config);
    }
    config
}

pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(raw) = std::env::var("MOLT_QUARANTINE_DIR") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.quarantine_dir = Some(PathBuf::from(trimmed));
        }
    }

    if let Ok(raw) = std::env::var("MOLT_TRANSACTIONS_DIR") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.transactions_dir = Some(PathBuf::from(trimmed));
        }
    }

    if let Ok(raw) = std::env::var("MOLT_LOG") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.logging.filter = Some(trimmed.to_string());
        }
    }
}
