use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use super::merge::{apply_env_overrides, merge_layers};
use super::schema::{Config, ConfigLayer};

const USER_CONFIG_FILE: &str = "config.json";
const WORKSPACE_CONFIG_FILE: &str = "molt.config.json";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Load config: user layer, then workspace layer, then env overrides.
pub fn load() -> Result<Config, ConfigError> {
    let user = read_layer(user_config_path())?;
    let workspace = read_layer(Some(PathBuf::from(WORKSPACE_CONFIG_FILE)))?;
    let mut config = merge_layers(user, workspace);
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Like [`load`], falling back to defaults (plus env overrides) when a
/// config file is broken.
pub fn load_or_default() -> Config {
    load().unwrap_or_else(|err| {
        tracing::warn!("config load failed, using defaults: {err}");
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        config
    })
}

fn read_layer(path: Option<PathBuf>) -> Result<Option<ConfigLayer>, ConfigError> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let layer = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(layer))
}

fn user_config_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|home| PathBuf::from(home).join(".config"))
        })?;
    Some(base.join("molt").join(USER_CONFIG_FILE))
}
