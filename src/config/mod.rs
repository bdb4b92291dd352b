//! Layered configuration: user file, workspace file, env overrides.

mod load;
mod merge;
mod schema;

pub use load::{ConfigError, load, load_or_default};
pub use merge::{apply_env_overrides, merge_layers};
pub use schema::{Config, ConfigLayer, LoggingConfig};
