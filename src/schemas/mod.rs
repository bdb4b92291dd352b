//! Built-in document families.
//!
//! The host boundary: every versioned shape and step the shipped binary
//! knows about is enumerated here and handed to the kernel explicitly.

use crate::registry::{ConfigurationError, MigrationRegistry, RegistryBuilder};

pub mod pkgconf;

/// The registry the `molt` binary runs with.
pub fn registry() -> Result<MigrationRegistry, ConfigurationError> {
    pkgconf::register(RegistryBuilder::new()).build()
}
