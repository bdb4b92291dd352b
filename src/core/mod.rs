//! Document model: version tags, trees, snapshots, bundles.

mod document;
mod error;
mod meta;
mod version;

pub use document::{DocumentBundle, Snapshot, VersionedDocument};
pub use error::CoreError;
pub use meta::Meta;
pub use version::{InvalidVersion, SchemaVersion};
