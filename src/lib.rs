#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
mod fsio;
pub mod manifest;
pub mod merge;
pub mod migrator;
pub mod outcome;
pub mod plan;
pub mod quarantine;
pub mod registry;
pub mod runner;
pub mod schemas;
pub mod snapshot;
pub mod store;
pub mod telemetry;
pub mod txn;
pub mod validate;
pub mod wire;

pub use error::{Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::core::{
    DocumentBundle, InvalidVersion, Meta, SchemaVersion, Snapshot, VersionedDocument,
};
pub use crate::migrator::Migrator;
pub use crate::outcome::{
    BundleLoad, DataMigrationResult, ItemFailure, ItemSuccess, MigrationResult, MigrationSummary,
    QuarantineReason, QuarantineRecord,
};
pub use crate::plan::{ActionKind, Plan, PlanAction, PlanHeader, PlanTarget};
pub use crate::quarantine::QuarantineStore;
pub use crate::registry::{
    ConfigurationError, FieldDef, FieldKind, FnStep, MergeOutcome, MigrationRegistry,
    MigrationStep, RegistryBuilder, RegistryError, Shape, ShapeId, StepError, StepId,
};
pub use crate::snapshot::SnapshotStore;
pub use crate::store::DocumentStore;
