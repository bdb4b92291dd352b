//! Pure, read-only classification of bundles into plan actions.
//!
//! The planner never mutates its inputs and never performs IO; the
//! timestamp is injected so planning is reproducible. Action order equals
//! input order.

use crate::core::DocumentBundle;
use crate::outcome::BundleLoad;
use crate::registry::MigrationRegistry;

use super::{ActionKind, Plan, PlanAction, PlanHeader, PlanTarget};

/// Detail prefix marking a quarantine that came from a registry path
/// lookup; the runner maps it to the `NoMigrationPath` reason.
pub(crate) const NO_PATH_DETAIL: &str = "no path";

/// Plan an upgrade of every bundle to the latest registered version of
/// its doc type.
pub fn plan_upgrade(
    registry: &MigrationRegistry,
    loads: &[BundleLoad],
    generated_at_utc: impl Into<String>,
) -> Plan {
    plan_with(registry, loads, generated_at_utc.into(), PlanTarget::Latest)
}

/// Plan a downgrade of every bundle to one explicit target version.
pub fn plan_downgrade(
    registry: &MigrationRegistry,
    loads: &[BundleLoad],
    target: crate::core::SchemaVersion,
    generated_at_utc: impl Into<String>,
) -> Plan {
    plan_with(
        registry,
        loads,
        generated_at_utc.into(),
        PlanTarget::Version(target),
    )
}

fn plan_with(
    registry: &MigrationRegistry,
    loads: &[BundleLoad],
    generated_at_utc: String,
    target: PlanTarget,
) -> Plan {
    let actions = loads
        .iter()
        .map(|load| match load {
            BundleLoad::Loaded(bundle) => {
                let (kind, details) = match &target {
                    PlanTarget::Latest => classify_upgrade(registry, bundle),
                    PlanTarget::Version(version) => classify_downgrade(registry, bundle, version),
                };
                PlanAction {
                    identifier: bundle.current.identifier.clone(),
                    kind,
                    details,
                }
            }
            BundleLoad::Failed(failure) => PlanAction {
                identifier: failure.identifier.clone(),
                kind: ActionKind::Quarantine,
                details: failure.record.details.clone(),
            },
        })
        .collect();

    Plan {
        header: PlanHeader {
            target,
            generated_at_utc,
        },
        actions,
    }
}

fn classify_upgrade(
    registry: &MigrationRegistry,
    bundle: &DocumentBundle,
) -> (ActionKind, String) {
    let doc_type = bundle.doc_type();
    let current = bundle.version();

    let Some(target) = registry.latest_version(doc_type) else {
        return (
            ActionKind::Quarantine,
            format!("{NO_PATH_DETAIL}: doc type `{doc_type}` has no registered versions"),
        );
    };

    if current == target {
        return (ActionKind::Skip, format!("already at {target}"));
    }
    if current > target {
        return (
            ActionKind::Quarantine,
            format!("newer than target {target} (document is at {current})"),
        );
    }

    let from = match registry.shape_for(doc_type, current) {
        Ok(shape) => shape,
        Err(err) => return (ActionKind::Quarantine, format!("{NO_PATH_DETAIL}: {err}")),
    };
    let to = match registry.shape_for(doc_type, target) {
        Ok(shape) => shape,
        Err(err) => return (ActionKind::Quarantine, format!("{NO_PATH_DETAIL}: {err}")),
    };
    if let Err(err) = registry.find_path(from, to) {
        return (ActionKind::Quarantine, format!("{NO_PATH_DETAIL}: {err}"));
    }

    if bundle.has_newer_snapshot() {
        (
            ActionKind::ThreeWayMerge,
            format!("re-upgrade {current} -> {target} merging rollback history"),
        )
    } else {
        (
            ActionKind::StandardUpgrade,
            format!("upgrade {current} -> {target}"),
        )
    }
}

fn classify_downgrade(
    registry: &MigrationRegistry,
    bundle: &DocumentBundle,
    target: &crate::core::SchemaVersion,
) -> (ActionKind, String) {
    let doc_type = bundle.doc_type();
    let current = bundle.version();

    if current == target {
        return (ActionKind::Skip, format!("already at {target}"));
    }
    if current < target {
        return (
            ActionKind::Quarantine,
            format!("older than target {target} (document is at {current})"),
        );
    }

    // A downgrade runs the forward chain target -> current in reverse, so
    // the path that must exist is the forward one.
    let to = match registry.shape_for(doc_type, target) {
        Ok(shape) => shape,
        Err(err) => return (ActionKind::Quarantine, format!("{NO_PATH_DETAIL}: {err}")),
    };
    let from = match registry.shape_for(doc_type, current) {
        Ok(shape) => shape,
        Err(err) => return (ActionKind::Quarantine, format!("{NO_PATH_DETAIL}: {err}")),
    };
    if let Err(err) = registry.find_path(to, from) {
        return (ActionKind::Quarantine, format!("{NO_PATH_DETAIL}: {err}"));
    }

    (
        ActionKind::StandardDowngrade,
        format!("downgrade {current} -> {target}"),
    )
}
