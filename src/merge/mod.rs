//! Hybrid three-way merger.
//!
//! Invoked on re-upgrade when rollback history is present. BASE is the
//! oldest snapshot (common ancestor), MINE is the post-rollback edited
//! document, THEIRS is the pre-rollback edited snapshot. All three are
//! lifted to the target shape, claimed properties go through the step's
//! semantic handler, and everything else is merged structurally from the
//! two patch sets.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::{SchemaVersion, Snapshot, VersionedDocument};
use crate::registry::{MergeOutcome, MigrationRegistry, RegistryError, StepError};

mod diff;

pub use diff::{PatchOp, PathSeg, TreePath, apply, diff, render_path};

/// Which side a structural conflict resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The pre-rollback snapshot wins: edits made against the newer schema
    /// reflect intent against the newer feature set.
    TheirsWins,
    /// The post-rollback document wins.
    MineWins,
}

/// The declared default for re-upgrade merges.
pub const CONFLICT_POLICY: ConflictPolicy = ConflictPolicy::TheirsWins;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MergeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("{stage} document is not an object")]
    NotAnObject { stage: &'static str },

    #[error("patch op has an empty path")]
    PatchAtRoot,

    #[error("patch path `{path}` does not exist in the target tree")]
    PatchPathMissing { path: String },
}

/// Merge one bundle's BASE/MINE/THEIRS at `target` under the default
/// conflict policy.
pub fn merge(
    registry: &MigrationRegistry,
    base: &Snapshot,
    mine: &VersionedDocument,
    theirs: &Snapshot,
    target: &SchemaVersion,
) -> Result<Value, MergeError> {
    merge_with_policy(registry, base, mine, theirs, target, CONFLICT_POLICY)
}

pub fn merge_with_policy(
    registry: &MigrationRegistry,
    base: &Snapshot,
    mine: &VersionedDocument,
    theirs: &Snapshot,
    target: &SchemaVersion,
    policy: ConflictPolicy,
) -> Result<Value, MergeError> {
    let doc_type = &mine.meta.doc_type;

    // Pass 1: lift all three inputs to the target shape. THEIRS is
    // normally there already, in which case its chain is empty.
    let base_lifted = lift(registry, doc_type, base.data.clone(), &base.meta.version, target)?;
    let mine_lifted = lift(registry, doc_type, mine.data.clone(), &mine.meta.version, target)?;
    let theirs_lifted = lift(
        registry,
        doc_type,
        theirs.data.clone(),
        &theirs.meta.version,
        target,
    )?;

    let mut base_map = into_object(base_lifted, "base")?;
    let mut mine_map = into_object(mine_lifted, "mine")?;
    let mut theirs_map = into_object(theirs_lifted, "theirs")?;

    // Pass 2: semantic merge of the properties claimed by the step that
    // lands on the target shape.
    let semantic_step = final_step(registry, doc_type, &mine.meta.version, target)?;
    let mut semantic: Vec<(String, Option<Value>)> = Vec::new();
    if let Some(step) = semantic_step {
        for property in step.claimed_properties() {
            let outcome = step.merge_property(
                property,
                base_map.get(property),
                mine_map.get(property),
                theirs_map.get(property),
            )?;
            semantic.push((
                property.clone(),
                match outcome {
                    MergeOutcome::Value(value) => Some(value),
                    MergeOutcome::Drop => None,
                },
            ));
        }
        for (property, _) in &semantic {
            base_map.shift_remove(property);
            mine_map.shift_remove(property);
            theirs_map.shift_remove(property);
        }
    }

    // Pass 3: structural merge of everything unclaimed.
    let base_value = Value::Object(base_map);
    let delta_mine = diff(&base_value, &Value::Object(mine_map));
    let delta_theirs = diff(&base_value, &Value::Object(theirs_map));
    let (winners, losers) = match policy {
        ConflictPolicy::TheirsWins => (delta_theirs, delta_mine),
        ConflictPolicy::MineWins => (delta_mine, delta_theirs),
    };

    let mut merged = base_value;
    apply(&mut merged, &winners)?;
    let survivors: Vec<PatchOp> = losers
        .into_iter()
        .filter(|op| {
            let conflicted = winners.iter().any(|winner| ops_conflict(winner.path(), op.path()));
            if conflicted {
                tracing::debug!("merge: losing edit not persisted: {op}");
            }
            !conflicted
        })
        .collect();
    apply(&mut merged, &survivors)?;

    // Compose: claimed properties re-enter from the semantic pass.
    if let Some(map) = merged.as_object_mut() {
        for (property, value) in semantic {
            if let Some(value) = value {
                map.insert(property, value);
            }
        }
    }

    Ok(merged)
}

fn into_object(value: Value, stage: &'static str) -> Result<Map<String, Value>, MergeError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(MergeError::NotAnObject { stage }),
    }
}

fn lift(
    registry: &MigrationRegistry,
    doc_type: &str,
    data: Value,
    from: &SchemaVersion,
    to: &SchemaVersion,
) -> Result<Value, MergeError> {
    if from == to {
        return Ok(data);
    }
    let from_shape = registry.shape_for(doc_type, from)?;
    let to_shape = registry.shape_for(doc_type, to)?;
    let mut data = data;
    for step_id in registry.find_path(from_shape, to_shape)? {
        data = registry.step(step_id).apply(data)?;
    }
    Ok(data)
}

/// The step whose `to` shape is the target shape along MINE's chain.
fn final_step<'r>(
    registry: &'r MigrationRegistry,
    doc_type: &str,
    from: &SchemaVersion,
    to: &SchemaVersion,
) -> Result<Option<&'r dyn crate::registry::MigrationStep>, MergeError> {
    if from == to {
        return Ok(None);
    }
    let from_shape = registry.shape_for(doc_type, from)?;
    let to_shape = registry.shape_for(doc_type, to)?;
    let chain = registry.find_path(from_shape, to_shape)?;
    Ok(chain.last().map(|&id| registry.step(id)))
}

/// Structural conflict test between a winner path and a loser path.
///
/// Equal paths and prefix containment conflict; so do two edits into the
/// same array, because the winner's inserts/removes shift the indices the
/// loser's ops were computed against.
fn ops_conflict(winner: &TreePath, loser: &TreePath) -> bool {
    let shorter = winner.len().min(loser.len());
    for idx in 0..shorter {
        if winner[idx] != loser[idx] {
            return matches!(
                (&winner[idx], &loser[idx]),
                (PathSeg::Index(_), PathSeg::Index(_))
            );
        }
    }
    true
}
