//! Migration plans.
//!
//! A plan is an ordered, pure classification of document bundles into
//! actions against a target. Plans are plain data, serialized to JSON so
//! a batch can be reviewed before it is executed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{InvalidVersion, SchemaVersion};
use crate::fsio;

mod planner;

pub use planner::{plan_downgrade, plan_upgrade};
pub(crate) use planner::NO_PATH_DETAIL;

/// What a plan migrates towards: the latest registered version of each
/// doc type, or one explicit version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlanTarget {
    Latest,
    Version(SchemaVersion),
}

impl std::fmt::Display for PlanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanTarget::Latest => f.write_str("latest"),
            PlanTarget::Version(version) => write!(f, "{version}"),
        }
    }
}

impl TryFrom<String> for PlanTarget {
    type Error = InvalidVersion;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw == "latest" {
            Ok(PlanTarget::Latest)
        } else {
            Ok(PlanTarget::Version(SchemaVersion::parse(&raw)?))
        }
    }
}

impl From<PlanTarget> for String {
    fn from(target: PlanTarget) -> String {
        target.to_string()
    }
}

/// The one thing the runner does with a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Skip,
    StandardUpgrade,
    StandardDowngrade,
    ThreeWayMerge,
    Quarantine,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAction {
    pub identifier: String,
    pub kind: ActionKind,
    pub details: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanHeader {
    #[serde(rename = "targetVersion")]
    pub target: PlanTarget,
    pub generated_at_utc: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub header: PlanHeader,
    pub actions: Vec<PlanAction>,
}

/// Plan file IO errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Plan {
    pub fn load(path: &Path) -> Result<Self, PlanFileError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), PlanFileError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        fsio::atomic_write(path, &bytes)?;
        Ok(())
    }

    pub fn count_of(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn kind_wire_names_are_screaming_snake() {
        let json = serde_json::to_value(ActionKind::ThreeWayMerge).unwrap();
        assert_eq!(json, serde_json::json!("THREE_WAY_MERGE"));
        let back: ActionKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, ActionKind::ThreeWayMerge);
    }

    #[test]
    fn target_round_trips_latest_and_explicit() {
        for raw in ["latest", "2.0"] {
            let target: PlanTarget = serde_json::from_value(serde_json::json!(raw)).unwrap();
            assert_eq!(serde_json::to_value(&target).unwrap(), serde_json::json!(raw));
        }
    }

    #[test]
    fn save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plan.json");
        let plan = Plan {
            header: PlanHeader {
                target: PlanTarget::Latest,
                generated_at_utc: "2026-01-01T00:00:00Z".into(),
            },
            actions: vec![PlanAction {
                identifier: "a.json".into(),
                kind: ActionKind::StandardUpgrade,
                details: "upgrade 1.0 -> 2.0".into(),
            }],
        };
        plan.save(&path).unwrap();
        assert_eq!(Plan::load(&path).unwrap(), plan);
    }
}
