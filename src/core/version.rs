//! Schema version numbers.
//!
//! A `SchemaVersion` is a dotted numeric tuple (`MAJOR.MINOR[.PATCH…]`).
//! Ordering is component-wise numeric with implicit zero padding, so
//! `"10.0" > "2.0"` and `"1.0" == "1.0.0"`. The parsed component list is
//! kept as written so versions round-trip through serialization.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid version string.
#[derive(Debug, Error, Clone)]
#[error("schema version `{raw}` is invalid: {reason}")]
pub struct InvalidVersion {
    pub raw: String,
    pub reason: String,
}

/// Dotted numeric schema version.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion(Vec<u64>);

impl SchemaVersion {
    /// Parse a dotted numeric version such as `"1.0"` or `"2.5.1"`.
    pub fn parse(raw: &str) -> Result<Self, InvalidVersion> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidVersion {
                raw: raw.to_string(),
                reason: "empty".to_string(),
            });
        }
        let mut components = Vec::new();
        for part in trimmed.split('.') {
            let n = part.parse::<u64>().map_err(|_| InvalidVersion {
                raw: raw.to_string(),
                reason: format!("component `{part}` is not a number"),
            })?;
            components.push(n);
        }
        Ok(SchemaVersion(components))
    }

    /// Build a version directly from numeric components.
    pub fn new(components: Vec<u64>) -> Self {
        if components.is_empty() {
            return SchemaVersion(vec![0]);
        }
        SchemaVersion(components)
    }

    /// The version assumed for documents persisted without a `_meta` tag.
    pub fn initial() -> Self {
        SchemaVersion(vec![1, 0])
    }

    /// Component at `idx`, treating missing trailing components as zero.
    fn component(&self, idx: usize) -> u64 {
        self.0.get(idx).copied().unwrap_or(0)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        Ok(())
    }
}

impl PartialEq for SchemaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SchemaVersion {}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for idx in 0..len {
            match self.component(idx).cmp(&other.component(idx)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for SchemaVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Trailing zeros are insignificant for equality, so they must be
        // insignificant for hashing too.
        let significant = self
            .0
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |last| last + 1);
        self.0[..significant].hash(state);
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = InvalidVersion;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        SchemaVersion::parse(&raw)
    }
}

impl From<SchemaVersion> for String {
    fn from(version: SchemaVersion) -> String {
        version.to_string()
    }
}

impl std::str::FromStr for SchemaVersion {
    type Err = InvalidVersion;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        SchemaVersion::parse(raw)
    }
}
