//! Document version tags.
//!
//! Every persisted document carries a `Meta`: the document family it
//! belongs to and the schema version its data is shaped for. On the wire
//! this is the `_meta` member with `DocType`/`SchemaVersion` keys.

use serde::{Deserialize, Serialize};

use super::version::SchemaVersion;

/// `(doc_type, schema_version)` tag for a document or snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "DocType")]
    pub doc_type: String,
    #[serde(rename = "SchemaVersion")]
    pub version: SchemaVersion,
}

impl Meta {
    pub fn new(doc_type: impl Into<String>, version: SchemaVersion) -> Self {
        Meta {
            doc_type: doc_type.into(),
            version,
        }
    }
}

impl std::fmt::Display for Meta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.doc_type, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_keys_are_pascal_case() {
        let meta = Meta::new("PkgConf", SchemaVersion::parse("1.0").unwrap());
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["DocType"], "PkgConf");
        assert_eq!(json["SchemaVersion"], "1.0");
    }
}
