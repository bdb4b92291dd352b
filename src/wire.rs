//! Document wire form.
//!
//! Persisted documents are UTF-8 JSON objects that may carry a `_meta`
//! member tagging them with `DocType`/`SchemaVersion`. Reading extracts
//! and strips the tag; writing reattaches it at the top. A document
//! without a tag is tolerated: its doc type comes from the host and its
//! version is assumed to be `1.0`.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::{Meta, SchemaVersion};

pub const META_KEY: &str = "_meta";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WireError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document top level is not an object")]
    NotAnObject,

    #[error("document has no `_meta` tag and no doc type could be inferred")]
    NoInferableDocType,
}

/// Parse document bytes into `(data, meta)`, stripping the `_meta` tag.
pub fn decode(bytes: &[u8], fallback_doc_type: Option<&str>) -> Result<(Value, Meta), WireError> {
    let mut value: Value = serde_json::from_slice(bytes)?;
    let Some(object) = value.as_object_mut() else {
        return Err(WireError::NotAnObject);
    };

    let meta = match object.shift_remove(META_KEY) {
        Some(raw) => serde_json::from_value(raw)?,
        None => {
            let doc_type = fallback_doc_type.ok_or(WireError::NoInferableDocType)?;
            Meta::new(doc_type, SchemaVersion::initial())
        }
    };

    Ok((value, meta))
}

/// Serialize `(data, meta)` with the `_meta` tag reattached first.
pub fn encode(data: &Value, meta: &Meta) -> Result<Vec<u8>, WireError> {
    let Some(fields) = data.as_object() else {
        return Err(WireError::NotAnObject);
    };

    let mut object = Map::new();
    object.insert(META_KEY.to_string(), serde_json::to_value(meta)?);
    for (key, value) in fields {
        object.insert(key.clone(), value.clone());
    }

    let mut bytes = serde_json::to_vec_pretty(&Value::Object(object))?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_strips_meta() {
        let bytes = br#"{"_meta":{"DocType":"PkgConf","SchemaVersion":"1.0"},"timeout":30}"#;
        let (data, meta) = decode(bytes, None).unwrap();
        assert_eq!(data, json!({"timeout": 30}));
        assert_eq!(meta.doc_type, "PkgConf");
        assert_eq!(meta.version.to_string(), "1.0");
    }

    #[test]
    fn decode_infers_missing_meta() {
        let bytes = br#"{"timeout":30}"#;
        let (data, meta) = decode(bytes, Some("PkgConf")).unwrap();
        assert_eq!(data, json!({"timeout": 30}));
        assert_eq!(meta.doc_type, "PkgConf");
        assert_eq!(meta.version.to_string(), "1.0");

        assert!(matches!(
            decode(bytes, None),
            Err(WireError::NoInferableDocType)
        ));
    }

    #[test]
    fn encode_decode_round_trip() {
        let meta = Meta::new("PkgConf", SchemaVersion::parse("2.0").unwrap());
        let data = json!({"execution_timeout": 30, "reporting": {"format": "json"}});
        let bytes = encode(&data, &meta).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("{\n  \"_meta\""));

        let (decoded, decoded_meta) = decode(&bytes, None).unwrap();
        assert_eq!(decoded, data);
        assert_eq!(decoded_meta, meta);
    }

    #[test]
    fn non_object_documents_are_refused() {
        assert!(matches!(decode(b"[1,2]", None), Err(WireError::NotAnObject)));
        let meta = Meta::new("PkgConf", SchemaVersion::initial());
        assert!(matches!(
            encode(&json!(42), &meta),
            Err(WireError::NotAnObject)
        ));
    }
}
