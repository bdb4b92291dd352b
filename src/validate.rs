//! Shape-level document validation.
//!
//! A thin collaborator: checks a document's top-level fields against the
//! registered shape's declarations. The kernel only consumes the verdict;
//! a violation becomes a per-item `SchemaValidationFailure` quarantine.

use serde_json::Value;
use thiserror::Error;

use crate::registry::Shape;

/// One or more shape violations, joined for display.
#[derive(Debug, Error, Clone)]
#[error("document does not match shape `{doc_type}@{version}`: {}", .violations.join("; "))]
pub struct ValidationError {
    pub doc_type: String,
    pub version: String,
    pub violations: Vec<String>,
}

/// Validate `data` against `shape`. Unknown fields are tolerated.
pub fn validate_document(shape: &Shape, data: &Value) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    let Some(object) = data.as_object() else {
        return Err(ValidationError {
            doc_type: shape.doc_type.clone(),
            version: shape.version.to_string(),
            violations: vec!["top level is not an object".to_string()],
        });
    };

    for field in &shape.fields {
        match object.get(&field.name) {
            None => {
                if field.required {
                    violations.push(format!("required field `{}` is missing", field.name));
                }
            }
            Some(value) => {
                if !field.kind.matches(value) {
                    violations.push(format!(
                        "field `{}` is not of kind {}",
                        field.name,
                        field.kind.as_str()
                    ));
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            doc_type: shape.doc_type.clone(),
            version: shape.version.to_string(),
            violations,
        })
    }
}
