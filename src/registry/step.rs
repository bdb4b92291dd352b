//! Migration steps.
//!
//! A step is a reversible transformation between two shapes of the same
//! document family. Steps may additionally claim properties for semantic
//! merging during re-upgrade; everything they do not claim falls through
//! to the structural merge.

use serde_json::Value;
use thiserror::Error;

/// Failure reported by a step's transform or merge function.
///
/// Step authors surface whatever went wrong as a message; the runner
/// captures it per item and never lets it abort the batch.
#[derive(Debug, Error, Clone)]
#[error("{reason}")]
pub struct StepError {
    pub reason: String,
}

impl StepError {
    pub fn new(reason: impl Into<String>) -> Self {
        StepError {
            reason: reason.into(),
        }
    }
}

/// Outcome of a semantic property merge.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Use this value for the property.
    Value(Value),
    /// Omit the property from the merged document entirely.
    Drop,
}

/// A reversible transformation between two adjacent shapes.
pub trait MigrationStep: Send + Sync {
    /// Transform a document from the `from` shape to the `to` shape.
    fn apply(&self, data: Value) -> Result<Value, StepError>;

    /// Transform a document from the `to` shape back to the `from` shape.
    fn reverse(&self, data: Value) -> Result<Value, StepError>;

    /// Top-level properties this step merges semantically.
    fn claimed_properties(&self) -> &[String] {
        &[]
    }

    /// Merge one claimed property from the three merge inputs.
    ///
    /// Only invoked for properties named by [`claimed_properties`]; the
    /// default refuses so an unclaimed call is a step-author bug, not a
    /// silent wrong merge.
    ///
    /// [`claimed_properties`]: MigrationStep::claimed_properties
    fn merge_property(
        &self,
        property: &str,
        _base: Option<&Value>,
        _mine: Option<&Value>,
        _theirs: Option<&Value>,
    ) -> Result<MergeOutcome, StepError> {
        Err(StepError::new(format!(
            "step declares no semantic handler for property `{property}`"
        )))
    }
}

type TransformFn = dyn Fn(Value) -> Result<Value, StepError> + Send + Sync;
type MergeFn = dyn Fn(&str, Option<&Value>, Option<&Value>, Option<&Value>) -> Result<MergeOutcome, StepError>
    + Send
    + Sync;

/// A step assembled from function values.
///
/// This is the common way hosts declare steps: a forward closure, a
/// reverse closure, and optionally a semantic merge handler over a set of
/// claimed property names.
pub struct FnStep {
    apply: Box<TransformFn>,
    reverse: Box<TransformFn>,
    claimed: Vec<String>,
    merge: Option<Box<MergeFn>>,
}

impl FnStep {
    pub fn new(
        apply: impl Fn(Value) -> Result<Value, StepError> + Send + Sync + 'static,
        reverse: impl Fn(Value) -> Result<Value, StepError> + Send + Sync + 'static,
    ) -> Self {
        FnStep {
            apply: Box::new(apply),
            reverse: Box::new(reverse),
            claimed: Vec::new(),
            merge: None,
        }
    }

    /// Attach a semantic merge handler claiming the given properties.
    pub fn with_semantic_merge(
        mut self,
        claimed: impl IntoIterator<Item = impl Into<String>>,
        merge: impl Fn(&str, Option<&Value>, Option<&Value>, Option<&Value>) -> Result<MergeOutcome, StepError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.claimed = claimed.into_iter().map(Into::into).collect();
        self.merge = Some(Box::new(merge));
        self
    }
}

impl MigrationStep for FnStep {
    fn apply(&self, data: Value) -> Result<Value, StepError> {
        (self.apply)(data)
    }

    fn reverse(&self, data: Value) -> Result<Value, StepError> {
        (self.reverse)(data)
    }

    fn claimed_properties(&self) -> &[String] {
        &self.claimed
    }

    fn merge_property(
        &self,
        property: &str,
        base: Option<&Value>,
        mine: Option<&Value>,
        theirs: Option<&Value>,
    ) -> Result<MergeOutcome, StepError> {
        match &self.merge {
            Some(merge) => merge(property, base, mine, theirs),
            None => Err(StepError::new(format!(
                "step declares no semantic handler for property `{property}`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fn_step_round_trip() {
        let step = FnStep::new(
            |mut data| {
                let obj = data.as_object_mut().unwrap();
                let timeout = obj.shift_remove("timeout").unwrap();
                obj.insert("execution_timeout".into(), timeout);
                Ok(data)
            },
            |mut data| {
                let obj = data.as_object_mut().unwrap();
                let timeout = obj.shift_remove("execution_timeout").unwrap();
                obj.insert("timeout".into(), timeout);
                Ok(data)
            },
        );

        let upgraded = step.apply(json!({"timeout": 30})).unwrap();
        assert_eq!(upgraded, json!({"execution_timeout": 30}));
        let restored = step.reverse(upgraded).unwrap();
        assert_eq!(restored, json!({"timeout": 30}));
    }

    #[test]
    fn unclaimed_merge_refuses() {
        let step = FnStep::new(Ok, Ok);
        assert!(step.claimed_properties().is_empty());
        assert!(step.merge_property("plugins", None, None, None).is_err());
    }
}
