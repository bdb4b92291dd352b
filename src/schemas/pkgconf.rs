//! Package configuration documents.
//!
//! `PkgConf` evolved in 2.0: the timeout was renamed, the plugin list
//! became a map of per-plugin settings, and a reporting section appeared.
//! The step claims `plugins` for semantic merging because its type
//! changed across versions; a structural merge of a list against a map
//! would be meaningless.

use serde_json::{Map, Value, json};

use crate::core::SchemaVersion;
use crate::registry::{
    FieldDef, FieldKind, FnStep, MergeOutcome, RegistryBuilder, Shape, StepError,
};

pub const DOC_TYPE: &str = "PkgConf";

pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .doc_type(DOC_TYPE, shapes())
        .step(DOC_TYPE, "1.0", "2.0", step_1_0_to_2_0())
}

fn shapes() -> Vec<Shape> {
    vec![
        Shape::new(
            DOC_TYPE,
            SchemaVersion::new(vec![1, 0]),
            vec![
                FieldDef::required("timeout", FieldKind::Number),
                FieldDef::required("plugins", FieldKind::Array),
            ],
        ),
        Shape::new(
            DOC_TYPE,
            SchemaVersion::new(vec![2, 0]),
            vec![
                FieldDef::required("execution_timeout", FieldKind::Number),
                FieldDef::required("plugins", FieldKind::Object),
                FieldDef::required("reporting", FieldKind::Object),
            ],
        ),
    ]
}

pub fn step_1_0_to_2_0() -> FnStep {
    FnStep::new(apply_1_0_to_2_0, reverse_2_0_to_1_0)
        .with_semantic_merge(["plugins"], merge_plugins)
}

fn apply_1_0_to_2_0(mut data: Value) -> Result<Value, StepError> {
    let obj = data
        .as_object_mut()
        .ok_or_else(|| StepError::new("PkgConf document is not an object"))?;

    if let Some(timeout) = obj.shift_remove("timeout") {
        obj.insert("execution_timeout".into(), timeout);
    }

    if let Some(plugins) = obj.shift_remove("plugins") {
        let Value::Array(names) = plugins else {
            return Err(StepError::new("PkgConf 1.0 `plugins` is not a list"));
        };
        let mut by_name = Map::new();
        for name in names {
            let Value::String(name) = name else {
                return Err(StepError::new("PkgConf 1.0 plugin name is not a string"));
            };
            by_name.insert(name, json!({"enabled": true}));
        }
        obj.insert("plugins".into(), Value::Object(by_name));
    }

    obj.entry("reporting").or_insert(json!({"format": "json"}));
    Ok(data)
}

fn reverse_2_0_to_1_0(mut data: Value) -> Result<Value, StepError> {
    let obj = data
        .as_object_mut()
        .ok_or_else(|| StepError::new("PkgConf document is not an object"))?;

    if let Some(timeout) = obj.shift_remove("execution_timeout") {
        obj.insert("timeout".into(), timeout);
    }

    if let Some(plugins) = obj.shift_remove("plugins") {
        let Value::Object(by_name) = plugins else {
            return Err(StepError::new("PkgConf 2.0 `plugins` is not a map"));
        };
        let names: Vec<Value> = by_name.keys().cloned().map(Value::String).collect();
        obj.insert("plugins".into(), Value::Array(names));
    }

    obj.shift_remove("reporting");
    Ok(data)
}

/// Three-way merge of the plugin map.
///
/// THEIRS is the starting point; plugins the user removed after rollback
/// (present in BASE, absent in MINE) are removed from it, and plugins the
/// user added after rollback are carried in with their lifted settings.
fn merge_plugins(
    _property: &str,
    base: Option<&Value>,
    mine: Option<&Value>,
    theirs: Option<&Value>,
) -> Result<MergeOutcome, StepError> {
    let Some(theirs) = theirs else {
        return Ok(mine
            .or(base)
            .cloned()
            .map(MergeOutcome::Value)
            .unwrap_or(MergeOutcome::Drop));
    };
    let mut merged = theirs.clone();
    let merged_map = merged
        .as_object_mut()
        .ok_or_else(|| StepError::new("PkgConf 2.0 `plugins` is not a map"))?;

    if let (Some(base), Some(mine)) = (
        base.and_then(Value::as_object),
        mine.and_then(Value::as_object),
    ) {
        for name in base.keys() {
            if !mine.contains_key(name) {
                merged_map.shift_remove(name);
            }
        }
        for (name, settings) in mine {
            if !base.contains_key(name) && !merged_map.contains_key(name) {
                merged_map.insert(name.clone(), settings.clone());
            }
        }
    }

    Ok(MergeOutcome::Value(merged))
}
