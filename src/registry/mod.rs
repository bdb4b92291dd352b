//! Migration registry: versioned shapes and the steps between them.
//!
//! Built once at configuration time via [`RegistryBuilder`], then
//! immutable. All lookups are pure; missing data is a typed error, never a
//! panic. Path search is breadth-first over the step graph, shortest by
//! hop count, with ties broken by step registration order.

use std::collections::{BTreeMap, VecDeque};

use thiserror::Error;

use crate::core::{InvalidVersion, SchemaVersion};

mod shape;
mod step;

pub use shape::{FieldDef, FieldKind, Shape, ShapeId};
pub use step::{FnStep, MergeOutcome, MigrationStep, StepError};

/// Opaque handle to a registered step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StepId(u32);

/// Registry construction errors. Fatal at setup; never raised during
/// execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("doc type `{doc_type}` is registered twice")]
    DuplicateDocType { doc_type: String },

    #[error("doc type `{doc_type}` declares version `{version}` twice")]
    DuplicateVersion {
        doc_type: String,
        version: SchemaVersion,
    },

    #[error("shape doc type `{got}` does not belong to registration of `{expected}`")]
    ShapeDocTypeMismatch { expected: String, got: String },

    #[error("step references unregistered shape `{doc_type}@{version}`")]
    UnknownStepShape {
        doc_type: String,
        version: SchemaVersion,
    },

    #[error(transparent)]
    Version(#[from] InvalidVersion),
}

/// Registry lookup errors.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("no shape registered for `{doc_type}@{version}`")]
    NoSuchShape {
        doc_type: String,
        version: SchemaVersion,
    },

    #[error("no migration path for `{doc_type}` from {from} to {to}")]
    NoMigrationPath {
        doc_type: String,
        from: SchemaVersion,
        to: SchemaVersion,
    },

    #[error("doc type `{doc_type}` has no registered versions")]
    UnknownDocType { doc_type: String },
}

struct StepRecord {
    from: ShapeId,
    to: ShapeId,
    step: Box<dyn MigrationStep>,
}

impl std::fmt::Debug for StepRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRecord")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

struct PendingStep {
    doc_type: String,
    from: String,
    to: String,
    step: Box<dyn MigrationStep>,
}

/// Collects host declarations, validated into a [`MigrationRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    doc_types: Vec<(String, Vec<Shape>)>,
    steps: Vec<PendingStep>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a document family with all of its versioned shapes.
    ///
    /// A doc type is declared exactly once; declaring it again is a fatal
    /// configuration error at build time.
    pub fn doc_type(
        mut self,
        doc_type: impl Into<String>,
        shapes: Vec<Shape>,
    ) -> Self {
        self.doc_types.push((doc_type.into(), shapes));
        self
    }

    /// Declare a step between two versions of a document family.
    pub fn step(
        mut self,
        doc_type: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        step: impl MigrationStep + 'static,
    ) -> Self {
        self.steps.push(PendingStep {
            doc_type: doc_type.into(),
            from: from.into(),
            to: to.into(),
            step: Box::new(step),
        });
        self
    }

    pub fn build(self) -> Result<MigrationRegistry, ConfigurationError> {
        let mut registry = MigrationRegistry {
            shapes: Vec::new(),
            by_key: BTreeMap::new(),
            steps: Vec::new(),
            edges: BTreeMap::new(),
        };

        let mut declared = std::collections::BTreeSet::new();
        for (doc_type, shapes) in self.doc_types {
            if !declared.insert(doc_type.clone()) {
                return Err(ConfigurationError::DuplicateDocType { doc_type });
            }
            for shape in shapes {
                if shape.doc_type != doc_type {
                    return Err(ConfigurationError::ShapeDocTypeMismatch {
                        expected: doc_type,
                        got: shape.doc_type,
                    });
                }
                let key = (doc_type.clone(), shape.version.clone());
                if registry.by_key.contains_key(&key) {
                    return Err(ConfigurationError::DuplicateVersion {
                        doc_type,
                        version: shape.version,
                    });
                }
                let id = ShapeId(registry.shapes.len() as u32);
                registry.by_key.insert(key, id);
                registry.shapes.push(shape);
            }
        }

        for pending in self.steps {
            let from_version = SchemaVersion::parse(&pending.from)?;
            let to_version = SchemaVersion::parse(&pending.to)?;
            let from = registry.resolve(&pending.doc_type, &from_version)?;
            let to = registry.resolve(&pending.doc_type, &to_version)?;
            let step_id = StepId(registry.steps.len() as u32);
            registry.steps.push(StepRecord {
                from,
                to,
                step: pending.step,
            });
            registry.edges.entry(from).or_default().push(step_id);
        }

        Ok(registry)
    }
}

/// Immutable map of `(doc_type, version) → shape` and
/// `(shape, shape) → step`.
#[derive(Debug)]
pub struct MigrationRegistry {
    shapes: Vec<Shape>,
    by_key: BTreeMap<(String, SchemaVersion), ShapeId>,
    steps: Vec<StepRecord>,
    edges: BTreeMap<ShapeId, Vec<StepId>>,
}

impl MigrationRegistry {
    fn resolve(
        &self,
        doc_type: &str,
        version: &SchemaVersion,
    ) -> Result<ShapeId, ConfigurationError> {
        self.by_key
            .get(&(doc_type.to_string(), version.clone()))
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownStepShape {
                doc_type: doc_type.to_string(),
                version: version.clone(),
            })
    }

    /// Exact shape lookup.
    pub fn shape_for(
        &self,
        doc_type: &str,
        version: &SchemaVersion,
    ) -> Result<ShapeId, RegistryError> {
        self.by_key
            .get(&(doc_type.to_string(), version.clone()))
            .copied()
            .ok_or_else(|| RegistryError::NoSuchShape {
                doc_type: doc_type.to_string(),
                version: version.clone(),
            })
    }

    pub fn shape(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.0 as usize]
    }

    /// Highest registered version of a doc type, by numeric comparison.
    pub fn latest_version(&self, doc_type: &str) -> Option<&SchemaVersion> {
        self.by_key
            .keys()
            .filter(|(dt, _)| dt == doc_type)
            .map(|(_, version)| version)
            .max()
    }

    pub fn registered_doc_types(&self) -> Vec<&str> {
        let mut doc_types: Vec<&str> = self
            .by_key
            .keys()
            .map(|(dt, _)| dt.as_str())
            .collect();
        doc_types.dedup();
        doc_types
    }

    pub fn step(&self, id: StepId) -> &dyn MigrationStep {
        self.steps[id.0 as usize].step.as_ref()
    }

    pub fn step_target(&self, id: StepId) -> ShapeId {
        self.steps[id.0 as usize].to
    }

    pub fn step_source(&self, id: StepId) -> ShapeId {
        self.steps[id.0 as usize].from
    }

    /// Shortest step chain from one shape to another.
    ///
    /// Breadth-first over registered steps; `find_path(x, x)` is the empty
    /// chain. Ties at equal hop count resolve to the earliest-registered
    /// step, so planning is deterministic.
    pub fn find_path(&self, from: ShapeId, to: ShapeId) -> Result<Vec<StepId>, RegistryError> {
        if from == to {
            return Ok(Vec::new());
        }

        let mut queue = VecDeque::from([from]);
        let mut arrived_via: BTreeMap<ShapeId, StepId> = BTreeMap::new();

        while let Some(shape) = queue.pop_front() {
            let Some(edges) = self.edges.get(&shape) else {
                continue;
            };
            for &step_id in edges {
                let next = self.step_target(step_id);
                if next == from || arrived_via.contains_key(&next) {
                    continue;
                }
                arrived_via.insert(next, step_id);
                if next == to {
                    return Ok(self.unwind(from, to, &arrived_via));
                }
                queue.push_back(next);
            }
        }

        let from_shape = self.shape(from);
        let to_shape = self.shape(to);
        Err(RegistryError::NoMigrationPath {
            doc_type: from_shape.doc_type.clone(),
            from: from_shape.version.clone(),
            to: to_shape.version.clone(),
        })
    }

    fn unwind(
        &self,
        from: ShapeId,
        to: ShapeId,
        arrived_via: &BTreeMap<ShapeId, StepId>,
    ) -> Vec<StepId> {
        let mut chain = Vec::new();
        let mut cursor = to;
        while cursor != from {
            let step_id = arrived_via[&cursor];
            chain.push(step_id);
            cursor = self.step_source(step_id);
        }
        chain.reverse();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SchemaVersion;

    fn v(raw: &str) -> SchemaVersion {
        SchemaVersion::parse(raw).unwrap()
    }

    fn shape(doc_type: &str, version: &str) -> Shape {
        Shape::new(doc_type, v(version), Vec::new())
    }

    fn identity_step() -> FnStep {
        FnStep::new(Ok, Ok)
    }

    fn three_version_registry() -> MigrationRegistry {
        RegistryBuilder::new()
            .doc_type(
                "PkgConf",
                vec![
                    shape("PkgConf", "1.0"),
                    shape("PkgConf", "2.0"),
                    shape("PkgConf", "3.0"),
                ],
            )
            .step("PkgConf", "1.0", "2.0", identity_step())
            .step("PkgConf", "2.0", "3.0", identity_step())
            .build()
            .unwrap()
    }

    #[test]
    fn duplicate_doc_type_is_fatal() {
        let err = RegistryBuilder::new()
            .doc_type("PkgConf", vec![shape("PkgConf", "1.0")])
            .doc_type("PkgConf", vec![shape("PkgConf", "2.0")])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateDocType { .. }));
    }

    #[test]
    fn step_over_unknown_shape_is_fatal() {
        let err = RegistryBuilder::new()
            .doc_type("PkgConf", vec![shape("PkgConf", "1.0")])
            .step("PkgConf", "1.0", "9.0", identity_step())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownStepShape { .. }));
    }

    #[test]
    fn latest_version_is_numeric_not_lexicographic() {
        let registry = RegistryBuilder::new()
            .doc_type(
                "PkgConf",
                vec![shape("PkgConf", "2.0"), shape("PkgConf", "10.0")],
            )
            .build()
            .unwrap();
        assert_eq!(registry.latest_version("PkgConf"), Some(&v("10.0")));
        assert_eq!(registry.latest_version("Other"), None);
    }

    #[test]
    fn path_is_empty_for_same_shape() {
        let registry = three_version_registry();
        let shape = registry.shape_for("PkgConf", &v("2.0")).unwrap();
        assert!(registry.find_path(shape, shape).unwrap().is_empty());
    }

    #[test]
    fn path_chains_steps_in_order() {
        let registry = three_version_registry();
        let from = registry.shape_for("PkgConf", &v("1.0")).unwrap();
        let to = registry.shape_for("PkgConf", &v("3.0")).unwrap();
        let chain = registry.find_path(from, to).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(registry.step_source(chain[0]), from);
        assert_eq!(registry.step_target(chain[1]), to);
    }

    #[test]
    fn missing_path_is_a_typed_error() {
        let registry = three_version_registry();
        let from = registry.shape_for("PkgConf", &v("3.0")).unwrap();
        let to = registry.shape_for("PkgConf", &v("1.0")).unwrap();
        assert!(matches!(
            registry.find_path(from, to),
            Err(RegistryError::NoMigrationPath { .. })
        ));
    }

    #[test]
    fn shortest_path_wins_over_longer_chain() {
        // 1.0 -> 2.0 -> 3.0 plus a direct 1.0 -> 3.0 shortcut.
        let registry = RegistryBuilder::new()
            .doc_type(
                "PkgConf",
                vec![
                    shape("PkgConf", "1.0"),
                    shape("PkgConf", "2.0"),
                    shape("PkgConf", "3.0"),
                ],
            )
            .step("PkgConf", "1.0", "2.0", identity_step())
            .step("PkgConf", "2.0", "3.0", identity_step())
            .step("PkgConf", "1.0", "3.0", identity_step())
            .build()
            .unwrap();
        let from = registry.shape_for("PkgConf", &v("1.0")).unwrap();
        let to = registry.shape_for("PkgConf", &v("3.0")).unwrap();
        assert_eq!(registry.find_path(from, to).unwrap().len(), 1);
    }

    #[test]
    fn registered_doc_types_deduplicates_versions() {
        let registry = three_version_registry();
        assert_eq!(registry.registered_doc_types(), vec!["PkgConf"]);
    }
}
