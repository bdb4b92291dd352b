//! Versioned shapes.
//!
//! A shape is the structural description of a document family at one
//! schema version. Shapes are declared explicitly by the host; the kernel
//! never infers them from data.

use serde_json::Value;

use crate::core::SchemaVersion;

/// Opaque handle to a registered shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeId(pub(crate) u32);

/// Field value kinds a shape can require.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
    /// Any value; presence is all that is checked.
    Any,
}

impl FieldKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::Null => value.is_null(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Number => value.is_number(),
            FieldKind::String => value.is_string(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Any => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Null => "null",
            FieldKind::Bool => "bool",
            FieldKind::Number => "number",
            FieldKind::String => "string",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
            FieldKind::Any => "any",
        }
    }
}

/// One declared field of a shape.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDef {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDef {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDef {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// A registered `(doc_type, version)` shape with its field definitions.
#[derive(Clone, Debug)]
pub struct Shape {
    pub doc_type: String,
    pub version: SchemaVersion,
    pub fields: Vec<FieldDef>,
}

impl Shape {
    pub fn new(
        doc_type: impl Into<String>,
        version: SchemaVersion,
        fields: Vec<FieldDef>,
    ) -> Self {
        Shape {
            doc_type: doc_type.into(),
            version,
            fields,
        }
    }

}
