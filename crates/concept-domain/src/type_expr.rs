//! Type expressions as written in concept source, and their resolved form.
//!
//! A `TypeExpr` is whatever the parser produced from source tokens. A
//! `ResolvedType` is what the manifest generator turns it into once every
//! type-parameter reference has been checked against the concept's
//! `typeParams`. The engine and code generators only ever see
//! `ResolvedType`; `TypeExpr` does not round-trip past the manifest
//! generator: manifests hold only resolved kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A primitive scalar type available in concept state/action signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    String,
    Int,
    Bool,
    Bytes,
    DateTime,
    Float,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::String => "String",
            Primitive::Int => "Int",
            Primitive::Bool => "Bool",
            Primitive::Bytes => "Bytes",
            Primitive::DateTime => "DateTime",
            Primitive::Float => "Float",
        };
        f.write_str(s)
    }
}

impl Primitive {
    pub fn from_keyword(s: &str) -> Option<Self> {
        Some(match s {
            "String" => Primitive::String,
            "Int" => Primitive::Int,
            "Bool" => Primitive::Bool,
            "Bytes" => Primitive::Bytes,
            "DateTime" => Primitive::DateTime,
            "Float" => Primitive::Float,
            _ => return None,
        })
    }
}

/// Type expression as written in concept source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    Primitive(Primitive),
    /// Reference to one of the concept's declared `typeParams`.
    Param(String),
    Set(Box<TypeExpr>),
    List(Box<TypeExpr>),
    Option(Box<TypeExpr>),
    /// `K -> V` mapping.
    Map(Box<TypeExpr>, Box<TypeExpr>),
}

/// A fully resolved type tree, produced by the manifest generator.
///
/// `kind` mirrors the `TypeExpr` shape but every `Param` reference has been
/// checked against the concept's type parameters, so there is nowhere left
/// for a stray source token to hide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolvedType {
    Primitive { wire: String },
    Param { name: String },
    Set { element: Box<ResolvedType> },
    List { element: Box<ResolvedType> },
    Option { element: Box<ResolvedType> },
    Map { key: Box<ResolvedType>, value: Box<ResolvedType> },
    Record { fields: Vec<(String, ResolvedType)> },
}

impl ResolvedType {
    /// Wire-level JSON Schema `type` keyword fragment for this resolved type.
    /// Used by the manifest generator when deriving invocation/completion
    /// schemas.
    pub fn json_schema(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            ResolvedType::Primitive { wire } => match wire.as_str() {
                "Int" => json!({"type": "integer"}),
                "Float" => json!({"type": "number"}),
                "Bool" => json!({"type": "boolean"}),
                "Bytes" => json!({"type": "string", "contentEncoding": "base64"}),
                "DateTime" => json!({"type": "string", "format": "date-time"}),
                _ => json!({"type": "string"}),
            },
            ResolvedType::Param { name } => json!({"description": format!("type parameter {name}")}),
            ResolvedType::Set { element } | ResolvedType::List { element } => {
                json!({"type": "array", "items": element.json_schema()})
            }
            ResolvedType::Option { element } => {
                let mut inner = element.json_schema();
                if let Some(obj) = inner.as_object_mut() {
                    obj.insert("nullable".into(), json!(true));
                }
                inner
            }
            ResolvedType::Map { value, .. } => {
                json!({"type": "object", "additionalProperties": value.json_schema()})
            }
            ResolvedType::Record { fields } => {
                let props: serde_json::Map<String, serde_json::Value> =
                    fields.iter().map(|(n, t)| (n.clone(), t.json_schema())).collect();
                json!({"type": "object", "properties": props})
            }
        }
    }

    /// The type-parameter this type is keyed by, if it directly is or wraps
    /// one. Used when grouping state fields into relations.
    pub fn key_param(&self) -> Option<&str> {
        match self {
            ResolvedType::Param { name } => Some(name),
            ResolvedType::Set { element } | ResolvedType::List { element } | ResolvedType::Option { element } => {
                element.key_param()
            }
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, ResolvedType::Set { .. })
    }
}
