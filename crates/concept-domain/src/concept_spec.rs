//! Concept spec AST: the parser's output for one `concept { ... }`
//! declaration. This is source-shaped, pre-resolution; the manifest
//! generator (`concept-manifest`) turns it into a `ConceptManifest`.

use crate::type_expr::TypeExpr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Annotations that can prefix a concept or action declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Annotation {
    Gate,
    Eager,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateField {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub tag: String,
    pub params: Vec<StateField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub params: Vec<StateField>,
    pub variants: Vec<Variant>,
}

/// One `{ action, variantName, argBindings }` leg of an invariant pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantPattern {
    pub action: String,
    pub variant_name: String,
    /// field name -> either a literal JSON value or a bound free variable
    /// name (prefixed with `?` in source, stored bare here).
    pub arg_bindings: Vec<(String, ArgBinding)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgBinding {
    Literal(serde_json::Value),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invariant {
    pub free_variables: Vec<FreeVariable>,
    pub after_patterns: Vec<InvariantPattern>,
    pub then_patterns: Vec<InvariantPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeVariable {
    pub name: String,
    /// The type parameter this free variable ranges over, used to derive
    /// the deterministic test-value prefix.
    pub bound_param: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptSpec {
    pub annotations: BTreeSet<Annotation>,
    pub name: String,
    pub version: u32,
    pub type_params: Vec<String>,
    pub purpose: Option<String>,
    pub capabilities: BTreeSet<String>,
    pub state: Vec<StateField>,
    pub actions: Vec<Action>,
    pub invariants: Vec<Invariant>,
}

impl ConceptSpec {
    pub fn is_gate(&self) -> bool {
        self.annotations.contains(&Annotation::Gate)
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// URI this concept is addressed by at runtime: lowercase name, stable
    /// across versions (the version is a separate manifest field).
    pub fn uri(&self) -> String {
        self.name.clone()
    }
}
