//! The concept manifest: the canonical, language-neutral description
//! of a concept that the code generators consume. Produced once per concept
//! spec by `concept-manifest` and cached by spec id.

use crate::type_expr::ResolvedType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationSource {
    /// State fields co-keyed by the same type parameter, merged into one
    /// relation.
    Merged,
    /// A `set T` field, stored as a set-valued relation.
    SetValued,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationField {
    pub name: String,
    pub ty: ResolvedType,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub source: RelationSource,
    pub key_field: String,
    pub fields: Vec<RelationField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestVariant {
    pub tag: String,
    pub fields: Vec<RelationField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestAction {
    pub name: String,
    pub params: Vec<RelationField>,
    pub variants: Vec<ManifestVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    pub wire_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeVariableBinding {
    pub name: String,
    /// Deterministic test value, in the form `{prefix}-test-invariant-{NNN}`.
    pub test_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantStep {
    pub action: String,
    pub expected_variant: String,
    /// field name -> expected JSON value (literal or a free-variable test
    /// value already substituted in).
    pub field_equalities: Vec<(String, serde_json::Value)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestInvariant {
    pub description: String,
    pub free_variables: Vec<FreeVariableBinding>,
    pub setup: Vec<InvariantStep>,
    pub assertions: Vec<InvariantStep>,
}

/// `{action -> schema}` and `{action -> {tag -> schema}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JsonSchemas {
    pub invocations: std::collections::BTreeMap<String, serde_json::Value>,
    pub completions: std::collections::BTreeMap<String, std::collections::BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptManifest {
    pub uri: String,
    pub name: String,
    pub version: u32,
    pub purpose: Option<String>,
    pub capabilities: Vec<String>,
    pub type_params: Vec<TypeParam>,
    pub relations: Vec<Relation>,
    pub actions: Vec<ManifestAction>,
    pub invariants: Vec<ManifestInvariant>,
    pub json_schemas: JsonSchemas,
    pub graphql_schema: String,
    pub gate: Option<bool>,
}

impl ConceptManifest {
    pub fn action(&self, name: &str) -> Option<&ManifestAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }
}
