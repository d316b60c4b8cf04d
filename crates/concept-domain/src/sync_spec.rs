//! Sync spec AST and compiled form.
//!
//! `RawSync` is what the sync parser produces directly from source.
//! `CompiledSync` is what the sync compiler lowers it to: the form the
//! sync engine actually indexes and evaluates. Lowering validates variable
//! bindings but otherwise keeps the same shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncAnnotation {
    Eager,
}

/// `name: "literal"`, `name: ?var`, or `name: _`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldMatch {
    Literal(serde_json::Value),
    Variable(String),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedField {
    pub name: String,
    pub matcher: FieldMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenPattern {
    pub concept: String,
    pub action: String,
    pub input_fields: Vec<MatchedField>,
    pub output_fields: Vec<MatchedField>,
}

/// A `then` value is either a literal or a reference to a variable bound by
/// `when`/`where`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ThenValue {
    Literal(serde_json::Value),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThenField {
    pub name: String,
    pub value: ThenValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThenInvocation {
    pub concept: String,
    pub action: String,
    pub fields: Vec<ThenField>,
}

/// A `where` clause binds a new variable or constrains state. Kept as a raw
/// expression string plus a `bind` name; the sync engine interprets these
/// against the concept registry's query capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WhereClause {
    /// `?x := Concept.relation[field: ?y]` — a state query bound to a name.
    Query { bind: String, concept: String, relation: String, criteria: Vec<(String, FieldMatch)> },
    /// `?x := <expr>` over already-bound variables; used for simple
    /// projections that don't need a concept query.
    Bind { bind: String, source_variable: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSync {
    pub name: String,
    pub annotations: Vec<SyncAnnotation>,
    pub when: Vec<WhenPattern>,
    pub r#where: Vec<WhereClause>,
    pub then: Vec<ThenInvocation>,
}

/// The compiled, runtime-ready form of a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledSync {
    pub name: String,
    pub annotations: Vec<SyncAnnotation>,
    pub when: Vec<WhenPattern>,
    pub r#where: Vec<WhereClause>,
    pub then: Vec<ThenInvocation>,
}

impl CompiledSync {
    pub fn is_eager(&self) -> bool {
        self.annotations.contains(&SyncAnnotation::Eager)
    }

    /// Every `(concept, action)` pair this sync's `when` clause can trigger
    /// on — used to build the engine's trigger index.
    pub fn trigger_keys(&self) -> Vec<(String, String)> {
        self.when.iter().map(|p| (p.concept.clone(), p.action.clone())).collect()
    }

    /// Every variable name referenced by a `when` pattern's field matchers.
    pub fn when_bound_variables(&self) -> std::collections::BTreeSet<&str> {
        let mut out = std::collections::BTreeSet::new();
        for pat in &self.when {
            for f in pat.input_fields.iter().chain(pat.output_fields.iter()) {
                if let FieldMatch::Variable(v) = &f.matcher {
                    out.insert(v.as_str());
                }
            }
        }
        out
    }
}
