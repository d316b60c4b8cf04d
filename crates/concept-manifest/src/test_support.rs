//! Shared fixtures for this crate's unit tests.

use concept_domain::concept_spec::{Action, ConceptSpec, StateField, Variant};
use concept_domain::type_expr::Primitive;
use concept_domain::TypeExpr;
use std::collections::BTreeSet;

pub fn echo_spec() -> ConceptSpec {
    ConceptSpec {
        annotations: BTreeSet::new(),
        name: "echo".into(),
        version: 1,
        type_params: vec!["M".into()],
        purpose: Some("repeats whatever input it is given".into()),
        capabilities: BTreeSet::new(),
        state: vec![
            StateField { name: "messages".into(), ty: TypeExpr::Set(Box::new(TypeExpr::Param("M".into()))) },
            StateField {
                name: "text".into(),
                ty: TypeExpr::Map(Box::new(TypeExpr::Param("M".into())), Box::new(TypeExpr::Primitive(Primitive::String))),
            },
        ],
        actions: vec![Action {
            name: "send".into(),
            params: vec![
                StateField { name: "id".into(), ty: TypeExpr::Param("M".into()) },
                StateField { name: "text".into(), ty: TypeExpr::Primitive(Primitive::String) },
            ],
            variants: vec![Variant {
                tag: "ok".into(),
                params: vec![
                    StateField { name: "id".into(), ty: TypeExpr::Param("M".into()) },
                    StateField { name: "echo".into(), ty: TypeExpr::Primitive(Primitive::String) },
                ],
            }],
        }],
        invariants: Vec::new(),
    }
}
