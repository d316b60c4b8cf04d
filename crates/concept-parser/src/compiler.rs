//! Lowers a `RawSync` into a `CompiledSync`, validating that every variable
//! a `then` invocation or `where` clause references is actually bound by an
//! earlier `when` pattern or `where` binding. Unlike a parse failure this is
//! a semantic check, so it runs after parsing and reports by sync name
//! rather than by source position.

use concept_domain::sync_spec::{CompiledSync, FieldMatch, RawSync, ThenValue, WhereClause};
use concept_domain::ParseError;
use std::collections::BTreeSet;

pub fn compile_sync(raw: RawSync) -> Result<CompiledSync, ParseError> {
    let mut bound: BTreeSet<String> = BTreeSet::new();
    for pattern in &raw.when {
        for field in pattern.input_fields.iter().chain(pattern.output_fields.iter()) {
            if let FieldMatch::Variable(v) = &field.matcher {
                bound.insert(v.clone());
            }
        }
    }

    let unbound = |cur: &str| ParseError::new(format!("sync/{}", raw.name), 0, 0, format!("references unbound variable `?{cur}`"));

    for clause in &raw.r#where {
        match clause {
            WhereClause::Bind { bind, source_variable } => {
                if !bound.contains(source_variable) {
                    return Err(unbound(source_variable));
                }
                bound.insert(bind.clone());
            }
            WhereClause::Query { bind, criteria, .. } => {
                for (_, matcher) in criteria {
                    if let FieldMatch::Variable(v) = matcher {
                        if !bound.contains(v) {
                            return Err(unbound(v));
                        }
                    }
                }
                bound.insert(bind.clone());
            }
        }
    }

    for invocation in &raw.then {
        for field in &invocation.fields {
            if let ThenValue::Variable(v) = &field.value {
                if !bound.contains(v) {
                    return Err(unbound(v));
                }
            }
        }
    }

    Ok(CompiledSync { name: raw.name, annotations: raw.annotations, when: raw.when, r#where: raw.r#where, then: raw.then })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::parse_sync_spec;

    #[test]
    fn accepts_fully_bound_sync() {
        let raw = parse_sync_spec(
            r#"sync s { when { a/b:[x: ?v] => [] } then { c/d:[y: ?v] } }"#,
            "s.sync",
        )
        .unwrap();
        assert!(compile_sync(raw).is_ok());
    }

    #[test]
    fn rejects_unbound_then_variable() {
        let raw = parse_sync_spec(r#"sync s { when { a/b:[] => [] } then { c/d:[y: ?v] } }"#, "s.sync").unwrap();
        let err = compile_sync(raw).unwrap_err();
        assert!(err.message.contains("?v"));
    }

    #[test]
    fn rejects_where_clause_referencing_unbound_source() {
        let raw = parse_sync_spec(
            r#"sync s { when { a/b:[] => [] } where { bind ?w from ?v } then { c/d:[y: ?w] } }"#,
            "s.sync",
        )
        .unwrap();
        let err = compile_sync(raw).unwrap_err();
        assert!(err.message.contains("?v"));
    }
}
