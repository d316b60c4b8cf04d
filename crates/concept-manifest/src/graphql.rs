//! Emits a GraphQL schema fragment for a concept's relations: one type per
//! relation plus a `Query` extension with one read field per relation.

use concept_domain::manifest::Relation;
use concept_domain::ResolvedType;

pub fn build_graphql_schema(concept_name: &str, relations: &[Relation]) -> String {
    let mut out = String::new();
    for relation in relations {
        let type_name = graphql_type_name(concept_name, &relation.name);
        out.push_str(&format!("type {type_name} {{\n  key: String!\n"));
        for field in &relation.fields {
            let gql_ty = graphql_scalar(&field.ty);
            let suffix = if field.optional { "" } else { "!" };
            out.push_str(&format!("  {}: {}{}\n", field.name, gql_ty, suffix));
        }
        out.push_str("}\n\n");
    }

    out.push_str("extend type Query {\n");
    for relation in relations {
        let type_name = graphql_type_name(concept_name, &relation.name);
        out.push_str(&format!("  {}_{}(key: String): [{}!]!\n", concept_name, relation.name, type_name));
    }
    out.push_str("}\n");
    out
}

fn graphql_type_name(concept_name: &str, relation_name: &str) -> String {
    format!("{}{}", pascal_case(concept_name), pascal_case(relation_name))
}

fn pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' || c == '-' {
            capitalize_next = true;
            continue;
        }
        if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn graphql_scalar(ty: &ResolvedType) -> String {
    match ty {
        ResolvedType::Primitive { wire } => match wire.as_str() {
            "Int" => "Int".into(),
            "Float" => "Float".into(),
            "Bool" => "Boolean".into(),
            "DateTime" => "String".into(),
            "Bytes" => "String".into(),
            _ => "String".into(),
        },
        ResolvedType::Option { element } => graphql_scalar(element),
        ResolvedType::Set { element } | ResolvedType::List { element } => format!("[{}]", graphql_scalar(element)),
        ResolvedType::Param { .. } => "String".into(),
        ResolvedType::Map { value, .. } => graphql_scalar(value),
        ResolvedType::Record { .. } => "String".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::build_relations;
    use crate::test_support::echo_spec;

    #[test]
    fn emits_a_type_per_relation_and_a_query_extension() {
        let relations = build_relations(&echo_spec()).unwrap();
        let schema = build_graphql_schema("echo", &relations);
        assert!(schema.contains("type EchoM"));
        assert!(schema.contains("type EchoMessages"));
        assert!(schema.contains("extend type Query"));
        assert!(schema.contains("echo_m(key: String)"));
    }
}
