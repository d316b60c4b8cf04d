//! Groups a concept's state fields into manifest relations.
//!
//! A field typed `K -> V` where `K` is a type parameter is co-keyed on `K`;
//! every such field sharing the same `K` merges into one relation named
//! after the lowercased parameter. A field typed `set T` (`T` a type
//! parameter) becomes its own set-valued relation, named after the field
//! itself, with no value fields beyond membership.
//!
//! A field that references no type parameter as its key (a plain scalar)
//! has nowhere natural to live, so it is grouped into one implicit relation
//! named after the concept, keyed by the concept's first declared type
//! parameter, or `id` if the concept declares none.

use crate::types::resolve_type;
use concept_domain::manifest::{Relation, RelationField, RelationSource};
use concept_domain::{ConceptSpec, ManifestError, ResolvedType, TypeExpr};
use std::collections::BTreeMap;

pub fn build_relations(spec: &ConceptSpec) -> Result<Vec<Relation>, ManifestError> {
    let mut merged: BTreeMap<String, Vec<RelationField>> = BTreeMap::new();
    let mut set_valued = Vec::new();
    let mut scalar = Vec::new();

    for field in &spec.state {
        match &field.ty {
            TypeExpr::Map(key, value) => {
                if let TypeExpr::Param(key_param) = key.as_ref() {
                    let resolved_value = resolve_type(value, &spec.type_params)?;
                    let optional = matches!(resolved_value, ResolvedType::Option { .. });
                    merged.entry(key_param.to_lowercase()).or_default().push(RelationField {
                        name: field.name.clone(),
                        ty: resolved_value,
                        optional,
                    });
                    continue;
                }
                scalar.push(field);
            }
            TypeExpr::Set(inner) if matches!(inner.as_ref(), TypeExpr::Param(_)) => {
                let TypeExpr::Param(key_param) = inner.as_ref() else { unreachable!() };
                set_valued.push(Relation {
                    name: field.name.clone(),
                    source: RelationSource::SetValued,
                    key_field: key_param.clone(),
                    fields: Vec::new(),
                });
            }
            _ => scalar.push(field),
        }
    }

    let mut relations: Vec<Relation> = merged
        .into_iter()
        .map(|(key_param_lower, fields)| {
            let key_field = spec
                .type_params
                .iter()
                .find(|p| p.to_lowercase() == key_param_lower)
                .cloned()
                .unwrap_or(key_param_lower.clone());
            Relation { name: key_param_lower, source: RelationSource::Merged, key_field, fields }
        })
        .collect();
    relations.extend(set_valued);

    if !scalar.is_empty() {
        let key_field = spec.type_params.first().cloned().unwrap_or_else(|| "id".to_string());
        let mut fields = Vec::with_capacity(scalar.len());
        for field in scalar {
            let resolved = resolve_type(&field.ty, &spec.type_params)?;
            let optional = matches!(resolved, ResolvedType::Option { .. });
            fields.push(RelationField { name: field.name.clone(), ty: resolved, optional });
        }
        relations.push(Relation { name: spec.name.to_lowercase(), source: RelationSource::Merged, key_field, fields });
    }

    relations.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::echo_spec;

    #[test]
    fn groups_echo_state_into_messages_and_m_relations() {
        let relations = build_relations(&echo_spec()).unwrap();
        let names: Vec<_> = relations.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["m", "messages"]);
        let m = relations.iter().find(|r| r.name == "m").unwrap();
        assert_eq!(m.key_field, "M");
        assert_eq!(m.fields.len(), 1);
        assert_eq!(m.fields[0].name, "text");
        let messages = relations.iter().find(|r| r.name == "messages").unwrap();
        assert_eq!(messages.source, RelationSource::SetValued);
        assert_eq!(messages.key_field, "M");
    }
}
