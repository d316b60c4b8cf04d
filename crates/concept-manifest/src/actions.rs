//! Derives `ManifestAction` entries and their JSON Schemas from a concept's
//! action declarations, rejecting duplicate action names and duplicate
//! variant tags within one action.

use crate::types::resolve_type;
use concept_domain::manifest::{JsonSchemas, ManifestAction, ManifestVariant, RelationField};
use concept_domain::{ConceptSpec, ManifestError};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

pub fn build_actions(spec: &ConceptSpec) -> Result<(Vec<ManifestAction>, JsonSchemas), ManifestError> {
    let mut seen_actions = BTreeSet::new();
    let mut actions = Vec::with_capacity(spec.actions.len());
    let mut invocations = BTreeMap::new();
    let mut completions = BTreeMap::new();

    for action in &spec.actions {
        if !seen_actions.insert(action.name.clone()) {
            return Err(ManifestError::DuplicateAction(action.name.clone()));
        }

        let mut params = Vec::with_capacity(action.params.len());
        for p in &action.params {
            let ty = resolve_type(&p.ty, &spec.type_params)?;
            let optional = matches!(ty, concept_domain::ResolvedType::Option { .. });
            params.push(RelationField { name: p.name.clone(), ty, optional });
        }
        invocations.insert(action.name.clone(), fields_schema(&params));

        let mut seen_tags = BTreeSet::new();
        let mut variants = Vec::with_capacity(action.variants.len());
        let mut variant_schemas = BTreeMap::new();
        for variant in &action.variants {
            if !seen_tags.insert(variant.tag.clone()) {
                return Err(ManifestError::DuplicateVariant(action.name.clone(), variant.tag.clone()));
            }
            let mut fields = Vec::with_capacity(variant.params.len());
            for p in &variant.params {
                let ty = resolve_type(&p.ty, &spec.type_params)?;
                let optional = matches!(ty, concept_domain::ResolvedType::Option { .. });
                fields.push(RelationField { name: p.name.clone(), ty, optional });
            }
            variant_schemas.insert(variant.tag.clone(), completion_schema(&variant.tag, &fields));
            variants.push(ManifestVariant { tag: variant.tag.clone(), fields });
        }
        completions.insert(action.name.clone(), variant_schemas);
        actions.push(ManifestAction { name: action.name.clone(), params, variants });
    }

    Ok((actions, JsonSchemas { invocations, completions }))
}

fn fields_schema(fields: &[RelationField]) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for f in fields {
        properties.insert(f.name.clone(), f.ty.json_schema());
        if !f.optional {
            required.push(Value::String(f.name.clone()));
        }
    }
    json!({ "type": "object", "properties": Value::Object(properties), "required": required })
}

fn completion_schema(tag: &str, fields: &[RelationField]) -> Value {
    let mut schema = fields_schema(fields);
    let obj = schema.as_object_mut().expect("fields_schema always returns an object");
    let properties = obj.get_mut("properties").and_then(Value::as_object_mut).expect("object schema always has properties");
    properties.insert("variant".into(), json!({ "const": tag }));
    let required = obj.get_mut("required").and_then(Value::as_array_mut).expect("object schema always has required");
    required.push(Value::String("variant".into()));
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::echo_spec;

    #[test]
    fn derives_invocation_and_completion_schemas() {
        let (actions, schemas) = build_actions(&echo_spec()).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].variants[0].tag, "ok");
        let invocation = schemas.invocations.get("send").unwrap();
        assert_eq!(invocation["type"], "object");
        let completion = schemas.completions.get("send").unwrap().get("ok").unwrap();
        assert_eq!(completion["properties"]["variant"], json!({ "const": "ok" }));
    }

    #[test]
    fn rejects_duplicate_action_names() {
        let mut spec = echo_spec();
        let dup = spec.actions[0].clone();
        spec.actions.push(dup);
        let err = build_actions(&spec).unwrap_err();
        assert_eq!(err, ManifestError::DuplicateAction("send".into()));
    }
}
