//! Turns a parsed `ConceptSpec` into a `ConceptManifest`: the canonical,
//! language-neutral description every code generator consumes.
//!
//! Pipeline: resolve every type expression, group state fields into
//! relations, derive action JSON Schemas, materialize invariant test
//! values, then emit a GraphQL schema over the resulting relations.

mod actions;
mod graphql;
mod invariants;
mod relations;
#[cfg(test)]
mod test_support;
mod types;

pub use actions::build_actions;
pub use graphql::build_graphql_schema;
pub use invariants::build_invariants;
pub use relations::build_relations;
pub use types::resolve_type;

use concept_domain::manifest::TypeParam;
use concept_domain::{ConceptManifest, ConceptSpec, ManifestError};

/// Type parameters carry no runtime representation of their own — at the
/// wire level a value of a type-parameter type is always an opaque string
/// identifier, regardless of what concrete concept eventually binds it.
const TYPE_PARAM_WIRE_TYPE: &str = "string";

pub fn generate_manifest(spec: &ConceptSpec) -> Result<ConceptManifest, ManifestError> {
    let relations = build_relations(spec)?;
    let (actions, json_schemas) = build_actions(spec)?;
    let invariants = build_invariants(&spec.invariants)?;
    let graphql_schema = build_graphql_schema(&spec.name, &relations);

    let type_params =
        spec.type_params.iter().map(|name| TypeParam { name: name.clone(), wire_type: TYPE_PARAM_WIRE_TYPE.to_string() }).collect();
    let capabilities = spec.capabilities.iter().cloned().collect();
    let gate = if spec.is_gate() { Some(true) } else { None };

    Ok(ConceptManifest {
        uri: spec.uri(),
        name: spec.name.clone(),
        version: spec.version,
        purpose: spec.purpose.clone(),
        capabilities,
        type_params,
        relations,
        actions,
        invariants,
        json_schemas,
        graphql_schema,
        gate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::echo_spec;

    #[test]
    fn generates_a_stable_manifest_for_the_echo_concept() {
        let manifest = generate_manifest(&echo_spec()).unwrap();
        assert_eq!(manifest.uri, "echo");
        assert_eq!(manifest.relations.len(), 2);
        assert_eq!(manifest.type_params, vec![TypeParam { name: "M".into(), wire_type: "string".into() }]);
        assert!(manifest.gate.is_none());
        assert_eq!(manifest.action("send").unwrap().variants[0].tag, "ok");
    }

    #[test]
    fn serializes_to_the_same_json_twice() {
        let manifest = generate_manifest(&echo_spec()).unwrap();
        let a = serde_json::to_string(&manifest).unwrap();
        let b = serde_json::to_string(&generate_manifest(&echo_spec()).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
