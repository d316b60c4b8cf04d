//! Materializes deterministic test values for each invariant's free
//! variables and lowers its `after`/`then` patterns into manifest
//! invariant steps.
//!
//! Test-value rule: the i-th free variable (1-indexed, declaration order)
//! gets `{prefix}-test-invariant-{NNN}`, where `prefix` is the lowercased
//! first letter of its bound type parameter and `NNN` is `i` zero-padded to
//! three digits. This is a hard contract: every code generator must emit
//! the identical literal for the same position, so conformance suites
//! across target languages assert the same facts.

use concept_domain::concept_spec::{ArgBinding, Invariant, InvariantPattern};
use concept_domain::manifest::{FreeVariableBinding, InvariantStep, ManifestInvariant};
use concept_domain::ManifestError;
use std::collections::BTreeMap;

pub fn build_invariants(invariants: &[Invariant]) -> Result<Vec<ManifestInvariant>, ManifestError> {
    invariants.iter().map(build_invariant).collect()
}

fn build_invariant(invariant: &Invariant) -> Result<ManifestInvariant, ManifestError> {
    let mut bindings = Vec::with_capacity(invariant.free_variables.len());
    let mut substitution = BTreeMap::new();
    for (i, fv) in invariant.free_variables.iter().enumerate() {
        let prefix = fv.bound_param.chars().next().map(|c| c.to_ascii_lowercase()).unwrap_or('x');
        let test_value = format!("{prefix}-test-invariant-{:03}", i + 1);
        substitution.insert(fv.name.clone(), test_value.clone());
        bindings.push(FreeVariableBinding { name: fv.name.clone(), test_value });
    }

    let setup = invariant.after_patterns.iter().map(|p| lower_pattern(p, &substitution)).collect();
    let assertions = invariant.then_patterns.iter().map(|p| lower_pattern(p, &substitution)).collect();
    let description = describe(invariant);

    Ok(ManifestInvariant { description, free_variables: bindings, setup, assertions })
}

fn lower_pattern(pattern: &InvariantPattern, substitution: &BTreeMap<String, String>) -> InvariantStep {
    let mut seen = std::collections::BTreeSet::new();
    let field_equalities = pattern
        .arg_bindings
        .iter()
        .filter(|(name, _)| seen.insert(name.clone()))
        .map(|(name, binding)| {
            let value = match binding {
                ArgBinding::Literal(v) => v.clone(),
                ArgBinding::Variable(var) => match substitution.get(var) {
                    Some(test_value) => serde_json::Value::String(test_value.clone()),
                    None => serde_json::Value::String(var.clone()),
                },
            };
            (name.clone(), value)
        })
        .collect();
    InvariantStep { action: pattern.action.clone(), expected_variant: pattern.variant_name.clone(), field_equalities }
}

fn describe(invariant: &Invariant) -> String {
    let after: Vec<String> = invariant.after_patterns.iter().map(|p| format!("{} -> {}", p.action, p.variant_name)).collect();
    let then: Vec<String> = invariant.then_patterns.iter().map(|p| format!("{} -> {}", p.action, p.variant_name)).collect();
    format!("after {}, then {}", after.join("; "), then.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use concept_domain::concept_spec::FreeVariable;

    fn password_invariant() -> Invariant {
        Invariant {
            free_variables: vec![FreeVariable { name: "u".into(), bound_param: "U".into() }],
            after_patterns: vec![InvariantPattern {
                action: "set".into(),
                variant_name: "ok".into(),
                arg_bindings: vec![("user".into(), ArgBinding::Variable("u".into())), ("password".into(), ArgBinding::Literal("secret".into()))],
            }],
            then_patterns: vec![
                InvariantPattern {
                    action: "check".into(),
                    variant_name: "ok".into(),
                    arg_bindings: vec![
                        ("user".into(), ArgBinding::Variable("u".into())),
                        ("password".into(), ArgBinding::Literal("secret".into())),
                        ("valid".into(), ArgBinding::Literal(true.into())),
                    ],
                },
                InvariantPattern {
                    action: "check".into(),
                    variant_name: "ok".into(),
                    arg_bindings: vec![
                        ("user".into(), ArgBinding::Variable("u".into())),
                        ("password".into(), ArgBinding::Literal("wrong".into())),
                        ("valid".into(), ArgBinding::Literal(false.into())),
                    ],
                },
            ],
        }
    }

    #[test]
    fn derives_the_documented_password_test_value() {
        let manifest_invariants = build_invariants(&[password_invariant()]).unwrap();
        assert_eq!(manifest_invariants[0].free_variables[0].test_value, "u-test-invariant-001");
        let setup = &manifest_invariants[0].setup[0];
        assert_eq!(setup.field_equalities[0], ("user".into(), serde_json::Value::String("u-test-invariant-001".into())));
        let assertions = &manifest_invariants[0].assertions;
        assert_eq!(assertions[0].field_equalities[2], ("valid".into(), serde_json::Value::Bool(true)));
        assert_eq!(assertions[1].field_equalities[2], ("valid".into(), serde_json::Value::Bool(false)));
    }
}
