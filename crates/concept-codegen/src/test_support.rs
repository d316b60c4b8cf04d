//! Shared fixtures for this crate's unit tests. Builds a manifest through
//! the real parser and generator crates so generator tests exercise the
//! same pipeline the CLI drives.

use concept_domain::ConceptManifest;

const PASSWORD_CONCEPT: &str = r#"
concept password[U] {
    state {
        stored: U -> String
    }
    actions {
        action set(user: U, password: String) {
            -> ok(user: U) { "password stored" }
        }
        action check(user: U, password: String) {
            -> ok(valid: Bool) { "password compared" }
        }
    }
    invariant {
        forall ?u: U
        after set(user: ?u, password: "secret") -> ok(user: ?u)
        then check(user: ?u, password: "secret") -> ok(valid: true)
        then check(user: ?u, password: "wrong") -> ok(valid: false)
    }
}
"#;

pub fn password_manifest() -> ConceptManifest {
    let spec = concept_parser::parse_concept(PASSWORD_CONCEPT, "password.concept").unwrap();
    concept_manifest::generate_manifest(&spec).unwrap()
}
