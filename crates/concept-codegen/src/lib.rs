//! Pure code generators: each target language turns a `ConceptManifest`
//! into a bundle of source files. No generator performs I/O or retains
//! state between calls — callers decide whether and where to write the
//! returned files.

mod generator;
mod naming;
mod py;
#[cfg(test)]
mod test_support;
mod ts;

pub use generator::{GeneratedFile, Generator};
pub use py::PythonGenerator;
pub use ts::TypeScriptGenerator;

use concept_domain::{ConceptManifest, GeneratorError};

/// Every generator this crate ships, in a stable order.
pub fn all_generators() -> Vec<Box<dyn Generator>> {
    vec![Box::new(TypeScriptGenerator), Box::new(PythonGenerator)]
}

/// Runs every generator over one manifest, short-circuiting on the first
/// generator that cannot represent a manifest feature.
pub fn generate_all(manifest: &ConceptManifest) -> Result<Vec<(String, Vec<GeneratedFile>)>, GeneratorError> {
    all_generators().into_iter().map(|g| Ok((g.target().to_string(), g.generate(manifest)?))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::password_manifest;

    #[test]
    fn every_generator_agrees_on_the_conformance_literals() {
        let manifest = password_manifest();
        let bundles = generate_all(&manifest).unwrap();
        for (_, files) in &bundles {
            let conformance = files.iter().find(|f| f.path.contains("conformance")).unwrap();
            assert!(conformance.content.contains("u-test-invariant-001"));
            assert!(conformance.content.contains("secret"));
            assert!(conformance.content.contains("wrong"));
        }
    }
}
