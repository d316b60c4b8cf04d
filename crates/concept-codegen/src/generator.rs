//! The shared generator contract: a pure function from a manifest to a
//! bundle of target-language files. No generator touches a filesystem or
//! holds state between calls.

use concept_domain::{ConceptManifest, GeneratorError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

pub trait Generator {
    /// Short identifier used in `GeneratorError::target`, e.g. `"typescript"`.
    fn target(&self) -> &'static str;

    /// Produces the bundle for one concept manifest: types, a handler
    /// interface, a transport adapter, and — only when the manifest has
    /// invariants — a conformance test file.
    fn generate(&self, manifest: &ConceptManifest) -> Result<Vec<GeneratedFile>, GeneratorError>;
}
