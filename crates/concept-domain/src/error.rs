//! The error taxonomy. Each variant here is a distinct failure mode
//! with its own propagation rule; callers should match on the concrete
//! type rather than a blanket `Box<dyn Error>` so those propagation rules
//! stay enforceable at the type level.

use thiserror::Error;

/// Spec or sync source is malformed. Parse failures report file,
/// line, column, and a one-sentence diagnostic; partial ASTs are never
/// returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{file}:{line}:{column}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(file: impl Into<String>, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { file: file.into(), line, column, message: message.into() }
    }
}

/// Type resolution failure, duplicate action name, unknown type parameter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("unknown type parameter `{0}`")]
    UnknownTypeParam(String),
    #[error("duplicate action name `{0}`")]
    DuplicateAction(String),
    #[error("duplicate variant tag `{1}` on action `{0}`")]
    DuplicateVariant(String, String),
    #[error("invariant free variable `{0}` is not bound to a declared type parameter")]
    UnboundFreeVariable(String),
    #[error("invariant pattern references unknown action `{0}`")]
    UnknownAction(String),
}

/// A target language cannot represent a manifest feature.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("generator `{target}` cannot represent: {feature}")]
pub struct GeneratorError {
    pub target: String,
    pub feature: String,
}

/// Invocation could not be delivered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transport error dispatching {concept}/{action}: {cause}")]
pub struct TransportError {
    pub concept: String,
    pub action: String,
    pub cause: String,
}

/// A `put` conflicts and the policy declines both sides. Rare:
/// the default policy is `accept-incoming`, so this only surfaces when a
/// conflict callback explicitly refuses to resolve.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("storage conflict on {relation}/{key}: {reason}")]
pub struct StorageConflictError {
    pub relation: String,
    pub key: String,
    pub reason: String,
}

/// A where-clause could not be resolved. Recorded as a conflict
/// and drained separately; does not abort the flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("sync `{sync}` where-clause unresolved for flow {flow}: {reason}")]
pub struct SyncFailure {
    pub sync: String,
    pub flow: uuid::Uuid,
    pub reason: String,
}

/// A conformance test assertion failed; discovered only in generated tests,
/// never raised by the core itself. Kept here so generators can
/// reference one shared shape across target languages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invariant `{invariant}` violated: expected {expected}, got {actual}")]
pub struct InvariantViolation {
    pub invariant: String,
    pub expected: String,
    pub actual: String,
}
