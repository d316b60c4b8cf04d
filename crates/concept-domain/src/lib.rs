//! concept-domain: language-neutral data model shared by the parser,
//! manifest generator, code generators, and runtime.
//!
//! Modules:
//! - `type_expr`: source-level type expressions and their resolved form.
//! - `concept_spec`: AST produced by the concept parser.
//! - `sync_spec`: AST and compiled form produced by the sync parser.
//! - `manifest`: the language-neutral concept manifest.
//! - `action_log`: action records and flow identifiers shared by the kernel,
//!   the sync engine, and the trace tools.
//! - `error`: the error taxonomy.

pub mod action_log;
pub mod concept_spec;
pub mod error;
pub mod manifest;
pub mod sync_spec;
pub mod type_expr;

pub use action_log::{ActionRecord, ActionRecordKind, FlowId};
pub use concept_spec::{
    Action, Annotation, ArgBinding, ConceptSpec, FreeVariable, Invariant, InvariantPattern, StateField, Variant,
};
pub use error::{
    GeneratorError, InvariantViolation, ManifestError, ParseError, StorageConflictError, SyncFailure,
    TransportError,
};
pub use manifest::{
    ConceptManifest, FreeVariableBinding, InvariantStep, JsonSchemas, ManifestAction, ManifestInvariant,
    ManifestVariant, Relation, RelationField, RelationSource, TypeParam,
};
pub use sync_spec::{
    CompiledSync, FieldMatch, MatchedField, RawSync, SyncAnnotation, ThenField, ThenInvocation, ThenValue,
    WhenPattern, WhereClause,
};
pub use type_expr::{ResolvedType, TypeExpr};
