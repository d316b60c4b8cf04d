//! Kernel-level errors. Everything that can go wrong inside a concept or
//! a transport already has a shape in `concept_domain::error`; this enum
//! only adds the failure modes that belong to composition: registering
//! concepts and syncs, routing a request to an unknown concept.

use concept_domain::{SyncFailure, TransportError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("concept `{0}` is already registered")]
    DuplicateConcept(String),
    #[error("sync `{0}` is already registered")]
    DuplicateSync(String),
    #[error("no concept registered at `{0}`")]
    UnknownConcept(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Sync(#[from] SyncFailure),
}
