//! Action records and flow identifiers. Shared between the action
//! log, the sync engine, the kernel, and the trace tools so none of them
//! need to depend on each other's crate just to talk about a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A flow is identified by a UUID, same as `chem-core`'s flow ids, but
/// named distinctly because a flow is causal history, not a replayable
/// step sequence.
pub type FlowId = uuid::Uuid;

/// A globally unique action record id (design note "Globally unique ids").
pub type ActionId = uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionRecordKind {
    Invocation,
    Completion,
}

impl fmt::Display for ActionRecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionRecordKind::Invocation => "invocation",
            ActionRecordKind::Completion => "completion",
        })
    }
}

/// One entry in a flow's action log.
///
/// Invariants enforced by the action log and sync engine, not by this
/// type itself:
/// - (i) every completion follows its own invocation in the same flow.
/// - (ii) `id` is globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub kind: ActionRecordKind,
    pub concept: String,
    pub action: String,
    pub input: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<serde_json::Value>,
    pub flow: FlowId,
    /// Name of the sync that produced this record, if it is an invocation
    /// emitted by one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sync: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// The completion id that caused this invocation to fire, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent: Option<ActionId>,
}

impl ActionRecord {
    pub fn is_completion(&self) -> bool {
        matches!(self.kind, ActionRecordKind::Completion)
    }

    pub fn is_invocation(&self) -> bool {
        matches!(self.kind, ActionRecordKind::Invocation)
    }

    /// `(concept, action)` — the key the sync engine's trigger index is
    /// built on.
    pub fn trigger_key(&self) -> (&str, &str) {
        (self.concept.as_str(), self.action.as_str())
    }
}
