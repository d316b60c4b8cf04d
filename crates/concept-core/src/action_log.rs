//! The append-only, flow-scoped action log. Grounded directly on
//! `chem-core`'s `EventStore`/`InMemoryEventStore`: a trait with an
//! in-memory backing, append-only, replay gives the full history back in
//! order. The difference is what gets appended — `ActionRecord`s
//! (invocations and completions) instead of flow step events — and that
//! causal edges between records are tracked explicitly, since the sync
//! engine and the trace tools both need to walk "what caused what"
//! without re-deriving it from timestamps.
//!
//! `append` is specified as durable-on-return: callers may assume a
//! record is recoverable after this call returns. The in-memory
//! implementation here satisfies that trivially; a persistent
//! implementation (e.g. backed by Postgres) must commit before
//! returning.

use concept_domain::action_log::ActionId;
use concept_domain::{ActionRecord, ActionRecordKind, FlowId};
use dashmap::DashMap;
use serde_json::Value;

pub trait ActionLog: Send + Sync {
    /// Appends a fully-formed record and returns its id.
    fn append(&self, record: ActionRecord) -> ActionId;

    fn append_invocation(
        &self,
        concept: &str,
        action: &str,
        input: Value,
        flow: FlowId,
        sync: Option<String>,
        parent: Option<ActionId>,
    ) -> ActionRecord;

    fn append_completion(&self, invocation: &ActionRecord, variant: String, output: Value) -> ActionRecord;

    /// Records a causal edge from `parent` to `child`, in addition to
    /// whatever `child.parent` already encodes — the trace tools walk
    /// this index rather than re-scanning every record's `parent` field.
    fn add_edge(&self, parent: ActionId, child: ActionId);

    /// Every record in `flow`, ordered by `(timestamp, id)` — id is the
    /// tiebreaker when two records share a timestamp, never the reverse.
    fn load_flow(&self, flow: FlowId) -> Vec<ActionRecord>;

    fn children_of(&self, parent: ActionId) -> Vec<ActionId>;
}

#[derive(Debug, Default)]
pub struct InMemoryActionLog {
    by_flow: DashMap<FlowId, Vec<ActionRecord>>,
    edges: DashMap<ActionId, Vec<ActionId>>,
}

impl InMemoryActionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionLog for InMemoryActionLog {
    fn append(&self, record: ActionRecord) -> ActionId {
        let id = record.id;
        let flow = record.flow;
        if let Some(parent) = record.parent {
            self.add_edge(parent, id);
        }
        self.by_flow.entry(flow).or_default().push(record);
        id
    }

    fn append_invocation(
        &self,
        concept: &str,
        action: &str,
        input: Value,
        flow: FlowId,
        sync: Option<String>,
        parent: Option<ActionId>,
    ) -> ActionRecord {
        let record = ActionRecord {
            id: uuid::Uuid::new_v4(),
            kind: ActionRecordKind::Invocation,
            concept: concept.to_string(),
            action: action.to_string(),
            input,
            variant: None,
            output: None,
            flow,
            sync,
            timestamp: chrono::Utc::now(),
            parent,
        };
        self.append(record.clone());
        record
    }

    fn append_completion(&self, invocation: &ActionRecord, variant: String, output: Value) -> ActionRecord {
        let record = ActionRecord {
            id: uuid::Uuid::new_v4(),
            kind: ActionRecordKind::Completion,
            concept: invocation.concept.clone(),
            action: invocation.action.clone(),
            input: invocation.input.clone(),
            variant: Some(variant),
            output: Some(output),
            flow: invocation.flow,
            sync: invocation.sync.clone(),
            timestamp: chrono::Utc::now(),
            parent: Some(invocation.id),
        };
        self.append(record.clone());
        record
    }

    fn add_edge(&self, parent: ActionId, child: ActionId) {
        self.edges.entry(parent).or_default().push(child);
    }

    fn load_flow(&self, flow: FlowId) -> Vec<ActionRecord> {
        let mut records = self.by_flow.get(&flow).map(|e| e.clone()).unwrap_or_default();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        records
    }

    fn children_of(&self, parent: ActionId) -> Vec<ActionId> {
        self.edges.get(&parent).map(|e| e.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invocation_then_completion_round_trips_through_load_flow() {
        let log = InMemoryActionLog::new();
        let flow = FlowId::new_v4();
        let inv = log.append_invocation("echo", "send", json!({"id": "m1"}), flow, None, None);
        let comp = log.append_completion(&inv, "ok".into(), json!({"echo": "hi"}));

        let records = log.load_flow(flow);
        assert_eq!(records.len(), 2);
        assert!(records[0].is_invocation());
        assert!(records[1].is_completion());
        assert_eq!(records[1].parent, Some(inv.id));
        assert_eq!(log.children_of(inv.id), vec![comp.id]);
    }

    #[test]
    fn flows_are_isolated_from_each_other() {
        let log = InMemoryActionLog::new();
        let a = FlowId::new_v4();
        let b = FlowId::new_v4();
        log.append_invocation("echo", "send", json!({}), a, None, None);
        log.append_invocation("echo", "send", json!({}), b, None, None);
        assert_eq!(log.load_flow(a).len(), 1);
        assert_eq!(log.load_flow(b).len(), 1);
    }
}
