//! Joins a flow's raw action-log records to the static entities that
//! defined them — concepts, concept actions, and syncs — producing one
//! summary: how many invocations fired, how many completed, which syncs
//! fired, and an overall status.
//!
//! Status starts from the completions actually recorded: `Failed` if
//! any completion carries the `error` variant, `Completed` otherwise.
//! A record that names a concept, action, or sync the catalog doesn't
//! know about is an unresolvable static reference — dead code, or a
//! log from before a concept/sync was renamed or removed — and
//! downgrades an otherwise-`Completed` flow to `Partial`, with the
//! unresolved names returned to the caller rather than silently
//! dropped.

use concept_domain::{ActionRecord, CompiledSync, ConceptManifest, FlowId};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Completed,
    Failed,
    Partial,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowSummary {
    pub flow: FlowId,
    pub status: FlowStatus,
    pub invocation_count: usize,
    pub completion_count: usize,
    pub syncs_fired: Vec<String>,
    /// Concept/action/sync names referenced by the log with no matching
    /// entry in the static catalog passed to `correlate`.
    pub unresolved_references: Vec<String>,
}

const ERROR_VARIANT: &str = "error";

pub fn correlate(
    flow: FlowId,
    records: &[ActionRecord],
    concepts: &[ConceptManifest],
    syncs: &[CompiledSync],
) -> FlowSummary {
    let invocation_count = records.iter().filter(|r| r.is_invocation()).count();
    let completion_count = records.iter().filter(|r| r.is_completion()).count();
    let syncs_fired: BTreeSet<String> = records.iter().filter_map(|r| r.sync.clone()).collect();

    let known_concepts: HashSet<&str> = concepts.iter().map(|c| c.uri.as_str()).collect();
    let known_actions: HashSet<(&str, &str)> =
        concepts.iter().flat_map(|c| c.actions.iter().map(move |a| (c.uri.as_str(), a.name.as_str()))).collect();
    let known_syncs: HashSet<&str> = syncs.iter().map(|s| s.name.as_str()).collect();

    let mut unresolved: BTreeSet<String> = BTreeSet::new();
    for r in records {
        if !known_concepts.contains(r.concept.as_str()) {
            unresolved.insert(format!("concept {}", r.concept));
        } else if !known_actions.contains(&(r.concept.as_str(), r.action.as_str())) {
            unresolved.insert(format!("action {}/{}", r.concept, r.action));
        }
        if let Some(sync) = &r.sync {
            if !known_syncs.contains(sync.as_str()) {
                unresolved.insert(format!("sync {sync}"));
            }
        }
    }

    let has_error_completion = records.iter().any(|r| r.is_completion() && r.variant.as_deref() == Some(ERROR_VARIANT));

    let status = if has_error_completion {
        FlowStatus::Failed
    } else if !unresolved.is_empty() {
        FlowStatus::Partial
    } else {
        FlowStatus::Completed
    };

    FlowSummary {
        flow,
        status,
        invocation_count,
        completion_count,
        syncs_fired: syncs_fired.into_iter().collect(),
        unresolved_references: unresolved.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concept_domain::action_log::ActionId;
    use concept_domain::ActionRecordKind;
    use concept_domain::ManifestAction;
    use serde_json::json;

    fn record(kind: ActionRecordKind, flow: FlowId, concept: &str, action: &str, variant: Option<&str>, sync: Option<&str>) -> ActionRecord {
        ActionRecord {
            id: ActionId::new_v4(),
            kind,
            concept: concept.into(),
            action: action.into(),
            input: json!({}),
            variant: variant.map(String::from),
            output: matches!(kind, ActionRecordKind::Completion).then(|| json!({})),
            flow,
            sync: sync.map(String::from),
            timestamp: chrono::Utc::now(),
            parent: None,
        }
    }

    fn manifest_with_action(uri: &str, action: &str) -> ConceptManifest {
        ConceptManifest {
            uri: uri.into(),
            name: uri.into(),
            version: 1,
            purpose: None,
            capabilities: vec![],
            type_params: vec![],
            relations: vec![],
            actions: vec![ManifestAction { name: action.into(), params: vec![], variants: vec![] }],
            invariants: vec![],
            json_schemas: Default::default(),
            graphql_schema: String::new(),
            gate: None,
        }
    }

    #[test]
    fn a_fully_completed_flow_with_known_entities_is_completed() {
        let flow = FlowId::new_v4();
        let records = vec![
            record(ActionRecordKind::Invocation, flow, "echo", "send", None, None),
            record(ActionRecordKind::Completion, flow, "echo", "send", Some("ok"), None),
        ];
        let concepts = vec![manifest_with_action("echo", "send")];
        let summary = correlate(flow, &records, &concepts, &[]);
        assert_eq!(summary.status, FlowStatus::Completed);
        assert!(summary.unresolved_references.is_empty());
    }

    #[test]
    fn an_error_variant_completion_marks_the_flow_failed() {
        let flow = FlowId::new_v4();
        let records = vec![
            record(ActionRecordKind::Invocation, flow, "echo", "send", None, None),
            record(ActionRecordKind::Completion, flow, "echo", "send", Some("error"), None),
        ];
        let concepts = vec![manifest_with_action("echo", "send")];
        let summary = correlate(flow, &records, &concepts, &[]);
        assert_eq!(summary.status, FlowStatus::Failed);
    }

    #[test]
    fn a_record_for_an_unknown_concept_downgrades_an_otherwise_complete_flow_to_partial() {
        let flow = FlowId::new_v4();
        let records = vec![
            record(ActionRecordKind::Invocation, flow, "echo", "send", None, None),
            record(ActionRecordKind::Completion, flow, "echo", "send", Some("ok"), None),
        ];
        // No catalog entries at all: "echo" is unresolvable.
        let summary = correlate(flow, &records, &[], &[]);
        assert_eq!(summary.status, FlowStatus::Partial);
        assert_eq!(summary.unresolved_references, vec!["concept echo".to_string()]);
    }

    #[test]
    fn a_record_naming_an_unknown_sync_is_reported_as_unresolved() {
        let flow = FlowId::new_v4();
        let records = vec![record(ActionRecordKind::Invocation, flow, "echo", "send", None, Some("ghost_sync"))];
        let concepts = vec![manifest_with_action("echo", "send")];
        let syncs: Vec<CompiledSync> = vec![];
        let summary = correlate(flow, &records, &concepts, &syncs);
        assert_eq!(summary.status, FlowStatus::Partial);
        assert_eq!(summary.unresolved_references, vec!["sync ghost_sync".to_string()]);
    }

    #[test]
    fn an_error_completion_alongside_an_unresolved_reference_stays_failed() {
        let flow = FlowId::new_v4();
        let records = vec![
            record(ActionRecordKind::Invocation, flow, "echo", "send", None, None),
            record(ActionRecordKind::Completion, flow, "echo", "send", Some("error"), None),
        ];
        // No catalog: every record is unresolved, but a real failure should not be hidden by it.
        let summary = correlate(flow, &records, &[], &[]);
        assert_eq!(summary.status, FlowStatus::Failed);
        assert!(!summary.unresolved_references.is_empty());
    }
}
