//! Rebuilds a causal tree out of a flow's flat action log.
//!
//! An `ActionRecord.parent` already encodes one edge each: a completion
//! points at its own invocation, and a sync-fired invocation points at
//! the completion that triggered it. Walking those edges turns the flat,
//! timestamp-ordered log back into the tree a human actually wants to
//! read — one root per externally-triggered invocation, with the syncs
//! it set off nested underneath.

use concept_domain::action_log::ActionId;
use concept_domain::ActionRecord;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize)]
pub struct GateInfo {
    pub pending: bool,
    pub wait_description: Option<String>,
    /// The triggering invocation's input fields, carried on the gate node
    /// while it's outstanding so a viewer can see what it's waiting on.
    pub fields: Value,
    /// Reserved for a future streaming-progress wire extension; no
    /// current record kind carries incremental progress.
    pub progress: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceNode {
    pub record: ActionRecord,
    pub children: Vec<TraceNode>,
    pub gate: Option<GateInfo>,
}

pub fn build_trace(records: &[ActionRecord]) -> Vec<TraceNode> {
    let by_id: HashMap<ActionId, &ActionRecord> = records.iter().map(|r| (r.id, r)).collect();
    let mut children: HashMap<ActionId, Vec<ActionId>> = HashMap::new();
    for r in records {
        if let Some(parent) = r.parent {
            children.entry(parent).or_default().push(r.id);
        }
    }
    for kids in children.values_mut() {
        kids.sort_by_key(|id| by_id[id].timestamp);
    }

    let mut roots: Vec<ActionId> =
        records.iter().filter(|r| r.parent.is_none() && r.is_invocation()).map(|r| r.id).collect();
    roots.sort_by_key(|id| by_id[id].timestamp);
    roots.into_iter().map(|id| build_node(id, &by_id, &children)).collect()
}

fn build_node(id: ActionId, by_id: &HashMap<ActionId, &ActionRecord>, children: &HashMap<ActionId, Vec<ActionId>>) -> TraceNode {
    let record = (*by_id.get(&id).expect("id came from by_id's own keys")).clone();
    let kid_ids = children.get(&id).cloned().unwrap_or_default();
    TraceNode {
        record,
        children: kid_ids.into_iter().map(|c| build_node(c, by_id, children)).collect(),
        gate: None,
    }
}

/// Marks every invocation node whose concept is in `gate_concepts`.
/// An invocation with no completion child yet is pending. Once its
/// completion arrives, `wait_description` is read out of the
/// completion's own `description` output field rather than synthesized.
pub fn annotate_gates(nodes: &mut [TraceNode], gate_concepts: &HashSet<String>) {
    for node in nodes {
        if node.record.is_invocation() && gate_concepts.contains(&node.record.concept) {
            let completion = node.children.iter().find(|c| c.record.is_completion());
            let wait_description = completion.and_then(|c| {
                c.record.output.as_ref()?.get("description")?.as_str().map(str::to_string)
            });
            node.gate = Some(GateInfo {
                pending: completion.is_none(),
                wait_description,
                fields: node.record.input.clone(),
                progress: None,
            });
        }
        annotate_gates(&mut node.children, gate_concepts);
    }
}

/// Keeps only the paths that lead to a gate node, pruning everything
/// else — the view a human asks for when they only care about what's
/// blocking a flow.
pub fn filter_gates(nodes: &[TraceNode]) -> Vec<TraceNode> {
    nodes.iter().filter_map(filter_node).collect()
}

fn filter_node(node: &TraceNode) -> Option<TraceNode> {
    let children: Vec<TraceNode> = node.children.iter().filter_map(filter_node).collect();
    if node.gate.is_some() || !children.is_empty() {
        Some(TraceNode { record: node.record.clone(), children, gate: node.gate.clone() })
    } else {
        None
    }
}

pub fn render_json(nodes: &[TraceNode]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use concept_domain::{ActionRecordKind, FlowId};
    use serde_json::json;

    fn record(id: ActionId, kind: ActionRecordKind, concept: &str, parent: Option<ActionId>, flow: FlowId) -> ActionRecord {
        ActionRecord {
            id,
            kind,
            concept: concept.into(),
            action: "act".into(),
            input: json!({}),
            variant: matches!(kind, ActionRecordKind::Completion).then(|| "ok".to_string()),
            output: matches!(kind, ActionRecordKind::Completion).then(|| json!({})),
            flow,
            sync: None,
            timestamp: chrono::Utc::now(),
            parent,
        }
    }

    #[test]
    fn builds_a_root_with_its_completion_and_a_sync_fired_child() {
        let flow = FlowId::new_v4();
        let root_inv = ActionId::new_v4();
        let root_comp = ActionId::new_v4();
        let child_inv = ActionId::new_v4();

        let records = vec![
            record(root_inv, ActionRecordKind::Invocation, "echo", None, flow),
            record(root_comp, ActionRecordKind::Completion, "echo", Some(root_inv), flow),
            record(child_inv, ActionRecordKind::Invocation, "notify", Some(root_comp), flow),
        ];

        let tree = build_trace(&records);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].record.id, root_inv);
        assert_eq!(tree[0].children[0].record.id, root_comp);
        assert_eq!(tree[0].children[0].children[0].record.id, child_inv);
    }

    #[test]
    fn pending_gate_has_no_completion_child() {
        let flow = FlowId::new_v4();
        let inv = ActionId::new_v4();
        let records = vec![record(inv, ActionRecordKind::Invocation, "bridge", None, flow)];

        let mut tree = build_trace(&records);
        annotate_gates(&mut tree, &["bridge".to_string()].into_iter().collect());
        assert!(tree[0].gate.as_ref().unwrap().pending);
    }

    #[test]
    fn pending_gate_carries_the_invocation_input_under_fields() {
        let flow = FlowId::new_v4();
        let inv = ActionId::new_v4();
        let mut records = vec![record(inv, ActionRecordKind::Invocation, "bridge", None, flow)];
        records[0].input = json!({"txHash": "0xabc"});

        let mut tree = build_trace(&records);
        annotate_gates(&mut tree, &["bridge".to_string()].into_iter().collect());
        assert_eq!(tree[0].gate.as_ref().unwrap().fields, json!({"txHash": "0xabc"}));
    }

    #[test]
    fn completed_gate_reads_wait_description_off_the_completion_output() {
        let flow = FlowId::new_v4();
        let inv = ActionId::new_v4();
        let comp = ActionId::new_v4();
        let mut records = vec![
            record(inv, ActionRecordKind::Invocation, "chain-monitor", None, flow),
            record(comp, ActionRecordKind::Completion, "chain-monitor", Some(inv), flow),
        ];
        records[1].output = Some(json!({"description": "Arbitrum batch #4891 posted to L1"}));

        let mut tree = build_trace(&records);
        annotate_gates(&mut tree, &["chain-monitor".to_string()].into_iter().collect());
        let gate = tree[0].gate.as_ref().unwrap();
        assert!(!gate.pending);
        assert_eq!(gate.wait_description.as_deref(), Some("Arbitrum batch #4891 posted to L1"));
    }

    #[test]
    fn filter_gates_prunes_non_gate_branches() {
        let flow = FlowId::new_v4();
        let gate_inv = ActionId::new_v4();
        let other_inv = ActionId::new_v4();
        let records = vec![
            record(gate_inv, ActionRecordKind::Invocation, "bridge", None, flow),
            record(other_inv, ActionRecordKind::Invocation, "echo", None, flow),
        ];

        let mut tree = build_trace(&records);
        annotate_gates(&mut tree, &["bridge".to_string()].into_iter().collect());
        let filtered = filter_gates(&tree);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].record.concept, "bridge");
    }
}
