//! Evaluates completions against the registered syncs and fires the
//! matching `then` invocations.
//!
//! A sync's `when` clause is one or more patterns; each pattern matches a
//! single completion record. When a pattern list has more than one
//! entry, the engine needs a *combination* of completions from the same
//! flow — one per pattern — whose variable bindings agree with each
//! other. The spec leaves the exact combination semantics open when more
//! than one valid combination exists; this engine resolves that by
//! picking the combination whose completion ids, sorted, are
//! lexicographically smallest, and by firing a given sync for a given
//! combination of completion ids at most once (`pending`, keyed by
//! `(sync name, sorted completion ids)`).
//!
//! Trigger dispatch itself is a simple index: `(concept, action) -> sync
//! indices`, rebuilt whenever a sync is registered. This mirrors
//! `chem-core`'s event-kind matching, just keyed by concept/action pairs
//! instead of a single flow-event enum.

use crate::action_log::ActionLog;
use crate::storage::Storage;
use crate::transport::TransportRegistry;
use concept_domain::action_log::ActionId;
use concept_domain::sync_spec::{CompiledSync, FieldMatch, ThenInvocation, ThenValue, WhenPattern, WhereClause};
use concept_domain::{ActionRecord, FlowId, SyncFailure, TransportError};
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Fired { sync: String, completions: Vec<ActionRecord> },
    Failed(SyncFailure),
}

#[derive(Default)]
pub struct SyncEngine {
    syncs: Vec<CompiledSync>,
    trigger_index: DashMap<(String, String), Vec<usize>>,
    fired: DashSet<(String, Vec<ActionId>)>,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sync: CompiledSync) {
        let idx = self.syncs.len();
        for key in sync.trigger_keys() {
            self.trigger_index.entry(key).or_default().push(idx);
        }
        self.syncs.push(sync);
    }

    pub fn has_sync(&self, name: &str) -> bool {
        self.syncs.iter().any(|s| s.name == name)
    }

    /// Evaluates every sync that could trigger on `completion`, dispatches
    /// any that fully match through `transports`, and records the
    /// resulting invocation/completion pairs in `action_log`. Returns one
    /// outcome per sync that either fired or failed to resolve a
    /// where-clause; a sync with no matching combination yet is silent.
    pub async fn on_completion(
        &self,
        completion: &ActionRecord,
        action_log: &dyn ActionLog,
        storage: &dyn Storage,
        transports: &TransportRegistry,
    ) -> Vec<SyncOutcome> {
        let Some(indices) = self.trigger_index.get(&(completion.concept.clone(), completion.action.clone())) else {
            return Vec::new();
        };
        let history = action_log.load_flow(completion.flow);
        let mut outcomes = Vec::new();

        for &idx in indices.value() {
            let sync = &self.syncs[idx];
            let Some((records, bindings)) = self.pick_combination(sync, completion, &history) else {
                continue;
            };
            let ids: Vec<ActionId> = records.iter().map(|r| r.id).collect();
            let key = (sync.name.clone(), ids.clone());
            if !self.fired.insert(key) {
                continue;
            }

            let mut bindings = bindings;
            if let Err(failure) = resolve_where(&sync.name, completion.flow, &sync.r#where, &mut bindings, storage) {
                outcomes.push(SyncOutcome::Failed(failure));
                continue;
            }

            match fire_then(sync, &bindings, completion, action_log, transports).await {
                Ok(completions) => outcomes.push(SyncOutcome::Fired { sync: sync.name.clone(), completions }),
                Err(e) => outcomes.push(SyncOutcome::Failed(SyncFailure {
                    sync: sync.name.clone(),
                    flow: completion.flow,
                    reason: e.to_string(),
                })),
            }
        }
        outcomes
    }

    fn pick_combination(
        &self,
        sync: &CompiledSync,
        trigger: &ActionRecord,
        history: &[ActionRecord],
    ) -> Option<(Vec<ActionRecord>, BTreeMap<String, Value>)> {
        let groups: Vec<Vec<(ActionRecord, BTreeMap<String, Value>)>> =
            sync.when.iter().map(|p| candidates(p, history)).collect();
        if groups.iter().any(|g| g.is_empty()) {
            return None;
        }

        let mut combos = Vec::new();
        combine(&groups, 0, Vec::new(), BTreeMap::new(), &mut combos);

        combos
            .into_iter()
            .filter(|(records, _)| records.iter().any(|r| r.id == trigger.id))
            .min_by(|a, b| sorted_ids(&a.0).cmp(&sorted_ids(&b.0)))
    }
}

fn sorted_ids(records: &[ActionRecord]) -> Vec<ActionId> {
    let mut ids: Vec<ActionId> = records.iter().map(|r| r.id).collect();
    ids.sort();
    ids
}

fn candidates(pattern: &WhenPattern, history: &[ActionRecord]) -> Vec<(ActionRecord, BTreeMap<String, Value>)> {
    history.iter().filter_map(|r| try_match(pattern, r).map(|b| (r.clone(), b))).collect()
}

fn try_match(pattern: &WhenPattern, record: &ActionRecord) -> Option<BTreeMap<String, Value>> {
    if !record.is_completion() || record.concept != pattern.concept || record.action != pattern.action {
        return None;
    }
    let mut bindings = BTreeMap::new();
    let input = record.input.as_object()?;
    for f in &pattern.input_fields {
        bind_field(&f.matcher, input.get(&f.name)?, &mut bindings)?;
    }
    let output = record.output.as_ref().and_then(|o| o.as_object());
    for f in &pattern.output_fields {
        let value = if f.name == "variant" {
            Value::String(record.variant.clone()?)
        } else {
            output?.get(&f.name)?.clone()
        };
        bind_field(&f.matcher, &value, &mut bindings)?;
    }
    Some(bindings)
}

fn bind_field(matcher: &FieldMatch, value: &Value, bindings: &mut BTreeMap<String, Value>) -> Option<()> {
    match matcher {
        FieldMatch::Wildcard => Some(()),
        FieldMatch::Literal(expected) => (expected == value).then_some(()),
        FieldMatch::Variable(name) => match bindings.get(name) {
            Some(existing) if existing != value => None,
            _ => {
                bindings.insert(name.clone(), value.clone());
                Some(())
            }
        },
    }
}

fn combine(
    groups: &[Vec<(ActionRecord, BTreeMap<String, Value>)>],
    idx: usize,
    acc_records: Vec<ActionRecord>,
    acc_bindings: BTreeMap<String, Value>,
    out: &mut Vec<(Vec<ActionRecord>, BTreeMap<String, Value>)>,
) {
    if idx == groups.len() {
        out.push((acc_records, acc_bindings));
        return;
    }
    for (record, bindings) in &groups[idx] {
        if let Some(merged) = merge_bindings(&acc_bindings, bindings) {
            let mut records = acc_records.clone();
            records.push(record.clone());
            combine(groups, idx + 1, records, merged, out);
        }
    }
}

fn merge_bindings(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> Option<BTreeMap<String, Value>> {
    let mut merged = a.clone();
    for (k, v) in b {
        match merged.get(k) {
            Some(existing) if existing != v => return None,
            _ => {
                merged.insert(k.clone(), v.clone());
            }
        }
    }
    Some(merged)
}

fn resolve_where(
    sync_name: &str,
    flow: FlowId,
    clauses: &[WhereClause],
    bindings: &mut BTreeMap<String, Value>,
    storage: &dyn Storage,
) -> Result<(), SyncFailure> {
    for clause in clauses {
        match clause {
            WhereClause::Bind { bind, source_variable } => {
                let value = bindings.get(source_variable).cloned().ok_or_else(|| SyncFailure {
                    sync: sync_name.to_string(),
                    flow,
                    reason: format!("unbound source variable `{source_variable}`"),
                })?;
                bindings.insert(bind.clone(), value);
            }
            WhereClause::Query { bind, concept, relation, criteria } => {
                let substituted: Vec<(String, Value)> = criteria
                    .iter()
                    .map(|(field, matcher)| {
                        let value = match matcher {
                            FieldMatch::Literal(v) => v.clone(),
                            FieldMatch::Variable(name) => bindings.get(name).cloned().unwrap_or(Value::Null),
                            FieldMatch::Wildcard => Value::Null,
                        };
                        (field.clone(), value)
                    })
                    .collect();
                let relation_key = format!("{concept}.{relation}");
                let row = storage.find(&relation_key, &substituted).into_iter().next().ok_or_else(|| SyncFailure {
                    sync: sync_name.to_string(),
                    flow,
                    reason: format!("no row in `{relation_key}` matches the where-clause"),
                })?;
                bindings.insert(bind.clone(), row.1);
            }
        }
    }
    Ok(())
}

async fn fire_then(
    sync: &CompiledSync,
    bindings: &BTreeMap<String, Value>,
    trigger: &ActionRecord,
    action_log: &dyn ActionLog,
    transports: &TransportRegistry,
) -> Result<Vec<ActionRecord>, TransportError> {
    let mut completions = Vec::new();
    for invocation in &sync.then {
        let input = substitute_then(invocation, bindings);
        let record = action_log.append_invocation(
            &invocation.concept,
            &invocation.action,
            input.clone(),
            trigger.flow,
            Some(sync.name.clone()),
            Some(trigger.id),
        );

        let transport = transports.get(&invocation.concept).ok_or_else(|| TransportError {
            concept: invocation.concept.clone(),
            action: invocation.action.clone(),
            cause: "no transport registered for this concept".to_string(),
        })?;
        let (variant, output) = transport.invoke(&invocation.action, input).await?;
        let completion = action_log.append_completion(&record, variant, output);
        completions.push(completion);
    }
    Ok(completions)
}

fn substitute_then(invocation: &ThenInvocation, bindings: &BTreeMap<String, Value>) -> Value {
    let mut map = serde_json::Map::new();
    for field in &invocation.fields {
        let value = match &field.value {
            ThenValue::Literal(v) => v.clone(),
            ThenValue::Variable(name) => bindings.get(name).cloned().unwrap_or(Value::Null),
        };
        map.insert(field.name.clone(), value);
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::InMemoryActionLog;
    use crate::storage::InMemoryStorage;
    use crate::transport::{ConceptHandler, InProcessTransport, Transport};
    use async_trait::async_trait;
    use concept_domain::sync_spec::{MatchedField, ThenField};
    use serde_json::json;
    use std::sync::Arc;

    struct EchoHandler;

    #[async_trait]
    impl ConceptHandler for EchoHandler {
        async fn handle(&self, _action: &str, input: Value) -> Result<(String, Value), TransportError> {
            Ok(("ok".to_string(), input))
        }
    }

    fn loopback_sync() -> CompiledSync {
        CompiledSync {
            name: "loopback".into(),
            annotations: vec![],
            when: vec![WhenPattern {
                concept: "echo".into(),
                action: "send".into(),
                input_fields: vec![MatchedField { name: "id".into(), matcher: FieldMatch::Variable("id".into()) }],
                output_fields: vec![MatchedField { name: "echo".into(), matcher: FieldMatch::Variable("text".into()) }],
            }],
            r#where: vec![],
            then: vec![ThenInvocation {
                concept: "echo".into(),
                action: "send".into(),
                fields: vec![
                    ThenField { name: "id".into(), value: ThenValue::Variable("id".into()) },
                    ThenField { name: "text".into(), value: ThenValue::Variable("text".into()) },
                ],
            }],
        }
    }

    #[tokio::test]
    async fn fires_once_for_a_single_when_pattern() {
        let mut engine = SyncEngine::new();
        engine.register(loopback_sync());

        let log = InMemoryActionLog::new();
        let storage = InMemoryStorage::new();
        let transports = TransportRegistry::new();
        transports.register("echo", Arc::new(InProcessTransport::new(Arc::new(EchoHandler))));

        let flow = FlowId::new_v4();
        let inv = log.append_invocation("echo", "send", json!({"id": "m1", "text": "hi"}), flow, None, None);
        let comp = log.append_completion(&inv, "ok".into(), json!({"id": "m1", "echo": "hi"}));

        let outcomes = engine.on_completion(&comp, &log, &storage, &transports).await;
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            SyncOutcome::Fired { sync, completions } => {
                assert_eq!(sync, "loopback");
                assert_eq!(completions.len(), 1);
            }
            SyncOutcome::Failed(f) => panic!("unexpected failure: {f}"),
        }

        let second = engine.on_completion(&comp, &log, &storage, &transports).await;
        assert!(second.is_empty(), "the same completion set must not fire the sync twice");
    }
}
