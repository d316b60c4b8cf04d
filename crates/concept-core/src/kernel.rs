//! The composition root: registers concepts and syncs, routes a request
//! to the right transport, and runs the sync cascade that follows every
//! completion until it goes quiet.
//!
//! Registration rejects duplicates outright rather than silently
//! overwriting — two concepts or syncs sharing a name is very likely a
//! build mistake, not an intentional redefinition, so the kernel treats
//! it the way `chem-core`'s engine treats running a flow twice: as an
//! error the caller must see, not paper over.

use crate::action_log::ActionLog;
use crate::errors::KernelError;
use crate::storage::Storage;
use crate::sync_engine::{SyncEngine, SyncOutcome};
use crate::transport::{Transport, TransportRegistry};
use concept_domain::{ActionRecord, ConceptManifest, FlowId};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

pub struct Kernel {
    storage: Arc<dyn Storage>,
    action_log: Arc<dyn ActionLog>,
    transports: TransportRegistry,
    sync_engine: RwLock<SyncEngine>,
    manifests: DashMap<String, ConceptManifest>,
}

impl Kernel {
    pub fn new(storage: Arc<dyn Storage>, action_log: Arc<dyn ActionLog>) -> Self {
        Self {
            storage,
            action_log,
            transports: TransportRegistry::new(),
            sync_engine: RwLock::new(SyncEngine::new()),
            manifests: DashMap::new(),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn action_log(&self) -> &dyn ActionLog {
        self.action_log.as_ref()
    }

    pub fn register_concept(&self, manifest: ConceptManifest, transport: Arc<dyn Transport>) -> Result<(), KernelError> {
        if self.manifests.contains_key(&manifest.uri) {
            return Err(KernelError::DuplicateConcept(manifest.uri));
        }
        self.transports.register(&manifest.uri, transport);
        self.manifests.insert(manifest.uri.clone(), manifest);
        Ok(())
    }

    pub fn register_sync(&self, sync: concept_domain::CompiledSync) -> Result<(), KernelError> {
        let mut engine = self.sync_engine.write().expect("sync engine lock poisoned");
        if engine.has_sync(&sync.name) {
            return Err(KernelError::DuplicateSync(sync.name));
        }
        engine.register(sync);
        Ok(())
    }

    /// Invokes `concept/action`, waits for its completion, then drains the
    /// sync cascade the completion triggers (each fired sync's own
    /// completions are fed back in, breadth-first, until nothing new
    /// fires — this is what lets a cascade delete or a multi-step gate
    /// trace propagate without the caller driving each step by hand).
    pub async fn handle_request(
        &self,
        concept: &str,
        action: &str,
        input: Value,
        flow: FlowId,
    ) -> Result<ActionRecord, KernelError> {
        let completion = self.invoke_concept(concept, action, input, flow, None, None).await?;
        self.drain_cascade(completion.clone()).await;
        Ok(completion)
    }

    async fn invoke_concept(
        &self,
        concept: &str,
        action: &str,
        input: Value,
        flow: FlowId,
        sync: Option<String>,
        parent: Option<concept_domain::action_log::ActionId>,
    ) -> Result<ActionRecord, KernelError> {
        if !self.transports.contains(concept) {
            return Err(KernelError::UnknownConcept(concept.to_string()));
        }
        let transport = self.transports.get(concept).expect("checked above");
        let invocation = self.action_log.append_invocation(concept, action, input.clone(), flow, sync, parent);
        let (variant, output) = transport.invoke(action, input).await?;
        Ok(self.action_log.append_completion(&invocation, variant, output))
    }

    async fn drain_cascade(&self, seed: ActionRecord) {
        let mut queue = VecDeque::from([seed]);
        while let Some(completion) = queue.pop_front() {
            let outcomes = {
                let engine = self.sync_engine.read().expect("sync engine lock poisoned");
                engine.on_completion(&completion, self.action_log.as_ref(), self.storage.as_ref(), &self.transports).await
            };
            for outcome in outcomes {
                match outcome {
                    SyncOutcome::Fired { completions, .. } => queue.extend(completions),
                    SyncOutcome::Failed(failure) => log::warn!("{failure}"),
                }
            }
        }
    }

    pub async fn query_concept(
        &self,
        concept: &str,
        relation: &str,
        criteria: &[(String, Value)],
    ) -> Result<Vec<(String, Value)>, KernelError> {
        if !self.transports.contains(concept) {
            return Err(KernelError::UnknownConcept(concept.to_string()));
        }
        let transport = self.transports.get(concept).expect("checked above");
        Ok(transport.query(relation, criteria).await?)
    }

    pub fn get_flow_log(&self, flow: FlowId) -> Vec<ActionRecord> {
        self.action_log.load_flow(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::InMemoryActionLog;
    use crate::storage::InMemoryStorage;
    use crate::transport::{ConceptHandler, InProcessTransport};
    use async_trait::async_trait;
    use concept_domain::TransportError;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl ConceptHandler for EchoHandler {
        async fn handle(&self, _action: &str, input: Value) -> Result<(String, Value), TransportError> {
            Ok(("ok".to_string(), input))
        }
    }

    fn echo_manifest() -> ConceptManifest {
        ConceptManifest {
            uri: "echo".into(),
            name: "echo".into(),
            version: 1,
            purpose: "echoes messages".into(),
            capabilities: vec![],
            type_params: vec![],
            relations: vec![],
            actions: vec![],
            invariants: vec![],
            json_schemas: Default::default(),
            graphql_schema: String::new(),
            gate: None,
        }
    }

    fn kernel() -> Kernel {
        Kernel::new(Arc::new(InMemoryStorage::new()), Arc::new(InMemoryActionLog::new()))
    }

    #[tokio::test]
    async fn handles_a_request_end_to_end() {
        let kernel = kernel();
        kernel.register_concept(echo_manifest(), Arc::new(InProcessTransport::new(Arc::new(EchoHandler)))).unwrap();

        let flow = FlowId::new_v4();
        let completion = kernel.handle_request("echo", "send", json!({"id": "m1"}), flow).await.unwrap();
        assert_eq!(completion.variant.as_deref(), Some("ok"));
        assert_eq!(kernel.get_flow_log(flow).len(), 2);
    }

    #[tokio::test]
    async fn rejects_duplicate_concept_registration() {
        let kernel = kernel();
        kernel.register_concept(echo_manifest(), Arc::new(InProcessTransport::new(Arc::new(EchoHandler)))).unwrap();
        let err = kernel.register_concept(echo_manifest(), Arc::new(InProcessTransport::new(Arc::new(EchoHandler)))).unwrap_err();
        assert_eq!(err, KernelError::DuplicateConcept("echo".into()));
    }

    #[tokio::test]
    async fn unknown_concept_is_reported_rather_than_panicking() {
        let kernel = kernel();
        let err = kernel.handle_request("ghost", "send", json!({}), FlowId::new_v4()).await.unwrap_err();
        assert_eq!(err, KernelError::UnknownConcept("ghost".into()));
    }
}
