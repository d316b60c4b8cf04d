//! A concept's actions can be reached over any transport, so the kernel
//! never calls a concept's implementation directly — it looks it up in
//! a registry keyed by concept URI and dispatches through the `Transport`
//! trait. The in-process adapter here wraps a local handler; remote HTTP
//! and WebSocket adapters live in `concept-adapters` and implement the
//! same trait.

use async_trait::async_trait;
use concept_domain::TransportError;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn invoke(&self, action: &str, input: Value) -> Result<(String, Value), TransportError>;

    async fn query(
        &self,
        _relation: &str,
        _criteria: &[(String, Value)],
    ) -> Result<Vec<(String, Value)>, TransportError> {
        Ok(Vec::new())
    }

    async fn health(&self) -> bool {
        true
    }
}

/// A concept's own action dispatch, independent of how it is reached.
/// The in-process transport adapts one of these into a `Transport`; a
/// remote transport instead serializes the call over the wire and a peer
/// kernel's in-process transport is what actually runs it.
#[async_trait]
pub trait ConceptHandler: Send + Sync {
    async fn handle(&self, action: &str, input: Value) -> Result<(String, Value), TransportError>;

    async fn query(
        &self,
        _relation: &str,
        _criteria: &[(String, Value)],
    ) -> Result<Vec<(String, Value)>, TransportError> {
        Ok(Vec::new())
    }
}

pub struct InProcessTransport {
    handler: Arc<dyn ConceptHandler>,
}

impl InProcessTransport {
    pub fn new(handler: Arc<dyn ConceptHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn invoke(&self, action: &str, input: Value) -> Result<(String, Value), TransportError> {
        self.handler.handle(action, input).await
    }

    async fn query(&self, relation: &str, criteria: &[(String, Value)]) -> Result<Vec<(String, Value)>, TransportError> {
        self.handler.query(relation, criteria).await
    }
}

#[derive(Default)]
pub struct TransportRegistry {
    transports: DashMap<String, Arc<dyn Transport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, concept_uri: &str, transport: Arc<dyn Transport>) {
        self.transports.insert(concept_uri.to_string(), transport);
    }

    pub fn get(&self, concept_uri: &str) -> Option<Arc<dyn Transport>> {
        self.transports.get(concept_uri).map(|e| e.clone())
    }

    pub fn contains(&self, concept_uri: &str) -> bool {
        self.transports.contains_key(concept_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl ConceptHandler for EchoHandler {
        async fn handle(&self, _action: &str, input: Value) -> Result<(String, Value), TransportError> {
            Ok(("ok".to_string(), input))
        }
    }

    #[tokio::test]
    async fn in_process_transport_dispatches_to_the_handler() {
        let registry = TransportRegistry::new();
        registry.register("echo@1", Arc::new(InProcessTransport::new(Arc::new(EchoHandler))));

        let transport = registry.get("echo@1").unwrap();
        let (variant, output) = transport.invoke("send", json!({"id": "m1"})).await.unwrap();
        assert_eq!(variant, "ok");
        assert_eq!(output, json!({"id": "m1"}));
    }

    #[test]
    fn unregistered_concepts_are_absent() {
        let registry = TransportRegistry::new();
        assert!(!registry.contains("echo@1"));
    }
}
