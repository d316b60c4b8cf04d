//! End-to-end demo: the Echo scenario. A `web` concept receives a
//! request, a sync forwards it to an `echo` concept, and a second sync
//! carries the echoed text back to `web` as a response — entirely
//! through the kernel's cascade, with no caller-driven step-by-step
//! wiring.

use async_trait::async_trait;
use concept_core::{ConceptHandler, InMemoryActionLog, InMemoryStorage, InProcessTransport, Kernel};
use concept_domain::sync_spec::{CompiledSync, FieldMatch, MatchedField, ThenField, ThenInvocation, ThenValue, WhenPattern};
use concept_domain::{ConceptManifest, FlowId, TransportError};
use serde_json::{json, Value};
use std::sync::Arc;

struct WebHandler;

#[async_trait]
impl ConceptHandler for WebHandler {
    async fn handle(&self, action: &str, input: Value) -> Result<(String, Value), TransportError> {
        match action {
            "request" => Ok(("ok".to_string(), input)),
            "respond" => {
                println!("web/respond: {input}");
                Ok(("ok".to_string(), input))
            }
            other => Err(TransportError { concept: "web".into(), action: other.into(), cause: "no such action".into() }),
        }
    }
}

struct EchoHandler;

#[async_trait]
impl ConceptHandler for EchoHandler {
    async fn handle(&self, action: &str, input: Value) -> Result<(String, Value), TransportError> {
        match action {
            "send" => {
                let id = input.get("id").cloned().unwrap_or(Value::Null);
                let text = input.get("text").cloned().unwrap_or(Value::Null);
                Ok(("ok".to_string(), json!({"id": id, "echo": text})))
            }
            other => Err(TransportError { concept: "echo".into(), action: other.into(), cause: "no such action".into() }),
        }
    }
}

fn minimal_manifest(uri: &str) -> ConceptManifest {
    ConceptManifest {
        uri: uri.to_string(),
        name: uri.to_string(),
        version: 1,
        purpose: String::new(),
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

fn request_to_echo_sync() -> CompiledSync {
    CompiledSync {
        name: "request_to_echo".into(),
        annotations: vec![],
        when: vec![WhenPattern {
            concept: "web".into(),
            action: "request".into(),
            input_fields: vec![MatchedField { name: "method".into(), matcher: FieldMatch::Literal(json!("echo")) }],
            output_fields: vec![MatchedField { name: "text".into(), matcher: FieldMatch::Variable("t".into()) }],
        }],
        r#where: vec![],
        then: vec![ThenInvocation {
            concept: "echo".into(),
            action: "send".into(),
            fields: vec![
                ThenField { name: "id".into(), value: ThenValue::Literal(json!("1")) },
                ThenField { name: "text".into(), value: ThenValue::Variable("t".into()) },
            ],
        }],
    }
}

fn echo_to_response_sync() -> CompiledSync {
    CompiledSync {
        name: "echo_to_response".into(),
        annotations: vec![],
        when: vec![WhenPattern {
            concept: "echo".into(),
            action: "send".into(),
            input_fields: vec![],
            output_fields: vec![
                MatchedField { name: "id".into(), matcher: FieldMatch::Variable("id".into()) },
                MatchedField { name: "echo".into(), matcher: FieldMatch::Variable("echo".into()) },
            ],
        }],
        r#where: vec![],
        then: vec![ThenInvocation {
            concept: "web".into(),
            action: "respond".into(),
            fields: vec![
                ThenField { name: "id".into(), value: ThenValue::Variable("id".into()) },
                ThenField { name: "echo".into(), value: ThenValue::Variable("echo".into()) },
            ],
        }],
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let kernel = Kernel::new(Arc::new(InMemoryStorage::new()), Arc::new(InMemoryActionLog::new()));
    kernel.register_concept(minimal_manifest("web"), Arc::new(InProcessTransport::new(Arc::new(WebHandler)))).expect("register web");
    kernel.register_concept(minimal_manifest("echo"), Arc::new(InProcessTransport::new(Arc::new(EchoHandler)))).expect("register echo");
    kernel.register_sync(request_to_echo_sync()).expect("register request_to_echo");
    kernel.register_sync(echo_to_response_sync()).expect("register echo_to_response");

    let flow = FlowId::new_v4();
    let completion = kernel
        .handle_request("web", "request", json!({"method": "echo", "text": "hello"}), flow)
        .await
        .expect("handle_request");
    println!("web/request completed: variant={:?} output={:?}", completion.variant, completion.output);

    let records = kernel.get_flow_log(flow);
    println!("flow log has {} records", records.len());
    let trace = concept_trace::build_trace(&records);
    println!("{}", concept_trace::render_json(&trace).expect("trace serializes"));
}
