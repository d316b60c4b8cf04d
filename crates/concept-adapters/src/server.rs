//! HTTP + WebSocket server half of the wire protocol: exposes one
//! concept's `ConceptHandler` over `/invoke` and `/query`, a `/health`
//! check, and a `/stream` WebSocket that tails the action log as
//! `ActionRecord`s are appended. Sole owner of the axum dependency in
//! this crate, following `r2e-http`'s "one crate, one web framework"
//! convention.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use concept_core::ConceptHandler;
use concept_domain::ActionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Deserialize)]
struct InvokeRequest {
    #[allow(dead_code)]
    concept: String,
    action: String,
    input: Value,
}

#[derive(Debug, Serialize)]
struct InvokeResponse {
    variant: String,
    output: Value,
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    relation: String,
    args: Option<Vec<(String, Value)>>,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    as_of: chrono::DateTime<chrono::Utc>,
    relations: std::collections::BTreeMap<String, Vec<(String, Value)>>,
}

struct ServerState {
    handler: Arc<dyn ConceptHandler>,
    records: broadcast::Sender<ActionRecord>,
}

pub struct ConceptServer {
    state: Arc<ServerState>,
}

impl ConceptServer {
    pub fn new(handler: Arc<dyn ConceptHandler>) -> Self {
        let (records, _) = broadcast::channel(1024);
        Self { state: Arc::new(ServerState { handler, records }) }
    }

    /// Publishes a record to every connected `/stream` client. The
    /// action log itself has no notion of subscribers; callers push into
    /// this after each append.
    pub fn publish(&self, record: ActionRecord) {
        let _ = self.state.records.send(record);
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/invoke", post(invoke))
            .route("/query", post(query))
            .route("/health", get(health))
            .route("/stream", get(stream))
            .with_state(self.state.clone())
    }
}

async fn invoke(State(state): State<Arc<ServerState>>, Json(req): Json<InvokeRequest>) -> impl IntoResponse {
    match state.handler.handle(&req.action, req.input).await {
        Ok((variant, output)) => Json(InvokeResponse { variant, output }).into_response(),
        Err(e) => (axum::http::StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

async fn query(State(state): State<Arc<ServerState>>, Json(req): Json<QueryRequest>) -> impl IntoResponse {
    let criteria = req.args.unwrap_or_default();
    match state.handler.query(&req.relation, &criteria).await {
        Ok(rows) => {
            let mut relations = std::collections::BTreeMap::new();
            relations.insert(req.relation, rows);
            Json(QueryResponse { as_of: chrono::Utc::now(), relations }).into_response()
        }
        Err(e) => (axum::http::StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

async fn health() -> impl IntoResponse {
    axum::http::StatusCode::OK
}

async fn stream(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| tail_records(socket, state))
}

async fn tail_records(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.records.subscribe();
    while let Ok(record) = rx.recv().await {
        let Ok(text) = serde_json::to_string(&record) else { continue };
        if socket.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use concept_domain::TransportError;
    use serde_json::json;
    use tower::ServiceExt;

    struct EchoHandler;

    #[async_trait]
    impl ConceptHandler for EchoHandler {
        async fn handle(&self, _action: &str, input: Value) -> Result<(String, Value), TransportError> {
            Ok(("ok".to_string(), input))
        }
    }

    #[tokio::test]
    async fn invoke_route_dispatches_to_the_handler() {
        let server = ConceptServer::new(Arc::new(EchoHandler));
        let body = json!({"concept": "echo", "action": "send", "input": {"id": "m1"}});
        let request = Request::post("/invoke")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["variant"], "ok");
        assert_eq!(parsed["output"]["id"], "m1");
    }

    #[tokio::test]
    async fn health_route_reports_ok() {
        let server = ConceptServer::new(Arc::new(EchoHandler));
        let response = server.router().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
