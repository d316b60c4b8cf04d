//! Remote HTTP transport: the client half of the wire protocol the
//! server module exposes. Implements `concept_core::Transport` so the
//! kernel can dispatch to a concept running in another process exactly
//! as it would to an in-process one.

use async_trait::async_trait;
use concept_core::Transport;
use concept_domain::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    concept: &'a str,
    action: &'a str,
    input: Value,
}

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    variant: String,
    output: Value,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    relation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Vec<(String, Value)>>,
}

/// `{asOf, relations}`: a snapshot of one or more relations as of a
/// single instant, so a caller never sees rows from two different
/// points in time mixed together.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[allow(dead_code)]
    as_of: chrono::DateTime<chrono::Utc>,
    relations: std::collections::BTreeMap<String, Vec<(String, Value)>>,
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    concept: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, concept: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), concept: concept.into() }
    }

    fn err(&self, action: &str, cause: impl std::fmt::Display) -> TransportError {
        TransportError { concept: self.concept.clone(), action: action.to_string(), cause: cause.to_string() }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn invoke(&self, action: &str, input: Value) -> Result<(String, Value), TransportError> {
        let response = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .json(&InvokeRequest { concept: &self.concept, action, input })
            .send()
            .await
            .map_err(|e| self.err(action, e))?
            .error_for_status()
            .map_err(|e| self.err(action, e))?
            .json::<InvokeResponse>()
            .await
            .map_err(|e| self.err(action, e))?;
        Ok((response.variant, response.output))
    }

    async fn query(&self, relation: &str, criteria: &[(String, Value)]) -> Result<Vec<(String, Value)>, TransportError> {
        let args = (!criteria.is_empty()).then(|| criteria.to_vec());
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&QueryRequest { relation, args })
            .send()
            .await
            .map_err(|e| self.err(relation, e))?
            .error_for_status()
            .map_err(|e| self.err(relation, e))?
            .json::<QueryResponse>()
            .await
            .map_err(|e| self.err(relation, e))?;
        Ok(response.relations.get(relation).cloned().unwrap_or_default())
    }

    async fn health(&self) -> bool {
        self.client.get(format!("{}/health", self.base_url)).send().await.map(|r| r.status().is_success()).unwrap_or(false)
    }
}
