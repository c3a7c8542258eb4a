//! Agent Engine (Vertex AI reasoning engine) REST client
//!
//! Sessions and queries go through the deployment's `:query` and
//! `:streamQuery` methods. The streaming reply is a body of newline-delimited
//! JSON events, optionally framed as SSE `data:` lines.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Fragment, FragmentStream, RemoteAgentHandle, RemoteAgentService, Session};
use crate::error::AgentError;

/// Configuration for the Agent Engine client
#[derive(Clone, Debug)]
pub struct AgentEngineConfig {
    /// API endpoint override (default: `https://{location}-aiplatform.googleapis.com`)
    pub endpoint: Option<String>,
    /// OAuth bearer token sent with every request
    pub access_token: Option<String>,
    /// Timeout for connecting and for non-streaming calls
    pub request_timeout: Duration,
}

impl Default for AgentEngineConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// `RemoteAgentService` backed by the Agent Engine REST API
pub struct AgentEngineService {
    client: reqwest::Client,
    config: AgentEngineConfig,
}

impl AgentEngineService {
    pub fn new(config: AgentEngineConfig) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn deployment_url(&self, resource_id: &str) -> Result<String, AgentError> {
        let resource_id = resource_id.trim_matches('/');
        let endpoint = match &self.config.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => {
                let location = location_of(resource_id).ok_or_else(|| {
                    AgentError::Other(format!("Cannot infer location from resource id '{}'", resource_id))
                })?;
                format!("https://{}-aiplatform.googleapis.com", location)
            }
        };
        Ok(format!("{}/v1/{}", endpoint, resource_id))
    }
}

#[async_trait]
impl RemoteAgentService for AgentEngineService {
    async fn get_deployment(&self, resource_id: &str) -> Result<Arc<dyn RemoteAgentHandle>, AgentError> {
        let url = self.deployment_url(resource_id)?;
        debug!("Looking up deployment {}", url);

        let mut request = self.client.get(&url).timeout(self.config.request_timeout);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AgentError::NotFound(resource_id.to_string())),
            status if !status.is_success() => Err(AgentError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(Arc::new(AgentEngineHandle {
                client: self.client.clone(),
                url,
                resource_id: resource_id.to_string(),
                access_token: self.config.access_token.clone(),
                request_timeout: self.config.request_timeout,
            })),
        }
    }
}

struct AgentEngineHandle {
    client: reqwest::Client,
    url: String,
    resource_id: String,
    access_token: Option<String>,
    request_timeout: Duration,
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    output: T,
}

impl AgentEngineHandle {
    fn post(&self, url: String) -> reqwest::RequestBuilder {
        let request = self.client.post(url);
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AgentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AgentError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RemoteAgentHandle for AgentEngineHandle {
    fn resource_id(&self) -> &str {
        &self.resource_id
    }

    async fn create_session(&self, user_id: &str) -> Result<Session, AgentError> {
        let body = json!({
            "class_method": "create_session",
            "input": { "user_id": user_id },
        });
        let response = self
            .post(format!("{}:query", self.url))
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let bytes = response.bytes().await?;
        let parsed: QueryResponse<Session> = serde_json::from_slice(&bytes)?;
        Ok(parsed.output)
    }

    async fn stream_query(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<FragmentStream, AgentError> {
        let body = json!({
            "class_method": "stream_query",
            "input": {
                "user_id": user_id,
                "session_id": session_id,
                "message": message,
            },
        });
        let response = self
            .post(format!("{}:streamQuery?alt=sse", self.url))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let mut body = Box::pin(response.bytes_stream());
        let stream = async_stream::stream! {
            let mut decoder = LineDecoder::default();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(AgentError::Http(e));
                        return;
                    }
                };
                for line in decoder.push(&chunk) {
                    match parse_line(&line) {
                        Ok(Some(fragment)) => yield Ok(fragment),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            if let Some(line) = decoder.finish() {
                match parse_line(&line) {
                    Ok(Some(fragment)) => yield Ok(fragment),
                    Ok(None) => {}
                    Err(e) => yield Err(e),
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Extract the `locations/{location}` segment of a resource id
fn location_of(resource_id: &str) -> Option<&str> {
    let mut segments = resource_id.split('/');
    while let Some(segment) = segments.next() {
        if segment == "locations" {
            return segments.next().filter(|l| !l.is_empty());
        }
    }
    None
}

/// Splits a chunked body into complete lines
#[derive(Default)]
struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line).trim_end_matches(['\n', '\r']).to_string();
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Decode one body line into a fragment. SSE comments, non-data fields
/// (`event:`, `id:`, `retry:`) and the `[DONE]` marker yield `None`.
fn parse_line(line: &str) -> Result<Option<Fragment>, AgentError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let payload = match sse_field(line) {
        Some(("data", value)) => value,
        Some((field, _)) => {
            debug!("Skipping SSE field {}", field);
            return Ok(None);
        }
        None => line,
    };
    if payload == "[DONE]" {
        return Ok(None);
    }
    match serde_json::from_str(payload) {
        Ok(fragment) => Ok(Some(fragment)),
        Err(e) => {
            warn!("Undecodable stream line: {}", payload);
            Err(AgentError::Decode(e))
        }
    }
}

/// Split an SSE `field: value` line. Bare JSON lines are not fields.
fn sse_field(line: &str) -> Option<(&str, &str)> {
    let (field, value) = line.split_once(':')?;
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    Some((field, value.trim_start()))
}
