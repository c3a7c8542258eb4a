use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message sent to the client when an inbound payload cannot be decoded
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON format received.";

/// Errors raised while serving a chat connection
///
/// Setup errors (`Configuration`, `RemoteAgentUnavailable`, `CapacityExceeded`)
/// close the connection. Turn errors (`MalformedInput`, `Relay`) are reported
/// to the client and the connection stays open.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Remote agent unavailable: {0}")]
    RemoteAgentUnavailable(String),

    #[error("Maximum number of sessions reached: {0}")]
    CapacityExceeded(usize),

    #[error("Invalid JSON format received.")]
    MalformedInput(String),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Client disconnected")]
    ClientDisconnected,
}

impl ChatError {
    /// Stable machine-readable code, attached to log records
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Configuration(_) => "configuration_error",
            ChatError::RemoteAgentUnavailable(_) => "remote_agent_unavailable",
            ChatError::CapacityExceeded(_) => "capacity_exceeded",
            ChatError::MalformedInput(_) => "malformed_input",
            ChatError::Relay(_) => "relay_error",
            ChatError::ClientDisconnected => "client_disconnected",
        }
    }

    /// Whether the connection must be closed after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChatError::Configuration(_)
                | ChatError::RemoteAgentUnavailable(_)
                | ChatError::CapacityExceeded(_)
                | ChatError::ClientDisconnected
        )
    }
}

/// Errors returned by a remote agent deployment
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote agent returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode remote response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Deployment not found: {0}")]
    NotFound(String),

    #[error("Timed out after {0:?} waiting for the remote agent")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}

/// Error response structure for REST endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: String, error_type: String, code: Option<String>) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                code,
            },
        }
    }

    pub fn not_found(message: String) -> Self {
        Self::new(message, "not_found".to_string(), Some("intent_not_found".to_string()))
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.error.r#type.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "invalid_request" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}
