use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::intent::Intent;
use crate::session::ActiveSession;
use crate::{ErrorResponse, ServerState};

/// Intent as listed by the API
#[derive(Debug, Serialize, Deserialize)]
pub struct IntentSummary {
    #[serde(flatten)]
    pub intent: Intent,
    pub default: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
    /// Deployment handles resolved so far
    pub deployments: usize,
    pub sessions: Vec<ActiveSession>,
}

/// GET /api/intents - list the configured intents
pub async fn handle_list_intents(State(state): State<ServerState>) -> Json<Vec<IntentSummary>> {
    let default = state.intents.default_name();
    let intents = state
        .intents
        .list()
        .iter()
        .map(|intent| IntentSummary {
            default: default == Some(intent.name.as_str()),
            intent: intent.clone(),
        })
        .collect();
    Json(intents)
}

/// GET /api/intents/{name} - fetch one intent
pub async fn handle_get_intent(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<Json<IntentSummary>, ErrorResponse> {
    info!("GET /api/intents/{}", name);
    let intent = state
        .intents
        .get(&name)
        .ok_or_else(|| ErrorResponse::not_found(format!("Intent not found: {}", name)))?;

    Ok(Json(IntentSummary {
        default: state.intents.default_name() == Some(name.as_str()),
        intent: intent.clone(),
    }))
}

/// GET /health
pub async fn handle_health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let sessions = state.session_manager.list_active();
    Json(HealthResponse {
        status: "ok".to_string(),
        active_sessions: sessions.len(),
        deployments: state.session_manager.deployment_count().await,
        sessions,
    })
}
