use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::lifecycle::ActiveRegistry;
use super::{ActiveSession, ActiveSlot, ChatSession, SessionLease};
use crate::agent::{RemoteAgentHandle, RemoteAgentService, Session};
use crate::error::ChatError;
use crate::intent::Intent;

/// Configuration for the session manager
#[derive(Clone, Debug)]
pub struct SessionManagerConfig {
    /// Maximum number of concurrent connection sessions (None = unlimited)
    pub max_sessions: Option<usize>,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            max_sessions: Some(100),
        }
    }
}

/// Session manager - opens one remote session per client connection
/// Deployment handles are cached and shared across connections
pub struct SessionManager {
    agents: Arc<dyn RemoteAgentService>,
    deployments: Mutex<HashMap<String, Arc<dyn RemoteAgentHandle>>>,
    active: ActiveRegistry,
    max_sessions: Option<usize>,
}

impl SessionManager {
    pub fn new(agents: Arc<dyn RemoteAgentService>, config: SessionManagerConfig) -> Self {
        Self {
            agents,
            deployments: Mutex::new(HashMap::new()),
            active: Arc::new(std::sync::Mutex::new(HashMap::new())),
            max_sessions: config.max_sessions,
        }
    }

    /// Reserve a slot for `connection_id`, enforcing the session limit
    fn reserve(&self, connection_id: &str) -> Result<ActiveSlot, ChatError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| ChatError::Configuration("Session registry poisoned".to_string()))?;

        if let Some(max) = self.max_sessions {
            if active.len() >= max {
                return Err(ChatError::CapacityExceeded(max));
            }
        }

        active.insert(
            connection_id.to_string(),
            ActiveSession {
                connection_id: connection_id.to_string(),
                session_id: None,
                intent: None,
                opened_at: Utc::now(),
            },
        );
        Ok(ActiveSlot::new(connection_id.to_string(), self.active.clone()))
    }

    /// Get the deployment handle for an intent, looking it up on first use
    async fn deployment(&self, intent: &Intent) -> Result<Arc<dyn RemoteAgentHandle>, ChatError> {
        let resource_id = &intent.remote_agent_resource_id;
        if let Some(handle) = self.deployments.lock().await.get(resource_id) {
            return Ok(handle.clone());
        }

        let handle = self.agents.get_deployment(resource_id).await.map_err(|e| {
            error!("Failed to locate deployment {} for intent {}: {}", resource_id, intent.name, e);
            ChatError::RemoteAgentUnavailable(format!(
                "Failed to locate remote agent {}: {}",
                resource_id, e
            ))
        })?;

        let mut deployments = self.deployments.lock().await;
        let handle = deployments.entry(resource_id.clone()).or_insert(handle).clone();
        Ok(handle)
    }

    /// Open the session for a new connection
    /// - If `existing_session_id` is provided, that remote session is reused
    /// - Otherwise a fresh remote session is created for `user_id`
    pub async fn get_or_create_session(
        &self,
        connection_id: &str,
        intent: &Intent,
        user_id: &str,
        existing_session_id: Option<&str>,
    ) -> Result<SessionLease, ChatError> {
        let slot = self.reserve(connection_id)?;
        let handle = self.deployment(intent).await?;

        let session = match existing_session_id {
            Some(session_id) => {
                info!("[{}] - [{}] Using existing session", connection_id, session_id);
                Session {
                    id: session_id.to_string(),
                    user_id: user_id.to_string(),
                }
            }
            None => {
                let session = handle.create_session(user_id).await.map_err(|e| {
                    error!("[{}] Session creation failed on {}: {}", connection_id, handle.resource_id(), e);
                    ChatError::RemoteAgentUnavailable(format!("Failed to create session: {}", e))
                })?;
                info!(
                    "[{}] - [{}] Created new session for user {} (intent {})",
                    connection_id, session.id, session.user_id, intent.name
                );
                session
            }
        };

        Ok(SessionLease::new(slot, ChatSession::new(session, intent.clone(), handle)))
    }

    /// Number of connections currently holding a session slot
    pub fn active_sessions(&self) -> usize {
        self.active.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Snapshot of the connections currently holding a slot
    pub fn list_active(&self) -> Vec<ActiveSession> {
        self.active
            .lock()
            .map(|a| a.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of cached deployment handles
    pub async fn deployment_count(&self) -> usize {
        self.deployments.lock().await.len()
    }
}
