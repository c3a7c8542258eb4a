use std::sync::Arc;

use crate::agent::{FragmentStream, RemoteAgentHandle, Session};
use crate::error::AgentError;
use crate::intent::Intent;

/// The remote session bound to one client connection
///
/// Resolved once when the connection opens and reused for every turn.
#[derive(Clone)]
pub struct ChatSession {
    pub session: Session,
    pub intent: Intent,
    handle: Arc<dyn RemoteAgentHandle>,
}

impl ChatSession {
    pub fn new(session: Session, intent: Intent, handle: Arc<dyn RemoteAgentHandle>) -> Self {
        Self {
            session,
            intent,
            handle,
        }
    }

    pub fn id(&self) -> &str {
        &self.session.id
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    /// Send one message on this session and stream the agent's reply
    pub async fn stream_query(&self, message: &str) -> Result<FragmentStream, AgentError> {
        self.handle
            .stream_query(&self.session.user_id, &self.session.id, message)
            .await
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("session", &self.session)
            .field("intent", &self.intent.name)
            .field("deployment", &self.handle.resource_id())
            .finish()
    }
}
