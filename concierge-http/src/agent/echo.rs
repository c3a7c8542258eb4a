//! Offline agent backend that echoes the user's message back word by word.
//! Useful for exercising the chat socket without cloud credentials.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{Fragment, FragmentStream, RemoteAgentHandle, RemoteAgentService, Session};
use crate::error::AgentError;

#[derive(Clone, Debug, Default)]
pub struct EchoAgentService {
    /// Delay inserted before each fragment
    pub delay: Duration,
}

impl EchoAgentService {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RemoteAgentService for EchoAgentService {
    async fn get_deployment(&self, resource_id: &str) -> Result<Arc<dyn RemoteAgentHandle>, AgentError> {
        Ok(Arc::new(EchoAgent {
            resource_id: resource_id.to_string(),
            delay: self.delay,
        }))
    }
}

struct EchoAgent {
    resource_id: String,
    delay: Duration,
}

#[async_trait]
impl RemoteAgentHandle for EchoAgent {
    fn resource_id(&self) -> &str {
        &self.resource_id
    }

    async fn create_session(&self, user_id: &str) -> Result<Session, AgentError> {
        Ok(Session {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
        })
    }

    async fn stream_query(
        &self,
        _user_id: &str,
        _session_id: &str,
        message: &str,
    ) -> Result<FragmentStream, AgentError> {
        let words: Vec<String> = message
            .split_inclusive(char::is_whitespace)
            .map(str::to_string)
            .collect();
        let delay = self.delay;

        let fragments = stream::iter(words).then(move |word| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, AgentError>(Fragment::from_text(word))
        });
        Ok(Box::pin(fragments))
    }
}
