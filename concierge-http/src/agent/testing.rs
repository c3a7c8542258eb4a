use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Fragment, FragmentStream, RemoteAgentHandle, RemoteAgentService, Session};
use crate::error::AgentError;

/// Outcome of one scripted query: either a failure to start, or the items to stream
pub(crate) type Reply = Result<Vec<Result<Fragment, AgentError>>, AgentError>;

/// Remote agent that plays back scripted replies and records every query
#[derive(Default)]
pub(crate) struct ScriptedAgent {
    replies: Mutex<VecDeque<Reply>>,
    queries: Mutex<Vec<(String, String, String)>>,
    sessions_created: AtomicUsize,
    hang: bool,
    fail_sessions: bool,
}

impl ScriptedAgent {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Agent whose streams never yield
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    /// Agent that refuses to create sessions
    pub fn failing_sessions() -> Self {
        Self {
            fail_sessions: true,
            ..Default::default()
        }
    }

    pub fn texts(texts: &[&str]) -> Reply {
        Ok(texts.iter().map(|t| Ok(Fragment::from_text(*t))).collect())
    }

    pub fn queries(&self) -> Vec<(String, String, String)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteAgentHandle for ScriptedAgent {
    fn resource_id(&self) -> &str {
        "engines/scripted"
    }

    async fn create_session(&self, user_id: &str) -> Result<Session, AgentError> {
        if self.fail_sessions {
            return Err(AgentError::Status { status: 503, body: "unavailable".into() });
        }
        let n = self.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Session {
            id: format!("session-{}", n),
            user_id: user_id.to_string(),
        })
    }

    async fn stream_query(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<FragmentStream, AgentError> {
        self.queries
            .lock()
            .unwrap()
            .push((user_id.to_string(), session_id.to_string(), message.to_string()));
        if self.hang {
            return Ok(futures::stream::pending().boxed());
        }
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()));
        reply.map(|items| futures::stream::iter(items).boxed())
    }
}

/// Service resolving every resource id to the same scripted agent
pub(crate) struct ScriptedService(pub Arc<ScriptedAgent>);

#[async_trait]
impl RemoteAgentService for ScriptedService {
    async fn get_deployment(&self, _resource_id: &str) -> Result<Arc<dyn RemoteAgentHandle>, AgentError> {
        Ok(self.0.clone())
    }
}
