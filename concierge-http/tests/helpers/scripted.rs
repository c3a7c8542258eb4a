//! Remote agent double built on the public agent traits.

use async_trait::async_trait;
use concierge_http::agent::{
    Fragment, FragmentStream, RemoteAgentHandle, RemoteAgentService, Session,
};
use concierge_http::AgentError;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type Reply = Result<Vec<Result<Fragment, AgentError>>, AgentError>;

pub fn texts(texts: &[&str]) -> Reply {
    Ok(texts.iter().map(|t| Ok(Fragment::from_text(*t))).collect())
}

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<Reply>>,
    queries: Mutex<Vec<(String, String, String)>>,
    sessions_created: AtomicUsize,
    deployments_resolved: AtomicUsize,
}

/// Plays back queued replies. With nothing queued the message is echoed as `echo: {message}`.
/// The resource id `engines/missing` is reported as not found.
#[derive(Clone, Default)]
pub struct ScriptedReplies {
    script: Arc<Script>,
}

impl ScriptedReplies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Reply) {
        self.script.replies.lock().unwrap().push_back(reply);
    }

    /// (user_id, session_id, message) for every query, in order
    pub fn queries(&self) -> Vec<(String, String, String)> {
        self.script.queries.lock().unwrap().clone()
    }

    pub fn sessions_created(&self) -> usize {
        self.script.sessions_created.load(Ordering::SeqCst)
    }

    pub fn deployments_resolved(&self) -> usize {
        self.script.deployments_resolved.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteAgentService for ScriptedReplies {
    async fn get_deployment(&self, resource_id: &str) -> Result<Arc<dyn RemoteAgentHandle>, AgentError> {
        if resource_id == "engines/missing" {
            return Err(AgentError::NotFound(resource_id.to_string()));
        }
        self.script.deployments_resolved.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedHandle {
            resource_id: resource_id.to_string(),
            script: self.script.clone(),
        }))
    }
}

struct ScriptedHandle {
    resource_id: String,
    script: Arc<Script>,
}

#[async_trait]
impl RemoteAgentHandle for ScriptedHandle {
    fn resource_id(&self) -> &str {
        &self.resource_id
    }

    async fn create_session(&self, user_id: &str) -> Result<Session, AgentError> {
        let n = self.script.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
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
        self.script
            .queries
            .lock()
            .unwrap()
            .push((user_id.to_string(), session_id.to_string(), message.to_string()));
        let reply = self
            .script
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![Ok(Fragment::from_text(format!("echo: {}", message)))]));
        reply.map(|items| futures::stream::iter(items).boxed())
    }
}
