//! Remote agent collaborators
//!
//! A deployment is addressed by an opaque resource id. The service hands out
//! a handle per deployment; handles create sessions and run streaming queries.

mod fragment;
pub mod echo;
pub mod vertex;
#[cfg(test)]
pub(crate) mod testing;

pub use fragment::{Fragment, FragmentContent, FragmentPart};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AgentError;

/// Stream of fragments produced by one streaming query
pub type FragmentStream = BoxStream<'static, Result<Fragment, AgentError>>;

/// A server-side conversation context owned by the remote agent service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
}

/// Locates remote agent deployments
#[async_trait]
pub trait RemoteAgentService: Send + Sync {
    /// Resolve a deployment handle from its resource id
    async fn get_deployment(&self, resource_id: &str) -> Result<Arc<dyn RemoteAgentHandle>, AgentError>;
}

/// A deployed remote agent
#[async_trait]
pub trait RemoteAgentHandle: Send + Sync {
    fn resource_id(&self) -> &str;

    /// Provision a new conversation context for `user_id`
    async fn create_session(&self, user_id: &str) -> Result<Session, AgentError>;

    /// Send `message` on an existing session and stream the reply.
    /// Errors before the first fragment are returned here, later ones inside the stream.
    async fn stream_query(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<FragmentStream, AgentError>;
}
