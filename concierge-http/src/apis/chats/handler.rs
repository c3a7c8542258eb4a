use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::WebSocketChannel;
use crate::connection::{ChatConnection, ConnectionParams};
use crate::ServerState;

/// Optional query parameters on `/api/chats`
#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl ChatQuery {
    /// Blank values (`?user_id=`) count as absent
    pub fn into_params(self) -> ConnectionParams {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        ConnectionParams {
            user_id: present(self.user_id),
            session_id: present(self.session_id),
        }
    }
}

/// GET /api/chats - upgrade to the chat relay WebSocket
pub async fn handle_chat_socket(
    State(state): State<ServerState>,
    Query(query): Query<ChatQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let connection_id = Uuid::new_v4().to_string();
    let params = query.into_params();
    info!(
        "[{}] GET /api/chats user={} session={}",
        connection_id,
        params.user_id.as_deref().unwrap_or("default"),
        params.session_id.as_deref().unwrap_or("new")
    );

    let connection = ChatConnection::new(
        connection_id.clone(),
        state.intents.clone(),
        state.session_manager.clone(),
        state.logger.clone(),
        state.connection.clone(),
        params,
    );

    ws.on_upgrade(move |socket| connection.run(WebSocketChannel::new(socket, connection_id)))
}
