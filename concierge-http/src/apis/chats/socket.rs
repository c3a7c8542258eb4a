use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use tracing::debug;

use crate::connection::{ClientChannel, ClientFrame};
use crate::envelope::Envelope;
use crate::error::ChatError;

/// `ClientChannel` over an axum WebSocket
pub struct WebSocketChannel {
    socket: WebSocket,
    connection_id: String,
}

impl WebSocketChannel {
    pub fn new(socket: WebSocket, connection_id: String) -> Self {
        Self {
            socket,
            connection_id,
        }
    }
}

#[async_trait]
impl ClientChannel for WebSocketChannel {
    async fn recv(&mut self) -> ClientFrame {
        match self.socket.recv().await {
            Some(Ok(Message::Text(text))) => ClientFrame::Payload(text.as_str().to_owned()),
            Some(Ok(Message::Binary(bytes))) => {
                ClientFrame::Payload(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => ClientFrame::Ignored,
            Some(Ok(Message::Close(_))) | None => ClientFrame::Closed,
            Some(Err(e)) => {
                debug!("[{}] WebSocket read error: {}", self.connection_id, e);
                ClientFrame::Closed
            }
        }
    }

    async fn send(&mut self, envelope: &Envelope) -> Result<(), ChatError> {
        let json = envelope
            .to_json()
            .map_err(|e| ChatError::Relay(format!("Failed to serialize envelope: {}", e)))?;
        self.socket
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| {
                debug!("[{}] WebSocket write error: {}", self.connection_id, e);
                ChatError::ClientDisconnected
            })
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.send(Message::Close(None)).await {
            debug!("[{}] WebSocket close failed: {}", self.connection_id, e);
        }
    }
}
