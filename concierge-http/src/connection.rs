//! Per-connection chat state machine
//!
//! `Connecting -> Active -> Closed`. The controller is transport agnostic:
//! it talks to the client through a `ClientChannel`, which the WebSocket
//! route implements over an axum socket.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::envelope::{Envelope, InboundMessage};
use crate::error::ChatError;
use crate::history::{ChatRecord, ResponseLogger};
use crate::intent::IntentResolver;
use crate::relay::{relay, RelayOptions};
use crate::session::{ChatSession, SessionLease, SessionManager};

/// User id applied when the client does not provide one
pub const DEFAULT_USER_ID: &str = "traveler0115";

/// One frame read from the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// A text payload (binary frames are decoded as UTF-8)
    Payload(String),
    /// A control frame with nothing to process (ping, pong)
    Ignored,
    /// The client went away
    Closed,
}

/// Bidirectional link to one chat client
#[async_trait]
pub trait ClientChannel: Send {
    /// Wait for the next frame from the client
    async fn recv(&mut self) -> ClientFrame;

    /// Deliver one envelope. An error means the client is gone.
    async fn send(&mut self, envelope: &Envelope) -> Result<(), ChatError>;

    /// Release the transport once the connection is closed
    async fn close(&mut self) {}
}

/// Settings shared by every connection
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    pub default_user_id: String,
    pub relay: RelayOptions,
    /// Close connections that stay silent for this long
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            default_user_id: DEFAULT_USER_ID.to_string(),
            relay: RelayOptions::default(),
            idle_timeout: None,
        }
    }
}

/// Optional per-connection overrides supplied by the client
#[derive(Clone, Debug, Default)]
pub struct ConnectionParams {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

pub enum ConnectionState {
    Connecting,
    Active(SessionLease),
    Closed,
}

/// Controller for one client connection
pub struct ChatConnection {
    id: String,
    intents: Arc<dyn IntentResolver>,
    sessions: Arc<SessionManager>,
    logger: Arc<dyn ResponseLogger>,
    config: ConnectionConfig,
    params: ConnectionParams,
}

impl ChatConnection {
    pub fn new(
        id: String,
        intents: Arc<dyn IntentResolver>,
        sessions: Arc<SessionManager>,
        logger: Arc<dyn ResponseLogger>,
        config: ConnectionConfig,
        params: ConnectionParams,
    ) -> Self {
        Self {
            id,
            intents,
            sessions,
            logger,
            config,
            params,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        self.params
            .user_id
            .as_deref()
            .unwrap_or(&self.config.default_user_id)
    }

    /// Drive the connection until it is closed. Never fails: every error is
    /// either reported to the client or ends the connection quietly.
    pub async fn run<C: ClientChannel>(self, mut channel: C) {
        let mut state = ConnectionState::Connecting;
        loop {
            state = match state {
                ConnectionState::Connecting => self.open(&mut channel).await,
                ConnectionState::Active(lease) => self.serve_next(&mut channel, lease).await,
                ConnectionState::Closed => break,
            };
        }
        channel.close().await;
        info!("[{}] Connection closed", self.id);
    }

    /// Announce the connection, then resolve the intent and open the session
    async fn open<C: ClientChannel>(&self, channel: &mut C) -> ConnectionState {
        if channel.send(&Envelope::start()).await.is_err() {
            return ConnectionState::Closed;
        }

        match self.establish().await {
            Ok(lease) => ConnectionState::Active(lease),
            Err(e) => {
                warn!(code = e.code(), "[{}] Connection setup failed: {}", self.id, e);
                let _ = channel.send(&Envelope::from(&e)).await;
                ConnectionState::Closed
            }
        }
    }

    async fn establish(&self) -> Result<SessionLease, ChatError> {
        let intent = self.intents.resolve_default_intent()?;
        debug!("[{}] Routing to intent {}", self.id, intent.name);
        self.sessions
            .get_or_create_session(&self.id, &intent, self.user_id(), self.params.session_id.as_deref())
            .await
    }

    /// Handle one inbound frame while active
    async fn serve_next<C: ClientChannel>(&self, channel: &mut C, lease: SessionLease) -> ConnectionState {
        let frame = match self.config.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, channel.recv()).await {
                Ok(frame) => frame,
                Err(_) => {
                    info!("[{}] - [{}] Idle for {:?}, closing", self.id, lease.session().id(), limit);
                    return ConnectionState::Closed;
                }
            },
            None => channel.recv().await,
        };

        let raw = match frame {
            ClientFrame::Payload(raw) => raw,
            ClientFrame::Ignored => return ConnectionState::Active(lease),
            ClientFrame::Closed => {
                info!("[{}] - [{}] Client disconnected", self.id, lease.session().id());
                return ConnectionState::Closed;
            }
        };

        let outcome = match InboundMessage::parse(&raw) {
            Ok(message) => self.turn(channel, lease.session(), &message.text).await,
            Err(e) => {
                warn!(code = e.code(), "[{}] - [{}] Rejected payload: {}", self.id, lease.session().id(), e);
                channel.send(&Envelope::from(&e)).await
            }
        };

        match outcome {
            Err(e) if e.is_fatal() => {
                info!("[{}] - [{}] Closing after send failure: {}", self.id, lease.session().id(), e);
                ConnectionState::Closed
            }
            Err(e) => {
                warn!(code = e.code(), "[{}] - [{}] Send failed: {}", self.id, lease.session().id(), e);
                ConnectionState::Active(lease)
            }
            Ok(()) => ConnectionState::Active(lease),
        }
    }

    /// Relay one message and forward the reply. Fails only when a send fails.
    /// The chat record is logged either way, with whatever answer was delivered.
    async fn turn<C: ClientChannel>(
        &self,
        channel: &mut C,
        session: &ChatSession,
        text: &str,
    ) -> Result<(), ChatError> {
        info!("[{}] - [{}] New message", self.id, session.id());
        let mut record = ChatRecord::new(session.id(), session.user_id(), &session.intent.name, text);

        let outcome = self.forward(channel, session, text, &mut record).await;
        if let Err(e) = &outcome {
            record.error.get_or_insert_with(|| e.to_string());
        }
        self.logger.log_response(record);
        outcome
    }

    async fn forward<C: ClientChannel>(
        &self,
        channel: &mut C,
        session: &ChatSession,
        text: &str,
        record: &mut ChatRecord,
    ) -> Result<(), ChatError> {
        match relay(session, text, &self.config.relay).await {
            Ok(mut envelopes) => {
                while let Some(envelope) = envelopes.next().await {
                    channel.send(&envelope).await?;
                    match envelope {
                        Envelope::Answer { answer } => {
                            record.answer.push_str(answer.text.as_deref().unwrap_or_default());
                        }
                        Envelope::Error { error } => record.error = Some(error),
                        Envelope::Operation { .. } => {}
                    }
                }
            }
            Err(e) => {
                warn!(code = e.code(), "[{}] - [{}] Turn failed: {}", self.id, session.id(), e);
                record.error = Some(e.to_string());
                channel.send(&Envelope::from(&e)).await?;
                channel.send(&Envelope::end_of_turn()).await?;
            }
        }
        Ok(())
    }
}
