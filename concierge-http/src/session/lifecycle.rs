use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::ChatSession;

pub(crate) type ActiveRegistry = Arc<Mutex<HashMap<String, ActiveSession>>>;

/// Bookkeeping for one connection holding a session slot
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSession {
    pub connection_id: String,
    pub session_id: Option<String>,
    pub intent: Option<String>,
    pub opened_at: DateTime<Utc>,
}

/// A reserved slot in the session manager
/// Dropping it frees the slot, whether or not a session was ever attached
#[derive(Debug)]
pub struct ActiveSlot {
    connection_id: String,
    registry: ActiveRegistry,
}

impl ActiveSlot {
    pub(crate) fn new(connection_id: String, registry: ActiveRegistry) -> Self {
        Self {
            connection_id,
            registry,
        }
    }

    pub(crate) fn record(&self, session: &ChatSession) {
        if let Ok(mut active) = self.registry.lock() {
            if let Some(entry) = active.get_mut(&self.connection_id) {
                entry.session_id = Some(session.id().to_string());
                entry.intent = Some(session.intent.name.clone());
            }
        }
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        if let Ok(mut active) = self.registry.lock() {
            active.remove(&self.connection_id);
        }
    }
}

/// A connection's claim on its remote session
/// Held for the lifetime of the connection; dropping it releases the slot.
/// The remote session itself is left to expire on the agent service.
#[derive(Debug)]
pub struct SessionLease {
    slot: ActiveSlot,
    session: ChatSession,
}

impl SessionLease {
    pub(crate) fn new(slot: ActiveSlot, session: ChatSession) -> Self {
        slot.record(&session);
        Self { slot, session }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn connection_id(&self) -> &str {
        &self.slot.connection_id
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        debug!(
            "[{}] - [{}] Connection closed, releasing session",
            self.slot.connection_id,
            self.session.id()
        );
    }
}
