mod lifecycle;
mod chat;
mod manager;

pub use lifecycle::{ActiveSession, ActiveSlot, SessionLease};
pub use chat::ChatSession;
pub use manager::{SessionManager, SessionManagerConfig};
