pub mod agent;
pub mod apis;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod history;
pub mod http;
pub mod intent;
pub mod relay;
pub mod session;

pub use connection::{ChatConnection, ClientChannel, ClientFrame, ConnectionConfig, ConnectionParams};
pub use envelope::{Envelope, InboundMessage, Operation};
pub use error::{AgentError, ChatError, ErrorResponse};
pub use history::{ChatRecord, JsonlResponseLogger, ResponseLogger, TracingResponseLogger};
pub use http::{router, start_server, ServerConfig, ServerState};
pub use intent::{Intent, IntentRegistry, IntentResolver};
pub use relay::{relay, RelayOptions, TurnStream};
pub use session::{ChatSession, SessionLease, SessionManager, SessionManagerConfig};
