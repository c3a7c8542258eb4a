use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::RemoteAgentService;
use crate::apis;
use crate::connection::ConnectionConfig;
use crate::history::ResponseLogger;
use crate::intent::IntentRegistry;
use crate::session::{SessionManager, SessionManagerConfig};

/// Configuration for the HTTP server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address (e.g., "127.0.0.1:8080")
    pub address: String,
    /// Session manager configuration
    pub session_manager: SessionManagerConfig,
    /// Per-connection settings
    pub connection: ConnectionConfig,
}

impl ServerConfig {
    /// Create a new server config with the given address and default settings
    pub fn new(address: String) -> Self {
        Self {
            address,
            session_manager: SessionManagerConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }

    /// Set the maximum number of concurrent sessions
    pub fn with_max_sessions(mut self, max_sessions: Option<usize>) -> Self {
        self.session_manager.max_sessions = max_sessions;
        self
    }

    /// Set the user id used when clients do not send one
    pub fn with_default_user_id(mut self, user_id: String) -> Self {
        self.connection.default_user_id = user_id;
        self
    }

    /// Bound the wait for each fragment of a remote stream
    pub fn with_fragment_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connection.relay.fragment_timeout = timeout;
        self
    }

    /// Close connections idle for longer than `timeout`
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connection.idle_timeout = timeout;
        self
    }
}

/// Server state shared by every request
#[derive(Clone)]
pub struct ServerState {
    pub session_manager: Arc<SessionManager>,
    pub intents: Arc<IntentRegistry>,
    pub logger: Arc<dyn ResponseLogger>,
    pub connection: ConnectionConfig,
}

impl ServerState {
    pub fn new(
        config: &ServerConfig,
        intents: IntentRegistry,
        agents: Arc<dyn RemoteAgentService>,
        logger: Arc<dyn ResponseLogger>,
    ) -> Self {
        Self {
            session_manager: Arc::new(SessionManager::new(agents, config.session_manager.clone())),
            intents: Arc::new(intents),
            logger,
            connection: config.connection.clone(),
        }
    }
}

/// Build the application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        // Chat relay
        .route("/api/chats", get(apis::handle_chat_socket))
        // Routing configuration
        .route("/api/intents", get(apis::handle_list_intents))
        .route("/api/intents/{name}", get(apis::handle_get_intent))
        .route("/health", get(apis::handle_health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown requested");
}

/// Start the HTTP server
pub async fn start_server(
    config: ServerConfig,
    state: ServerState,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("✓ Session manager initialized");
    if let Some(max) = config.session_manager.max_sessions {
        println!("  Max sessions: \x1b[1m{}\x1b[0m", max);
    } else {
        println!("  Max sessions: \x1b[1munlimited\x1b[0m");
    }
    println!("  Default user: \x1b[1m{}\x1b[0m", config.connection.default_user_id);
    println!();

    let listener = tokio::net::TcpListener::bind(&config.address).await?;

    println!("Server starting on \x1b[1mhttp://{}\x1b[0m", config.address);
    println!("\nAvailable endpoints:");
    println!("  \x1b[1mGET  /api/chats\x1b[0m                - Chat relay (WebSocket)");
    println!("  \x1b[1mGET  /api/intents\x1b[0m              - List intents");
    println!("  \x1b[1mGET  /api/intents/:name\x1b[0m        - Get intent by name");
    println!("  \x1b[1mGET  /health\x1b[0m                   - Health check");

    if let Some(default) = state.intents.default_name() {
        println!("\nDefault intent: \x1b[2m{}\x1b[0m", default);
    }

    println!("\nPress Ctrl+C to stop\n");

    info!("HTTP server listening on {}", config.address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
