//! In-process server bound to an ephemeral port.

use concierge_http::history::ResponseLogger;
use concierge_http::{router, ChatRecord, IntentRegistry, ServerConfig, ServerState};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;

use super::{ScriptedReplies, Socket};

/// Records every finished turn
#[derive(Default)]
pub struct RecordingLogger {
    pub records: Mutex<Vec<ChatRecord>>,
}

impl ResponseLogger for RecordingLogger {
    fn log_response(&self, record: ChatRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// A running server with automatic shutdown on drop.
pub struct TestServer {
    pub http_url: String,
    pub ws_url: String,
    pub agent: ScriptedReplies,
    pub state: ServerState,
    pub logger: Arc<RecordingLogger>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Serve a single default intent backed by `engines/test`
    pub async fn spawn() -> Self {
        Self::spawn_with(ServerConfig::new("127.0.0.1:0".into()), IntentRegistry::single("engines/test")).await
    }

    pub async fn spawn_with(config: ServerConfig, intents: IntentRegistry) -> Self {
        let agent = ScriptedReplies::new();
        let logger = Arc::new(RecordingLogger::default());
        let state = ServerState::new(&config, intents, Arc::new(agent.clone()), logger.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server failed");
        });

        TestServer {
            http_url: format!("http://{}", addr),
            ws_url: format!("ws://{}/api/chats", addr),
            agent,
            state,
            logger,
            task,
        }
    }

    /// Open the chat socket, optionally with a query string
    pub async fn connect(&self, query: &str) -> Socket {
        let url = if query.is_empty() {
            self.ws_url.clone()
        } else {
            format!("{}?{}", self.ws_url, query)
        };
        let (socket, _) = connect_async(url).await.expect("Failed to connect chat socket");
        socket
    }

    pub fn active_sessions(&self) -> usize {
        self.state.session_manager.active_sessions()
    }

    pub fn records(&self) -> Vec<ChatRecord> {
        self.logger.records.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
