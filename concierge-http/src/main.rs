use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use concierge_http::agent::echo::EchoAgentService;
use concierge_http::agent::vertex::{AgentEngineConfig, AgentEngineService};
use concierge_http::agent::RemoteAgentService;
use concierge_http::connection::DEFAULT_USER_ID;
use concierge_http::{
    start_server, IntentRegistry, JsonlResponseLogger, ResponseLogger, ServerConfig, ServerState,
    TracingResponseLogger,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Vertex AI Agent Engine deployments
    AgentEngine,
    /// Offline echo agent
    Echo,
}

#[derive(Parser, Debug)]
#[command(name = "concierge", version, about = "WebSocket chat relay for remote conversational agents")]
struct Cli {
    /// Address to bind (host:port)
    #[arg(long, env = "CONCIERGE_ADDRESS", default_value = "127.0.0.1:8080")]
    address: String,

    /// JSON file describing the available intents
    #[arg(long, env = "CONCIERGE_INTENTS_FILE", conflicts_with = "agent_resource_id")]
    intents: Option<PathBuf>,

    /// Resource id of the agent serving the default intent
    #[arg(long, env = "CONCIERGE_AGENT_RESOURCE_ID")]
    agent_resource_id: Option<String>,

    /// Remote agent backend
    #[arg(long, env = "CONCIERGE_BACKEND", value_enum, default_value = "agent-engine")]
    backend: Backend,

    /// Agent Engine API endpoint override
    #[arg(long, env = "CONCIERGE_AGENT_ENDPOINT")]
    agent_endpoint: Option<String>,

    /// OAuth access token for the Agent Engine API
    #[arg(long, env = "CONCIERGE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// User id for clients that do not supply one
    #[arg(long, env = "CONCIERGE_DEFAULT_USER_ID", default_value = DEFAULT_USER_ID)]
    default_user_id: String,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, env = "CONCIERGE_MAX_SESSIONS", default_value_t = 100)]
    max_sessions: usize,

    /// Seconds to wait for each fragment of an agent reply (0 = no limit)
    #[arg(long, env = "CONCIERGE_FRAGMENT_TIMEOUT", default_value_t = 120)]
    fragment_timeout: u64,

    /// Seconds a connection may stay silent before it is closed (0 = no limit)
    #[arg(long, env = "CONCIERGE_IDLE_TIMEOUT", default_value_t = 0)]
    idle_timeout: u64,

    /// Folder receiving chat history as JSON lines
    #[arg(long, env = "CONCIERGE_HISTORY_DIR")]
    history_dir: Option<PathBuf>,
}

fn seconds(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

fn load_intents(cli: &Cli) -> anyhow::Result<IntentRegistry> {
    match (&cli.intents, &cli.agent_resource_id) {
        (Some(path), _) => Ok(IntentRegistry::load(path)?),
        (None, Some(resource_id)) => Ok(IntentRegistry::single(resource_id.clone())),
        (None, None) if cli.backend == Backend::Echo => Ok(IntentRegistry::single("echo")),
        (None, None) => bail!("either --intents or --agent-resource-id is required"),
    }
}

fn build_agents(cli: &Cli) -> anyhow::Result<Arc<dyn RemoteAgentService>> {
    Ok(match cli.backend {
        Backend::Echo => Arc::new(EchoAgentService::new(Duration::from_millis(50))),
        Backend::AgentEngine => {
            let config = AgentEngineConfig {
                endpoint: cli.agent_endpoint.clone(),
                access_token: cli.access_token.clone(),
                ..Default::default()
            };
            Arc::new(AgentEngineService::new(config).context("failed to build Agent Engine client")?)
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let intents = load_intents(&cli)?;
    let agents = build_agents(&cli)?;
    let logger: Arc<dyn ResponseLogger> = match &cli.history_dir {
        Some(dir) => Arc::new(JsonlResponseLogger::new(dir.clone())),
        None => Arc::new(TracingResponseLogger),
    };

    let config = ServerConfig::new(cli.address.clone())
        .with_max_sessions((cli.max_sessions > 0).then_some(cli.max_sessions))
        .with_default_user_id(cli.default_user_id.clone())
        .with_fragment_timeout(seconds(cli.fragment_timeout))
        .with_idle_timeout(seconds(cli.idle_timeout));

    let state = ServerState::new(&config, intents, agents, logger);
    start_server(config, state)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))
}
