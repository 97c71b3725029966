pub mod application;
pub mod cli;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{gateway, orchestrator, stdio, tooling};
pub use cli::Cli;
pub use config::AppConfig;
pub use domain::types;
pub use infrastructure::model;

use application::gateway::ChatGateway;
use application::orchestrator::{ConversationOrchestrator, OrchestratorOptions};
use application::tooling::{McpProcess, ToolServerSession, resolve_server};
use infrastructure::model::OllamaClient;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Connects to the server script named on the command line and runs the
/// interactive loop. The tool server is shut down on every exit path.
pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_tracing(cli.verbose);
    info!("Starting mcp-client");
    debug!(
        server = ?cli.server,
        config = ?cli.config,
        model = ?cli.model,
        "CLI arguments parsed"
    );

    let target = cli
        .server
        .as_deref()
        .ok_or("missing path to the server script")?;

    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    info!(
        model = %config.model,
        ollama_url = %config.ollama_url,
        context_window = config.context_window,
        "Configuration ready"
    );

    let server = resolve_server(target, &config.launcher)?;
    let session = Arc::new(McpProcess::new(server));
    let result = serve(&config, Arc::clone(&session)).await;
    session.shutdown().await;
    info!("Client execution finished");
    result
}

async fn serve(config: &AppConfig, session: Arc<McpProcess>) -> Result<(), Box<dyn Error>> {
    session.initialize().await?;

    let backend = Arc::new(OllamaClient::new(config.ollama_url.clone()));
    let gateway = ChatGateway::new(backend, config.model.clone(), config.context_window);
    let options = OrchestratorOptions {
        system_prompt: config.system_prompt.clone(),
        chat_timeout: config.chat_timeout,
        tool_timeout: config.tool_timeout,
    };
    let orchestrator = ConversationOrchestrator::new(session, gateway, options);

    orchestrator.catalog().list_tools().await?;
    let tools = orchestrator.catalog().snapshot_names().await;
    let mut stdout = tokio::io::stdout();
    stdio::print_connected(&mut stdout, &tools).await?;

    stdio::run(&orchestrator).await?;
    Ok(())
}

/// Usage line printed when no server script is given.
pub fn usage() -> String {
    let program = std::env::args()
        .next()
        .as_deref()
        .and_then(|arg| Path::new(arg).file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "mcp-client".to_string());
    format!("Usage: {program} <path_to_server_script>")
}

fn init_tracing(verbose: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let fallback = if verbose { "debug" } else { "warn" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
