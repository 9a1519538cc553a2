use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use finorch::config::{AppConfig, Provider};
use finorch::llm::ChatModel;
use finorch::ollama::ChatClient;
use finorch::openai::CompletionsClient;
use finorch::server::{self, AppState};
use finorch::{AgentController, SessionStore, ToolInvoker, ToolRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::parse();

    finorch::tracing::init_tracing("finorch", config.otlp_endpoint.as_deref(), config.json_logs)?;

    if let Err(e) = run(config).await {
        error!(error = %e, "Server exited with an error");
        finorch::tracing::shutdown_tracing();
        return Err(e);
    }

    finorch::tracing::shutdown_tracing();
    Ok(())
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;
    let agent_config = config.agent_config();
    let sessions = Arc::new(SessionStore::new(config.session_config()?));

    let model: Arc<dyn ChatModel> = match config.provider {
        Provider::Ollama => Arc::new(
            ChatClient::new(&config.ollama_url, &agent_config.model)
                .with_temperature(agent_config.temperature),
        ),
        Provider::Openai => Arc::new(
            CompletionsClient::new(&config.openai_url, &agent_config.model)
                .with_api_key(config.openai_api_key.clone())
                .with_temperature(agent_config.temperature),
        ),
    };

    let registry = ToolRegistry::with_builtin_tools();
    info!(
        provider = ?config.provider,
        model = %agent_config.model,
        tools = registry.len(),
        max_rounds = agent_config.max_rounds,
        session_capacity = sessions.capacity(),
        "Starting finorch"
    );

    let controller = Arc::new(AgentController::new(
        model,
        ToolInvoker::new(registry),
        sessions,
        agent_config,
    ));

    let listener = TcpListener::bind(config.bind).await?;
    let router = server::create_router(AppState { controller });
    server::serve(listener, router, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
