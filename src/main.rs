//! MCP chat service.
//!
//! Composition root: loads config, builds the single circuit breaker shared
//! by every request, wires the tool connector and agent runtime into the
//! chat orchestrator and serves HTTP until Ctrl+C or SIGTERM.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use mcp_chat_service::agent::OpenAiAgent;
use mcp_chat_service::config;
use mcp_chat_service::http::{shutdown_signal, HttpServer};
use mcp_chat_service::observability;
use mcp_chat_service::tools::StdioConnector;
use mcp_chat_service::{ChatOrchestrator, CircuitBreaker};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_from_env()?;
    observability::init_logging(&config.observability)?;

    tracing::info!("mcp-chat-service v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tool_server = %config.tool_server.name,
        model = %config.agent.model,
        failure_threshold = config.resilience.failure_threshold,
        request_timeout_secs = config.resilience.request_timeout_secs,
        "Configuration loaded"
    );

    let breaker = Arc::new(CircuitBreaker::new(
        config.resilience.failure_threshold,
        config.resilience.recovery_timeout(),
    ));
    let orchestrator = Arc::new(ChatOrchestrator::new(
        &config,
        Arc::new(StdioConnector::new()),
        Arc::new(OpenAiAgent::new(config.agent.clone())),
        breaker,
    ));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config.listener, orchestrator);

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
