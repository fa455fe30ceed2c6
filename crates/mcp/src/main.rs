use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use monkey_mcp::config::{Cli, Command};
use monkey_mcp::http::router;
use monkey_mcp::server::{run_stdio, McpServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monkey_mcp=info,monkey_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app = router(config.pipeline(), &config.prefix);
            let listener = tokio::net::TcpListener::bind(&config.bind)
                .await
                .with_context(|| format!("failed to bind {}", config.bind))?;
            info!(addr = %config.bind, "serving chat endpoint");
            axum::serve(listener, app).await?;
        }
        Command::Mcp => {
            info!("serving MCP over stdio");
            run_stdio(McpServer::new(config.tools())).await?;
        }
    }

    Ok(())
}
