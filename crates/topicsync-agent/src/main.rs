//! # topicsync Agent
//!
//! Provisions one broker topic per catalog entity and serves the HTTP API.

use anyhow::Result;
use topicsync_agent::{Agent, AgentConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting topicsync agent"
    );

    // Load configuration
    let config = AgentConfig::from_env()?;

    tracing::info!(
        listen = %config.server.listen,
        catalog = %config.catalog.base_url,
        backend = ?config.admin.backend,
        "Agent configured"
    );

    let agent = Agent::new(config)?;

    // Run agent
    agent.run().await?;

    Ok(())
}
