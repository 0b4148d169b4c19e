//! Load balancer backend resolver
//!
//! Logs in to the control plane, resolves the backends of one load balancer
//! (classic, or application narrowed by listener and forwarding rule) and
//! prints them as JSON on stdout.

mod error;
mod selection;

use anyhow::Context;
use cloudplane_client::{ClientConfig, ControlPlaneClient};
use selection::BackendQuery;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting load balancer backend resolver");

    // Load configuration from environment variables
    let config = ClientConfig::from_env().context("loading control plane configuration")?;
    let query = BackendQuery::from_env().context("loading load balancer selection")?;

    info!("Configuration:");
    info!("  Control plane URL: {}", config.base_url);
    info!("  Load balancer: {} ({})", query.lb_id, query.topology);
    info!(
        "  Listener: {}, rule: {}",
        query.listener_id.as_deref().unwrap_or("any"),
        query.rule_id.as_deref().unwrap_or("none")
    );

    let client = ControlPlaneClient::connect(config)
        .await
        .context("logging in to the control plane")?;
    let backends = selection::resolve(&client, &query)
        .await
        .with_context(|| format!("resolving backends of load balancer {}", query.lb_id))?;

    info!("Resolved {} backend(s)", backends.len());
    println!("{}", serde_json::to_string_pretty(&query.report(backends))?);
    Ok(())
}
