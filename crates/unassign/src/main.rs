//! Unassign service binary.
//!
//! Standalone service: periodic mark-and-sweep of the configured
//! repositories plus an HTTP endpoint for GitHub webhook deliveries.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use unassign::platform::github::GitHub;
use unassign::platform::traits::IssueHost;
use unassign::{scheduler, server, Config, EventReactor, LifecycleEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("unassign=info".parse()?))
        .init();

    info!("Starting unassign service...");

    // Load configuration
    let config = Config::default();

    let token = config
        .github_token
        .clone()
        .context("GITHUB_TOKEN is not configured")?;

    if !config.repos.is_empty() && config.days_until_no_response.is_none() {
        anyhow::bail!("DAYS_UNTIL_NO_RESPONSE must be configured to sweep repositories");
    }

    if !config.perform {
        info!("PERFORM is not set - running in dry-run mode, no mutations will be made");
    }

    let host: Arc<dyn IssueHost> = Arc::new(GitHub::new(&token)?);
    let engine = Arc::new(LifecycleEngine::new(host.clone()));
    let reactor = Arc::new(EventReactor::new(host, config.clone()));

    if config.repos.is_empty() {
        warn!("GITHUB_REPOS is empty - no repositories will be swept");
    } else {
        let scheduler_engine = engine.clone();
        let scheduler_config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler::run(scheduler_engine, scheduler_config).await {
                tracing::error!(error = %e, "sweep scheduler exited");
            }
        });
    }

    let state = server::AppState {
        config: config.clone(),
        reactor,
    };
    let app = server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(addr = %addr, "Listening for GitHub webhooks");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
