//! Periodic sweep scheduling, one loop per repository.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::sweep::{LifecycleEngine, RepositoryContext};

/// Run sweep loops for every configured repository until shutdown.
///
/// Each repository gets its own task: an initial randomized stagger within
/// one checking interval (unless disabled), then a fixed-period tick loop.
/// Ticks of one repository never overlap because the loop awaits each sweep.
///
/// # Errors
///
/// Returns an error when no repository survives parsing.
pub async fn run(engine: Arc<LifecycleEngine>, config: Config) -> Result<()> {
    let period = Duration::from_secs(config.checking_interval_minutes.max(1) * 60);
    let mut handles = Vec::new();

    for repo in &config.repos {
        let Some((owner, name)) = parse_repo(repo) else {
            warn!(repo = %repo, "Invalid repository format (expected owner/repo)");
            continue;
        };

        let ctx = RepositoryContext::new(owner, name, config.clone());
        let delay = if config.disable_delay {
            Duration::ZERO
        } else {
            period.mul_f64(rand::random::<f64>())
        };

        handles.push(tokio::spawn(repository_loop(
            engine.clone(),
            ctx,
            delay,
            period,
        )));
    }

    if handles.is_empty() {
        anyhow::bail!("no valid repositories configured for sweeping");
    }

    info!(
        repositories = handles.len(),
        interval_minutes = config.checking_interval_minutes,
        "sweep scheduler started"
    );

    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

/// Tick loop for a single repository.
async fn repository_loop(
    engine: Arc<LifecycleEngine>,
    ctx: RepositoryContext,
    initial_delay: Duration,
    period: Duration,
) {
    if !initial_delay.is_zero() {
        debug!(
            owner = %ctx.owner,
            repo = %ctx.repo,
            delay_secs = initial_delay.as_secs(),
            "staggering first sweep"
        );
        tokio::time::sleep(initial_delay).await;
    }

    let mut ticker = tokio::time::interval(period);
    // A sweep longer than the period must not produce a burst of catch-up ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = engine.sweep(&ctx).await {
            error!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                error = %e,
                "sweep failed"
            );
        }
    }
}

/// Split an `owner/repo` string.
fn parse_repo(repo: &str) -> Option<(&str, &str)> {
    let (owner, name) = repo.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner, name))
}
