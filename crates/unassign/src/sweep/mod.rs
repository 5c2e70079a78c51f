//! Mark-and-sweep lifecycle engine.
//!
//! One sweep per repository per tick: flag assigned issues that have gone
//! quiet, then clear the assignee of issues that stayed quiet after being
//! flagged. Both phases run sequentially over one shared action budget.

pub mod actions;
pub mod budget;
pub mod labels;
pub mod scanner;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::platform::traits::{Issue, IssueHost};
use self::actions::ActionExecutor;
use self::budget::RunBudget;
use self::labels::SentinelLabelAdmin;
use self::scanner::InactivityScanner;

/// Immutable per-sweep value: repository coordinates plus a configuration
/// snapshot. Constructed once per invocation and threaded explicitly.
#[derive(Clone)]
pub struct RepositoryContext {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Configuration snapshot for this sweep.
    pub config: Config,
}

impl RepositoryContext {
    /// Create a new context.
    #[must_use]
    pub fn new(owner: &str, repo: &str, config: Config) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            config,
        }
    }

    /// Get the full repository path (owner/repo).
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    /// Issues marked (or, in dry-run, that would have been marked).
    pub marked: u32,
    /// Issues unassigned (or that would have been).
    pub unassigned: u32,
    /// Candidates skipped because they no longer satisfied preconditions.
    pub skipped: u32,
    /// Candidates whose action failed.
    pub errors: u32,
    /// Candidates left for the next tick after the budget ran out.
    pub deferred: u32,
}

/// Orchestrates one sweep: scan, filter, act.
pub struct LifecycleEngine {
    label_admin: SentinelLabelAdmin,
    scanner: InactivityScanner,
    executor: ActionExecutor,
}

impl LifecycleEngine {
    /// Create a new engine over the given host.
    #[must_use]
    pub fn new(host: Arc<dyn IssueHost>) -> Self {
        Self {
            label_admin: SentinelLabelAdmin::new(host.clone()),
            scanner: InactivityScanner::new(host.clone()),
            executor: ActionExecutor::new(host),
        }
    }

    /// Run one mark-then-unassign sweep over a repository.
    ///
    /// The mark phase and the unassign phase draw from one shared budget and
    /// run sequentially, so the per-sweep action ceiling is exact. A listing
    /// failure aborts only its phase; a single issue's failure never aborts
    /// the run.
    ///
    /// # Errors
    ///
    /// Returns an error when the mark threshold is not configured or when
    /// sentinel-label existence cannot be established.
    pub async fn sweep(&self, ctx: &RepositoryContext) -> Result<SweepSummary> {
        info!(
            owner = %ctx.owner,
            repo = %ctx.repo,
            perform = ctx.config.perform,
            "starting mark and sweep"
        );

        ctx.config
            .days_until_no_response
            .context("DAYS_UNTIL_NO_RESPONSE is not configured")?;

        self.label_admin
            .ensure_exists(ctx)
            .await
            .context("failed to ensure sentinel label exists")?;

        let mut budget = RunBudget::new();
        let mut summary = SweepSummary::default();

        match self.scanner.find_mark_candidates(ctx).await {
            Ok(candidates) => {
                self.run_phase(ctx, &candidates, Phase::Mark, &mut budget, &mut summary)
                    .await;
            }
            Err(e) => {
                warn!(
                    owner = %ctx.owner,
                    repo = %ctx.repo,
                    error = %e,
                    "mark phase listing failed; skipping phase"
                );
            }
        }

        match self.scanner.find_unassign_candidates(ctx).await {
            Ok(candidates) => {
                self.run_phase(ctx, &candidates, Phase::Unassign, &mut budget, &mut summary)
                    .await;
            }
            Err(e) => {
                warn!(
                    owner = %ctx.owner,
                    repo = %ctx.repo,
                    error = %e,
                    "unassign phase listing failed; skipping phase"
                );
            }
        }

        info!(
            owner = %ctx.owner,
            repo = %ctx.repo,
            marked = summary.marked,
            unassigned = summary.unassigned,
            skipped = summary.skipped,
            errors = summary.errors,
            deferred = summary.deferred,
            budget_remaining = budget.remaining(),
            "mark and sweep complete"
        );
        Ok(summary)
    }

    /// Drive one phase over its candidates under the shared budget.
    async fn run_phase(
        &self,
        ctx: &RepositoryContext,
        candidates: &[Issue],
        phase: Phase,
        budget: &mut RunBudget,
        summary: &mut SweepSummary,
    ) {
        for (position, issue) in candidates.iter().enumerate() {
            if !budget.reserve() {
                let deferred = u32::try_from(candidates.len() - position).unwrap_or(u32::MAX);
                summary.deferred += deferred;
                info!(
                    owner = %ctx.owner,
                    repo = %ctx.repo,
                    deferred = deferred,
                    "action budget exhausted; deferring remaining candidates to the next tick"
                );
                return;
            }

            let outcome = match phase {
                Phase::Mark => self.executor.mark(ctx, issue).await,
                Phase::Unassign => self.executor.unassign(ctx, issue).await,
            };

            match outcome {
                Ok(true) => match phase {
                    Phase::Mark => summary.marked += 1,
                    Phase::Unassign => summary.unassigned += 1,
                },
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    warn!(
                        owner = %ctx.owner,
                        repo = %ctx.repo,
                        number = issue.number,
                        error = %e,
                        "action failed; continuing with next candidate"
                    );
                    summary.errors += 1;
                }
            }
        }
    }
}

/// The two sequential phases of a sweep.
#[derive(Clone, Copy)]
enum Phase {
    Mark,
    Unassign,
}
