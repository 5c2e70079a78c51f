//! Staleness scanning for mark and unassign candidates.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

use super::budget::MAX_ACTIONS_PER_RUN;
use super::labels::NO_RESPONSE_LABEL;
use super::RepositoryContext;
use crate::platform::traits::{
    Issue, IssueHost, IssueQuery, IssueState, SortDirection, SortKey, TargetKind,
};

/// Queries and filters issues by staleness.
pub struct InactivityScanner {
    host: Arc<dyn IssueHost>,
}

impl InactivityScanner {
    /// Create a new scanner over the given host.
    #[must_use]
    pub fn new(host: Arc<dyn IssueHost>) -> Self {
        Self { host }
    }

    /// Open, unlocked, assigned, non-pull-request issues without the
    /// sentinel label whose last activity is older than the mark threshold.
    ///
    /// Results are ordered oldest-activity-first so budget truncation is
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns an error when the mark threshold is not configured, before any
    /// query is issued, or when the listing fails.
    pub async fn find_mark_candidates(&self, ctx: &RepositoryContext) -> Result<Vec<Issue>> {
        let days = ctx
            .config
            .days_until_no_response
            .context("DAYS_UNTIL_NO_RESPONSE is not configured")?;

        let mut exclude_labels = vec![NO_RESPONSE_LABEL.to_string()];
        exclude_labels.extend(ctx.config.exempt_labels.iter().cloned());

        let query = IssueQuery {
            kind: TargetKind::Issue,
            state: IssueState::Open,
            locked: Some(false),
            assigned: Some(true),
            labels: Vec::new(),
            exclude_labels,
            updated_before: Some(since(days)),
            sort: SortKey::Updated,
            direction: SortDirection::Ascending,
            per_page: MAX_ACTIONS_PER_RUN as u8,
        };

        let mut issues = self
            .host
            .list_issues(&ctx.owner, &ctx.repo, &query)
            .await
            .context("failed to list mark candidates")?;
        sort_oldest_first(&mut issues);

        debug!(
            owner = %ctx.owner,
            repo = %ctx.repo,
            count = issues.len(),
            "found mark candidates"
        );
        Ok(issues)
    }

    /// Open, unlocked issues carrying the sentinel label whose last activity
    /// is older than the unassign threshold.
    ///
    /// Returns an empty set without querying when the unassign threshold is
    /// not configured.
    ///
    /// # Errors
    ///
    /// Returns an error when the listing fails.
    pub async fn find_unassign_candidates(&self, ctx: &RepositoryContext) -> Result<Vec<Issue>> {
        let Some(days) = ctx.config.days_until_unassign else {
            trace!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                "configured to leave flagged issues assigned"
            );
            return Ok(Vec::new());
        };

        let query = IssueQuery {
            kind: TargetKind::Issue,
            state: IssueState::Open,
            locked: Some(false),
            assigned: None,
            labels: vec![NO_RESPONSE_LABEL.to_string()],
            exclude_labels: Vec::new(),
            updated_before: Some(since(days)),
            sort: SortKey::Updated,
            direction: SortDirection::Ascending,
            per_page: MAX_ACTIONS_PER_RUN as u8,
        };

        let mut issues = self
            .host
            .list_issues(&ctx.owner, &ctx.repo, &query)
            .await
            .context("failed to list unassign candidates")?;
        sort_oldest_first(&mut issues);

        debug!(
            owner = %ctx.owner,
            repo = %ctx.repo,
            count = issues.len(),
            "found unassign candidates"
        );
        Ok(issues)
    }
}

/// Staleness cutoff: `days` days before now, clamped at the Unix epoch.
///
/// The platform rejects pre-epoch timestamps in listing queries. Fractional
/// day values are permitted.
#[must_use]
pub fn since(days: f64) -> DateTime<Utc> {
    #[allow(clippy::cast_possible_truncation)]
    let ttl_ms = (days * 86_400_000_f64) as i64;
    let cutoff = Utc::now()
        .checked_sub_signed(Duration::milliseconds(ttl_ms))
        .unwrap_or(DateTime::UNIX_EPOCH);
    cutoff.max(DateTime::UNIX_EPOCH)
}

/// Order oldest activity first, ties broken by issue number ascending.
fn sort_oldest_first(issues: &mut [Issue]) {
    issues.sort_by_key(|issue| (issue.updated_at, issue.number));
}
