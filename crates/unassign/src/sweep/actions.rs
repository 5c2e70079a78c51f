//! The three mutating actions: mark, unassign, unmark.

use std::sync::Arc;

use tracing::{debug, info};

use super::labels::NO_RESPONSE_LABEL;
use super::RepositoryContext;
use crate::platform::traits::{Issue, IssueHost, PlatformError};

/// Placeholder in the mark-comment template replaced with the assignee
/// mention.
const ASSIGNEE_PLACEHOLDER: &str = "@assignee";

/// Performs (or, in dry-run, logs) the mutating lifecycle actions.
pub struct ActionExecutor {
    host: Arc<dyn IssueHost>,
}

impl ActionExecutor {
    /// Create a new executor over the given host.
    #[must_use]
    pub fn new(host: Arc<dyn IssueHost>) -> Self {
        Self { host }
    }

    /// Flag a quiet assigned issue: notify the assignee, then add the
    /// sentinel label.
    ///
    /// The comment and the label-add are sequential; when the comment fails
    /// the label is not added, since the label's contract is that the
    /// assignee was notified. Returns `false` when the issue no longer
    /// satisfies the preconditions and nothing was done.
    ///
    /// # Errors
    ///
    /// Returns the platform error of the failed comment or label call.
    pub async fn mark(
        &self,
        ctx: &RepositoryContext,
        issue: &Issue,
    ) -> Result<bool, PlatformError> {
        if issue.is_pull_request()
            || !issue.has_assignee()
            || issue.has_label(NO_RESPONSE_LABEL)
            || issue.locked
            || !issue.is_open()
        {
            debug!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                number = issue.number,
                "issue no longer eligible for marking"
            );
            return Ok(false);
        }

        let assignee = &issue.assignees[0].login;
        let body = render_mention(&ctx.config.mark_comment, assignee);

        if ctx.config.perform {
            info!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                number = issue.number,
                assignee = %assignee,
                "marking issue"
            );
            self.host
                .create_comment(&ctx.owner, &ctx.repo, issue.number, &body)
                .await?;
            self.host
                .add_label(&ctx.owner, &ctx.repo, issue.number, NO_RESPONSE_LABEL)
                .await?;
        } else {
            info!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                number = issue.number,
                assignee = %assignee,
                "issue would have been marked (dry-run)"
            );
        }
        Ok(true)
    }

    /// Clear the assignees of an issue that stayed quiet after being flagged:
    /// remove the sentinel label, then clear the assignee list.
    ///
    /// A missing sentinel label on removal is treated as already-satisfied.
    /// Returns `false` when the issue no longer satisfies the preconditions.
    ///
    /// # Errors
    ///
    /// Returns the platform error of the failed call.
    pub async fn unassign(
        &self,
        ctx: &RepositoryContext,
        issue: &Issue,
    ) -> Result<bool, PlatformError> {
        if !issue.is_open() || issue.locked || !issue.has_label(NO_RESPONSE_LABEL) {
            debug!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                number = issue.number,
                "issue no longer eligible for unassigning"
            );
            return Ok(false);
        }

        if ctx.config.perform {
            info!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                number = issue.number,
                "unassigning issue"
            );
            self.remove_sentinel_label(ctx, issue.number).await?;
            if let Some(body) = &ctx.config.unassign_comment {
                self.host
                    .create_comment(&ctx.owner, &ctx.repo, issue.number, body)
                    .await?;
            }
            self.host
                .edit_assignees(&ctx.owner, &ctx.repo, issue.number, &[])
                .await?;
        } else {
            info!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                number = issue.number,
                "issue would have been unassigned (dry-run)"
            );
        }
        Ok(true)
    }

    /// Lift the flag from an issue with renewed activity: remove the sentinel
    /// label.
    ///
    /// Not budget-limited; invoked once per qualifying activity event. A
    /// missing label on removal is treated as already-satisfied. Returns
    /// `false` when the issue is not flagged.
    ///
    /// # Errors
    ///
    /// Returns the platform error of the failed call.
    pub async fn unmark(
        &self,
        ctx: &RepositoryContext,
        issue: &Issue,
    ) -> Result<bool, PlatformError> {
        if !issue.has_label(NO_RESPONSE_LABEL) {
            debug!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                number = issue.number,
                "issue is not flagged; nothing to unmark"
            );
            return Ok(false);
        }

        if ctx.config.perform {
            info!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                number = issue.number,
                "unmarking issue"
            );
            if let Some(body) = &ctx.config.unmark_comment {
                self.host
                    .create_comment(&ctx.owner, &ctx.repo, issue.number, body)
                    .await?;
            }
            self.remove_sentinel_label(ctx, issue.number).await?;
        } else {
            info!(
                owner = %ctx.owner,
                repo = %ctx.repo,
                number = issue.number,
                "issue would have been unmarked (dry-run)"
            );
        }
        Ok(true)
    }

    /// Remove the sentinel label, tolerating not-found as success.
    async fn remove_sentinel_label(
        &self,
        ctx: &RepositoryContext,
        number: u64,
    ) -> Result<(), PlatformError> {
        match self
            .host
            .remove_label(&ctx.owner, &ctx.repo, number, NO_RESPONSE_LABEL)
            .await
        {
            Ok(()) => Ok(()),
            Err(PlatformError::NotFound(_)) => {
                debug!(
                    owner = %ctx.owner,
                    repo = %ctx.repo,
                    number = number,
                    "sentinel label already removed"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Substitute the assignee mention into a comment template.
#[must_use]
pub fn render_mention(template: &str, assignee: &str) -> String {
    template.replace(ASSIGNEE_PLACEHOLDER, &format!("@{assignee}"))
}
