//! Sentinel label management.

use std::sync::Arc;

use tracing::{debug, info};

use super::RepositoryContext;
use crate::platform::traits::{IssueHost, PlatformError};

/// Name of the sentinel label marking a flagged issue.
pub const NO_RESPONSE_LABEL: &str = "issue assignee: no-response";

/// Color used when the sentinel label has to be created.
pub const NO_RESPONSE_LABEL_COLOR: &str = "ffffff";

/// Ensures the sentinel label exists in a repository.
pub struct SentinelLabelAdmin {
    host: Arc<dyn IssueHost>,
}

impl SentinelLabelAdmin {
    /// Create a new admin over the given host.
    #[must_use]
    pub fn new(host: Arc<dyn IssueHost>) -> Self {
        Self { host }
    }

    /// Ensure the sentinel label exists, creating it when missing.
    ///
    /// Safe to call on every sweep; an existing label is a no-op.
    ///
    /// # Errors
    ///
    /// Any fetch error other than not-found is returned unchanged: without
    /// knowing label existence the sweep cannot proceed.
    pub async fn ensure_exists(&self, ctx: &RepositoryContext) -> Result<(), PlatformError> {
        match self
            .host
            .get_label(&ctx.owner, &ctx.repo, NO_RESPONSE_LABEL)
            .await
        {
            Ok(_) => {
                debug!(
                    owner = %ctx.owner,
                    repo = %ctx.repo,
                    label = NO_RESPONSE_LABEL,
                    "sentinel label already exists"
                );
                Ok(())
            }
            Err(PlatformError::NotFound(_)) => {
                info!(
                    owner = %ctx.owner,
                    repo = %ctx.repo,
                    label = NO_RESPONSE_LABEL,
                    "creating sentinel label"
                );
                self.host
                    .create_label(
                        &ctx.owner,
                        &ctx.repo,
                        NO_RESPONSE_LABEL,
                        NO_RESPONSE_LABEL_COLOR,
                    )
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
