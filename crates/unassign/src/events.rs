//! Reaction to inbound activity events.
//!
//! A comment or issue update on a flagged issue lifts the flag, unless the
//! event came from the bot itself or is the label-add the sweep just
//! performed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::platform::traits::{
    Issue, IssueHost, IssueState, Label, PlatformError, PullRequestMarker, User,
};
use crate::sweep::actions::ActionExecutor;
use crate::sweep::labels::NO_RESPONSE_LABEL;
use crate::sweep::RepositoryContext;

/// Issue or pull request as delivered in a webhook payload.
///
/// Some payloads omit the label set; `labels: None` means absent, not empty.
#[derive(Debug, Clone, Deserialize)]
pub struct EventIssue {
    /// Issue number.
    pub number: u64,
    /// Open/closed state.
    pub state: IssueState,
    /// Whether the conversation is locked.
    #[serde(default)]
    pub locked: bool,
    /// Assigned users.
    #[serde(default)]
    pub assignees: Vec<User>,
    /// Labels, when the payload included them.
    pub labels: Option<Vec<Label>>,
    /// Last-activity timestamp.
    pub updated_at: DateTime<Utc>,
    /// Present when this entry is a pull request.
    #[serde(default)]
    pub pull_request: Option<PullRequestMarker>,
}

impl EventIssue {
    /// Convert into the engine's issue model; only valid when the payload
    /// included labels.
    fn into_issue(self) -> Issue {
        Issue {
            number: self.number,
            state: self.state,
            locked: self.locked,
            assignees: self.assignees,
            labels: self.labels.unwrap_or_default(),
            updated_at: self.updated_at,
            pull_request: self.pull_request,
        }
    }
}

/// The user who triggered an event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventSender {
    /// Sender login.
    pub login: String,
    /// Account type (`User`, `Bot`, `Organization`).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl EventSender {
    /// Whether the sender is a bot account.
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.kind.as_deref() == Some("Bot")
    }
}

/// Repository an event belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRepository {
    /// Repository name.
    pub name: String,
    /// Full name (owner/repo).
    pub full_name: String,
    /// Repository owner.
    pub owner: User,
}

/// Inbound activity event from an `issues` or `issue_comment` webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityEvent {
    /// Action type (created, edited, labeled, ...).
    pub action: String,
    /// Issue payload, when the event concerns an issue.
    #[serde(default)]
    pub issue: Option<EventIssue>,
    /// Pull request payload, when the event concerns a pull request.
    #[serde(default)]
    pub pull_request: Option<EventIssue>,
    /// The label added or removed, for `labeled`/`unlabeled` actions.
    #[serde(default)]
    pub label: Option<Label>,
    /// The user who triggered the event.
    #[serde(default)]
    pub sender: Option<EventSender>,
    /// Repository info.
    pub repository: EventRepository,
}

impl ActivityEvent {
    /// The issue or pull request the event concerns.
    #[must_use]
    pub fn subject(&self) -> Option<&EventIssue> {
        self.issue.as_ref().or(self.pull_request.as_ref())
    }

    /// Whether this event is the sentinel-label-add just performed by a mark.
    #[must_use]
    pub fn is_sentinel_label_add(&self) -> bool {
        self.action == "labeled"
            && self
                .label
                .as_ref()
                .is_some_and(|label| label.name == NO_RESPONSE_LABEL)
    }
}

/// Reacts to inbound activity events by unmarking flagged issues.
pub struct EventReactor {
    host: Arc<dyn IssueHost>,
    executor: ActionExecutor,
    config: Config,
}

impl EventReactor {
    /// Create a new reactor over the given host.
    #[must_use]
    pub fn new(host: Arc<dyn IssueHost>, config: Config) -> Self {
        Self {
            executor: ActionExecutor::new(host.clone()),
            host,
            config,
        }
    }

    /// Handle one inbound activity event.
    ///
    /// Events from the bot itself are ignored to prevent feedback loops from
    /// its own comments and label edits. When the payload omitted the label
    /// set, the issue is fetched fresh before deciding.
    ///
    /// # Errors
    ///
    /// Returns the platform error of a failed unmark call.
    pub async fn on_activity(&self, event: &ActivityEvent) -> Result<(), PlatformError> {
        let Some(sender) = event.sender.as_ref() else {
            debug!(action = %event.action, "event has no sender; ignoring");
            return Ok(());
        };

        if sender.is_bot() || self.is_own_login(&sender.login) {
            debug!(
                sender = %sender.login,
                action = %event.action,
                "ignoring event from the bot itself"
            );
            return Ok(());
        }

        let Some(subject) = event.subject() else {
            debug!(action = %event.action, "event carries no issue; ignoring");
            return Ok(());
        };

        let owner = event.repository.owner.login.clone();
        let repo = event.repository.name.clone();
        let number = subject.number;

        // Some payloads don't include labels; fetch the issue fresh then.
        let issue = if subject.labels.is_some() {
            subject.clone().into_issue()
        } else {
            match self.host.get_issue(&owner, &repo, number).await {
                Ok(issue) => issue,
                Err(e) => {
                    warn!(
                        owner = %owner,
                        repo = %repo,
                        number = number,
                        error = %e,
                        "failed to fetch issue for activity event"
                    );
                    return Ok(());
                }
            }
        };

        if event.is_sentinel_label_add() {
            debug!(
                owner = %owner,
                repo = %repo,
                number = number,
                "sentinel label was just added by this event; not unmarking"
            );
            return Ok(());
        }

        if issue.is_open() && issue.has_label(NO_RESPONSE_LABEL) {
            info!(
                owner = %owner,
                repo = %repo,
                number = number,
                sender = %sender.login,
                "activity on flagged issue; unmarking"
            );
            let ctx = RepositoryContext::new(&owner, &repo, self.config.clone());
            self.executor.unmark(&ctx, &issue).await?;
        }

        Ok(())
    }

    /// Whether a login is the bot's own configured login.
    fn is_own_login(&self, login: &str) -> bool {
        self.config
            .bot_login
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(login))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_json(action: &str, labels: &str, sender_type: &str) -> String {
        format!(
            r#"{{
                "action": "{action}",
                "issue": {{
                    "number": 42,
                    "state": "open",
                    "locked": false,
                    "assignees": [{{"login": "bob", "id": 2}}],
                    {labels}
                    "updated_at": "2024-05-01T12:00:00Z"
                }},
                "sender": {{"login": "bob", "type": "{sender_type}"}},
                "repository": {{
                    "name": "widgets",
                    "full_name": "octo/widgets",
                    "owner": {{"login": "octo", "id": 1}}
                }}
            }}"#
        )
    }

    #[test]
    fn test_deserialize_event_with_labels() {
        let json = event_json(
            "created",
            r#""labels": [{"name": "issue assignee: no-response"}],"#,
            "User",
        );
        let event: ActivityEvent = serde_json::from_str(&json).unwrap();

        let subject = event.subject().unwrap();
        assert_eq!(subject.number, 42);
        assert!(subject.labels.is_some());
        assert!(!event.sender.as_ref().unwrap().is_bot());
    }

    #[test]
    fn test_deserialize_event_without_labels() {
        let json = event_json("created", "", "User");
        let event: ActivityEvent = serde_json::from_str(&json).unwrap();

        assert!(event.subject().unwrap().labels.is_none());
    }

    #[test]
    fn test_bot_sender_detected() {
        let json = event_json("created", r#""labels": [],"#, "Bot");
        let event: ActivityEvent = serde_json::from_str(&json).unwrap();

        assert!(event.sender.as_ref().unwrap().is_bot());
    }

    #[test]
    fn test_sentinel_label_add_detected() {
        let mut event: ActivityEvent =
            serde_json::from_str(&event_json("labeled", r#""labels": [],"#, "User")).unwrap();
        event.label = Some(Label {
            name: NO_RESPONSE_LABEL.to_string(),
            color: None,
        });
        assert!(event.is_sentinel_label_add());

        event.label = Some(Label {
            name: "bug".to_string(),
            color: None,
        });
        assert!(!event.is_sentinel_label_add());

        event.action = "unlabeled".to_string();
        event.label = Some(Label {
            name: NO_RESPONSE_LABEL.to_string(),
            color: None,
        });
        assert!(!event.is_sentinel_label_add());
    }
}
