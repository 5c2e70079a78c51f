//! Issue-host trait and common types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during issue-host operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlatformError {
    /// Whether this error is the distinguishable not-found outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Open/closed state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    /// Issue is open.
    Open,
    /// Issue is closed.
    Closed,
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Whether a listing targets issues or pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Plain issues.
    Issue,
    /// Pull requests.
    PullRequest,
}

impl TargetKind {
    /// Search-query restriction for this kind.
    #[must_use]
    pub fn query_restriction(self) -> &'static str {
        match self {
            Self::Issue => "is:issue",
            Self::PullRequest => "is:pr",
        }
    }
}

/// Raised when a listing target string is neither `issues` nor `pulls`.
#[derive(Error, Debug)]
#[error("unknown target kind: {0} (valid kinds are 'issues' and 'pulls')")]
pub struct UnknownTargetKind(pub String);

impl std::str::FromStr for TargetKind {
    type Err = UnknownTargetKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issues" => Ok(Self::Issue),
            "pulls" => Ok(Self::PullRequest),
            other => Err(UnknownTargetKind(other.to_string())),
        }
    }
}

/// A platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User login.
    pub login: String,
    /// User ID.
    #[serde(default)]
    pub id: u64,
}

/// A label on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    /// Label name.
    pub name: String,
    /// Label color.
    #[serde(default)]
    pub color: Option<String>,
}

/// Marker object present on issues-API entries that are really pull requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestMarker {
    /// API URL of the pull request.
    #[serde(default)]
    pub url: Option<String>,
}

/// An issue as seen through the issues API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
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
    /// Labels on the issue.
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Last-activity timestamp.
    pub updated_at: DateTime<Utc>,
    /// Present when this entry is a pull request.
    #[serde(default)]
    pub pull_request: Option<PullRequestMarker>,
}

impl Issue {
    /// Whether this issues-API entry is a pull request.
    #[must_use]
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Whether the issue has at least one assignee.
    #[must_use]
    pub fn has_assignee(&self) -> bool {
        !self.assignees.is_empty()
    }

    /// Whether the issue carries the named label.
    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }

    /// Whether the issue is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }
}

/// Sort key for issue listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Sort by last-activity timestamp.
    Updated,
    /// Sort by creation timestamp.
    Created,
}

impl SortKey {
    /// Query-parameter value for this key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Created => "created",
        }
    }
}

/// Sort direction for issue listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

impl SortDirection {
    /// Query-parameter value for this direction.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Filter for listing issues in one repository.
#[derive(Debug, Clone)]
pub struct IssueQuery {
    /// Issues or pull requests.
    pub kind: TargetKind,
    /// Open/closed state.
    pub state: IssueState,
    /// Require (`Some(false)`) or allow any lock status (`None`).
    pub locked: Option<bool>,
    /// Require at least one assignee (`Some(true)`), require none
    /// (`Some(false)`), or do not filter (`None`).
    pub assigned: Option<bool>,
    /// Labels the issue must carry.
    pub labels: Vec<String>,
    /// Labels the issue must not carry.
    pub exclude_labels: Vec<String>,
    /// Only issues last updated strictly before this instant.
    pub updated_before: Option<DateTime<Utc>>,
    /// Sort key.
    pub sort: SortKey,
    /// Sort direction.
    pub direction: SortDirection,
    /// Page size cap.
    pub per_page: u8,
}

/// Operations the lifecycle engine needs from the issue-hosting platform.
#[async_trait]
pub trait IssueHost: Send + Sync {
    /// List issues in a repository matching the query.
    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &IssueQuery,
    ) -> Result<Vec<Issue>, PlatformError>;

    /// Fetch a single issue by number.
    async fn get_issue(&self, owner: &str, repo: &str, number: u64)
        -> Result<Issue, PlatformError>;

    /// Fetch a repository label by name.
    async fn get_label(&self, owner: &str, repo: &str, name: &str)
        -> Result<Label, PlatformError>;

    /// Create a repository label.
    async fn create_label(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        color: &str,
    ) -> Result<Label, PlatformError>;

    /// Add a label to an issue.
    async fn add_label(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        name: &str,
    ) -> Result<(), PlatformError>;

    /// Remove a label from an issue.
    ///
    /// Returns [`PlatformError::NotFound`] when the label is not present,
    /// which callers treat as already-satisfied.
    async fn remove_label(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        name: &str,
    ) -> Result<(), PlatformError>;

    /// Post a comment on an issue.
    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), PlatformError>;

    /// Replace the assignee list of an issue.
    async fn edit_assignees(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), PlatformError>;
}
