//! GitHub API wire types.

use serde::{Deserialize, Serialize};

use crate::platform::traits::Issue;

/// Response from the search issues endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Total number of matches (may exceed the returned page).
    pub total_count: u64,
    /// Matching issues, one page.
    pub items: Vec<Issue>,
}

/// Request to create a label.
#[derive(Debug, Serialize)]
pub struct CreateLabelRequest<'a> {
    /// Label name.
    pub name: &'a str,
    /// Label color, hex without the leading `#`.
    pub color: &'a str,
}

/// Request to add labels to an issue.
#[derive(Debug, Serialize)]
pub struct AddLabelsRequest<'a> {
    /// Labels to add.
    pub labels: Vec<&'a str>,
}

/// Request to post an issue comment.
#[derive(Debug, Serialize)]
pub struct CreateCommentRequest<'a> {
    /// Comment body.
    pub body: &'a str,
}

/// Request to replace the assignee list of an issue.
#[derive(Debug, Serialize)]
pub struct EditAssigneesRequest<'a> {
    /// Full replacement assignee list.
    pub assignees: &'a [String],
}
