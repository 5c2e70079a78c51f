//! GitHub REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use super::models::{
    AddLabelsRequest, CreateCommentRequest, CreateLabelRequest, EditAssigneesRequest,
    SearchResponse,
};
use crate::platform::traits::{Issue, IssueHost, IssueQuery, IssueState, Label, PlatformError};

/// Base URL for the GitHub API.
const API_BASE_URL: &str = "https://api.github.com";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// GitHub implementation of [`IssueHost`].
#[derive(Debug, Clone)]
pub struct GitHub {
    /// HTTP client.
    client: Client,
    /// API token for authentication.
    token: String,
    /// API base URL.
    base_url: String,
}

impl GitHub {
    /// Create a new GitHub client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self, PlatformError> {
        Self::with_base_url(token, API_BASE_URL)
    }

    /// Create a client against a non-default API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, PlatformError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("unassign/0.1"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, PlatformError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        Self::handle_response(response, path).await
    }

    /// Make an authenticated GET request with query parameters.
    async fn get_with_params<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        Self::handle_response(response, path).await
    }

    /// Make an authenticated POST request.
    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, PlatformError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(body)
            .send()
            .await?;

        Self::handle_response(response, path).await
    }

    /// Make an authenticated PATCH request, discarding the response body.
    async fn patch_empty<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), PlatformError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "PATCH request");

        let response = self
            .client
            .patch(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(body)
            .send()
            .await?;

        Self::check_status(response, path).await
    }

    /// Make an authenticated DELETE request, discarding the response body.
    async fn delete(&self, path: &str) -> Result<(), PlatformError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "DELETE request");

        let response = self
            .client
            .delete(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        Self::check_status(response, path).await
    }

    /// Map a response to a parsed body or a platform error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: Response,
        path: &str,
    ) -> Result<T, PlatformError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PlatformError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Map a body-less response to success or a platform error.
    async fn check_status(response: Response, path: &str) -> Result<(), PlatformError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PlatformError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// Build the search-API query string for an issue listing.
fn build_search_query(owner: &str, repo: &str, query: &IssueQuery) -> String {
    let mut parts = vec![format!("repo:{owner}/{repo}")];

    parts.push(
        match query.state {
            IssueState::Open => "is:open",
            IssueState::Closed => "is:closed",
        }
        .to_string(),
    );
    parts.push(query.kind.query_restriction().to_string());

    match query.assigned {
        Some(true) => parts.push("assignee:*".to_string()),
        Some(false) => parts.push("no:assignee".to_string()),
        None => {}
    }

    for label in &query.labels {
        parts.push(format!("label:\"{label}\""));
    }
    for label in &query.exclude_labels {
        parts.push(format!("-label:\"{label}\""));
    }

    if let Some(cutoff) = query.updated_before {
        parts.push(format!("updated:<{}", cutoff.format("%Y-%m-%dT%H:%M:%SZ")));
    }

    parts.join(" ")
}

#[async_trait]
impl IssueHost for GitHub {
    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &IssueQuery,
    ) -> Result<Vec<Issue>, PlatformError> {
        let q = build_search_query(owner, repo, query);
        debug!(owner = %owner, repo = %repo, query = %q, "searching issues");

        let params = [
            ("q", q),
            ("sort", query.sort.as_str().to_string()),
            ("order", query.direction.as_str().to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        let response: SearchResponse = self.get_with_params("/search/issues", &params).await?;

        debug!(
            owner = %owner,
            repo = %repo,
            total = response.total_count,
            page = response.items.len(),
            "search complete"
        );

        // The search API cannot express lock status; filter it here.
        let items = match query.locked {
            Some(wanted) => response
                .items
                .into_iter()
                .filter(|issue| issue.locked == wanted)
                .collect(),
            None => response.items,
        };

        Ok(items)
    }

    async fn get_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Issue, PlatformError> {
        self.get(&format!("/repos/{owner}/{repo}/issues/{number}"))
            .await
    }

    async fn get_label(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> Result<Label, PlatformError> {
        let encoded = urlencoding::encode(name);
        self.get(&format!("/repos/{owner}/{repo}/labels/{encoded}"))
            .await
    }

    async fn create_label(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        color: &str,
    ) -> Result<Label, PlatformError> {
        self.post(
            &format!("/repos/{owner}/{repo}/labels"),
            &CreateLabelRequest { name, color },
        )
        .await
    }

    async fn add_label(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        name: &str,
    ) -> Result<(), PlatformError> {
        let _: Vec<Label> = self
            .post(
                &format!("/repos/{owner}/{repo}/issues/{number}/labels"),
                &AddLabelsRequest {
                    labels: vec![name],
                },
            )
            .await?;
        Ok(())
    }

    async fn remove_label(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        name: &str,
    ) -> Result<(), PlatformError> {
        let encoded = urlencoding::encode(name);
        self.delete(&format!(
            "/repos/{owner}/{repo}/issues/{number}/labels/{encoded}"
        ))
        .await
    }

    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), PlatformError> {
        let _: serde_json::Value = self
            .post(
                &format!("/repos/{owner}/{repo}/issues/{number}/comments"),
                &CreateCommentRequest { body },
            )
            .await?;
        Ok(())
    }

    async fn edit_assignees(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), PlatformError> {
        self.patch_empty(
            &format!("/repos/{owner}/{repo}/issues/{number}"),
            &EditAssigneesRequest { assignees },
        )
        .await
    }
}
