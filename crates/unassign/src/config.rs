//! Configuration for the unassign service.

use std::env;

/// Default mark-comment template. `@assignee` is replaced with a mention of
/// the issue's assignee.
pub const DEFAULT_MARK_COMMENT: &str =
    "Hi @assignee, this issue has been marked for no response.";

/// Unassign service configuration.
#[derive(Clone)]
pub struct Config {
    /// API token for platform calls.
    pub github_token: Option<String>,
    /// Repositories to sweep (`owner/repo`, comma-separated in the env).
    pub repos: Vec<String>,
    /// Days of inactivity before an assigned issue is marked. Required for
    /// sweeping.
    pub days_until_no_response: Option<f64>,
    /// Days of inactivity before a marked issue is unassigned. Absence
    /// disables the unassign phase.
    pub days_until_unassign: Option<f64>,
    /// Execute real mutations. When false, every action is only logged.
    pub perform: bool,
    /// Minutes between sweep ticks per repository.
    pub checking_interval_minutes: u64,
    /// Disable the randomized initial stagger across repositories.
    pub disable_delay: bool,
    /// Labels that exclude an issue from being marked.
    pub exempt_labels: Vec<String>,
    /// Login of the bot account, so its own events are ignored.
    pub bot_login: Option<String>,
    /// Webhook signing secret for signature verification.
    pub webhook_secret: Option<String>,
    /// HTTP server port.
    pub port: u16,
    /// Mark-comment template with an `@assignee` mention placeholder.
    pub mark_comment: String,
    /// Optional comment posted when an issue is unassigned.
    pub unassign_comment: Option<String>,
    /// Optional comment posted when an issue is unmarked.
    pub unmark_comment: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty()),
            repos: env::var("GITHUB_REPOS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|r| r.trim().to_string())
                        .filter(|r| !r.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            days_until_no_response: env::var("DAYS_UNTIL_NO_RESPONSE")
                .ok()
                .and_then(|s| s.parse().ok()),
            days_until_unassign: env::var("DAYS_UNTIL_UNASSIGN")
                .ok()
                .and_then(|s| s.parse().ok()),
            perform: env::var("PERFORM")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            checking_interval_minutes: env::var("CHECKING_INTERVAL_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            disable_delay: env::var("DISABLE_DELAY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            exempt_labels: env::var("EXEMPT_LABELS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|l| l.trim().to_string())
                        .filter(|l| !l.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            bot_login: env::var("BOT_LOGIN").ok().filter(|s| !s.is_empty()),
            webhook_secret: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            mark_comment: env::var("MARK_COMMENT")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_MARK_COMMENT.to_string()),
            unassign_comment: env::var("UNASSIGN_COMMENT").ok().filter(|s| !s.is_empty()),
            unmark_comment: env::var("UNMARK_COMMENT").ok().filter(|s| !s.is_empty()),
        }
    }
}
