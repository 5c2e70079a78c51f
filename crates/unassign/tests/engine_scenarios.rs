//! Lifecycle scenarios driven against an in-memory issue host.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use unassign::config::DEFAULT_MARK_COMMENT;
use unassign::events::{ActivityEvent, EventIssue, EventRepository, EventSender};
use unassign::platform::traits::{
    Issue, IssueHost, IssueQuery, IssueState, Label, PlatformError, PullRequestMarker, User,
};
use unassign::sweep::labels::NO_RESPONSE_LABEL;
use unassign::{Config, EventReactor, LifecycleEngine, RepositoryContext};

/// A recorded mutating call.
#[derive(Debug, Clone, PartialEq)]
enum Call {
    CreateLabel(String),
    AddLabel(u64, String),
    RemoveLabel(u64, String),
    Comment(u64, String),
    EditAssignees(u64, Vec<String>),
}

/// In-memory issue host recording every mutation.
#[derive(Default)]
struct FakeHost {
    issues: Mutex<Vec<Issue>>,
    repo_labels: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    fail_get_label: Mutex<bool>,
    fail_mark_listing: Mutex<bool>,
    fail_unassign_listing: Mutex<bool>,
    fail_comments: Mutex<bool>,
}

impl FakeHost {
    fn with_issues(issues: Vec<Issue>) -> Arc<Self> {
        let host = Self::default();
        *host.issues.lock().unwrap() = issues;
        Arc::new(host)
    }

    fn seed_label(&self, name: &str) {
        self.repo_labels.lock().unwrap().insert(name.to_string());
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn count_matching(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    fn api_error() -> PlatformError {
        PlatformError::Api {
            status: 500,
            message: "boom".to_string(),
        }
    }
}

#[async_trait]
impl IssueHost for FakeHost {
    async fn list_issues(
        &self,
        _owner: &str,
        _repo: &str,
        query: &IssueQuery,
    ) -> Result<Vec<Issue>, PlatformError> {
        let wants_flagged = query
            .labels
            .iter()
            .any(|l| l == NO_RESPONSE_LABEL);
        if wants_flagged && *self.fail_unassign_listing.lock().unwrap() {
            return Err(Self::api_error());
        }
        if !wants_flagged && *self.fail_mark_listing.lock().unwrap() {
            return Err(Self::api_error());
        }

        let mut matching: Vec<Issue> = self
            .issues
            .lock()
            .unwrap()
            .iter()
            .filter(|issue| match query.kind {
                unassign::TargetKind::Issue => !issue.is_pull_request(),
                unassign::TargetKind::PullRequest => issue.is_pull_request(),
            })
            .filter(|issue| (issue.state == query.state))
            .filter(|issue| query.locked.is_none_or(|wanted| issue.locked == wanted))
            .filter(|issue| {
                query
                    .assigned
                    .is_none_or(|wanted| issue.has_assignee() == wanted)
            })
            .filter(|issue| query.labels.iter().all(|l| issue.has_label(l)))
            .filter(|issue| !query.exclude_labels.iter().any(|l| issue.has_label(l)))
            .filter(|issue| {
                query
                    .updated_before
                    .is_none_or(|cutoff| issue.updated_at < cutoff)
            })
            .cloned()
            .collect();

        matching.sort_by_key(|issue| (issue.updated_at, issue.number));
        matching.truncate(query.per_page as usize);
        Ok(matching)
    }

    async fn get_issue(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<Issue, PlatformError> {
        self.issues
            .lock()
            .unwrap()
            .iter()
            .find(|issue| issue.number == number)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("issue {number}")))
    }

    async fn get_label(
        &self,
        _owner: &str,
        _repo: &str,
        name: &str,
    ) -> Result<Label, PlatformError> {
        if *self.fail_get_label.lock().unwrap() {
            return Err(Self::api_error());
        }
        if self.repo_labels.lock().unwrap().contains(name) {
            Ok(Label {
                name: name.to_string(),
                color: Some("ffffff".to_string()),
            })
        } else {
            Err(PlatformError::NotFound(format!("label {name}")))
        }
    }

    async fn create_label(
        &self,
        _owner: &str,
        _repo: &str,
        name: &str,
        color: &str,
    ) -> Result<Label, PlatformError> {
        self.repo_labels.lock().unwrap().insert(name.to_string());
        self.record(Call::CreateLabel(name.to_string()));
        Ok(Label {
            name: name.to_string(),
            color: Some(color.to_string()),
        })
    }

    async fn add_label(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        name: &str,
    ) -> Result<(), PlatformError> {
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .iter_mut()
            .find(|issue| issue.number == number)
            .ok_or_else(|| PlatformError::NotFound(format!("issue {number}")))?;
        if !issue.has_label(name) {
            issue.labels.push(Label {
                name: name.to_string(),
                color: None,
            });
        }
        drop(issues);
        self.record(Call::AddLabel(number, name.to_string()));
        Ok(())
    }

    async fn remove_label(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        name: &str,
    ) -> Result<(), PlatformError> {
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .iter_mut()
            .find(|issue| issue.number == number)
            .ok_or_else(|| PlatformError::NotFound(format!("issue {number}")))?;
        if !issue.has_label(name) {
            return Err(PlatformError::NotFound(format!(
                "label {name} on issue {number}"
            )));
        }
        issue.labels.retain(|l| l.name != name);
        drop(issues);
        self.record(Call::RemoveLabel(number, name.to_string()));
        Ok(())
    }

    async fn create_comment(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), PlatformError> {
        if *self.fail_comments.lock().unwrap() {
            return Err(Self::api_error());
        }
        self.record(Call::Comment(number, body.to_string()));
        Ok(())
    }

    async fn edit_assignees(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), PlatformError> {
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .iter_mut()
            .find(|issue| issue.number == number)
            .ok_or_else(|| PlatformError::NotFound(format!("issue {number}")))?;
        issue.assignees = assignees
            .iter()
            .map(|login| User {
                login: login.clone(),
                id: 0,
            })
            .collect();
        drop(issues);
        self.record(Call::EditAssignees(number, assignees.to_vec()));
        Ok(())
    }
}

fn test_config() -> Config {
    Config {
        github_token: Some("token".to_string()),
        repos: vec!["octo/widgets".to_string()],
        days_until_no_response: Some(7.0),
        days_until_unassign: None,
        perform: true,
        checking_interval_minutes: 60,
        disable_delay: true,
        exempt_labels: Vec::new(),
        bot_login: Some("unassign-bot".to_string()),
        webhook_secret: None,
        port: 8080,
        mark_comment: DEFAULT_MARK_COMMENT.to_string(),
        unassign_comment: None,
        unmark_comment: None,
    }
}

fn ctx(config: Config) -> RepositoryContext {
    RepositoryContext::new("octo", "widgets", config)
}

fn stale_issue(number: u64, days_old: i64) -> Issue {
    Issue {
        number,
        state: IssueState::Open,
        locked: false,
        assignees: vec![User {
            login: "bob".to_string(),
            id: 2,
        }],
        labels: Vec::new(),
        updated_at: Utc::now() - Duration::days(days_old),
        pull_request: None,
    }
}

fn flagged_issue(number: u64, days_old: i64) -> Issue {
    let mut issue = stale_issue(number, days_old);
    issue.labels.push(Label {
        name: NO_RESPONSE_LABEL.to_string(),
        color: None,
    });
    issue
}

fn activity_event(action: &str, issue: &Issue, sender: EventSender) -> ActivityEvent {
    ActivityEvent {
        action: action.to_string(),
        issue: Some(EventIssue {
            number: issue.number,
            state: issue.state,
            locked: issue.locked,
            assignees: issue.assignees.clone(),
            labels: Some(issue.labels.clone()),
            updated_at: issue.updated_at,
            pull_request: None,
        }),
        pull_request: None,
        label: None,
        sender: Some(sender),
        repository: EventRepository {
            name: "widgets".to_string(),
            full_name: "octo/widgets".to_string(),
            owner: User {
                login: "octo".to_string(),
                id: 1,
            },
        },
    }
}

fn user_sender(login: &str) -> EventSender {
    EventSender {
        login: login.to_string(),
        kind: Some("User".to_string()),
    }
}

// Scenario A: a quiet assigned issue is marked with a notifying comment first.
#[tokio::test]
async fn mark_posts_comment_then_adds_label() {
    let host = FakeHost::with_issues(vec![stale_issue(42, 10)]);
    let engine = LifecycleEngine::new(host.clone());

    let summary = engine.sweep(&ctx(test_config())).await.unwrap();

    assert_eq!(summary.marked, 1);
    let calls = host.calls();
    assert_eq!(
        calls,
        vec![
            Call::CreateLabel(NO_RESPONSE_LABEL.to_string()),
            Call::Comment(42, "Hi @bob, this issue has been marked for no response.".to_string()),
            Call::AddLabel(42, NO_RESPONSE_LABEL.to_string()),
        ]
    );
}

// Repeated sweeps never re-mark an already-labeled issue.
#[tokio::test]
async fn repeated_sweeps_do_not_remark() {
    let host = FakeHost::with_issues(vec![stale_issue(42, 10)]);
    let engine = LifecycleEngine::new(host.clone());
    let context = ctx(test_config());

    engine.sweep(&context).await.unwrap();
    let summary = engine.sweep(&context).await.unwrap();

    assert_eq!(summary.marked, 0);
    assert_eq!(
        host.count_matching(|c| matches!(c, Call::AddLabel(42, _))),
        1
    );
    assert_eq!(host.count_matching(|c| matches!(c, Call::Comment(42, _))), 1);
}

// Scenario B: a flagged issue quiet past the unassign threshold loses its
// label and its assignees.
#[tokio::test]
async fn unassign_removes_label_then_clears_assignees() {
    let host = FakeHost::with_issues(vec![flagged_issue(42, 20)]);
    host.seed_label(NO_RESPONSE_LABEL);
    let engine = LifecycleEngine::new(host.clone());

    let mut config = test_config();
    config.days_until_unassign = Some(14.0);
    let summary = engine.sweep(&ctx(config)).await.unwrap();

    assert_eq!(summary.unassigned, 1);
    assert_eq!(
        host.calls(),
        vec![
            Call::RemoveLabel(42, NO_RESPONSE_LABEL.to_string()),
            Call::EditAssignees(42, Vec::new()),
        ]
    );
}

// Scenario C: renewed activity lifts the flag, and the issue is only marked
// again after a fresh period of inactivity.
#[tokio::test]
async fn activity_unmarks_and_issue_needs_fresh_inactivity() {
    let mut flagged = flagged_issue(42, 10);
    let host = FakeHost::with_issues(vec![flagged.clone()]);
    host.seed_label(NO_RESPONSE_LABEL);
    let reactor = EventReactor::new(host.clone(), test_config());

    let event = activity_event("created", &flagged, user_sender("bob"));
    reactor.on_activity(&event).await.unwrap();

    assert_eq!(
        host.calls(),
        vec![Call::RemoveLabel(42, NO_RESPONSE_LABEL.to_string())]
    );

    // The comment bumped activity; a sweep right after must not re-mark.
    flagged.labels.clear();
    flagged.updated_at = Utc::now();
    *host.issues.lock().unwrap() = vec![flagged];

    let engine = LifecycleEngine::new(host.clone());
    let summary = engine.sweep(&ctx(test_config())).await.unwrap();
    assert_eq!(summary.marked, 0);
    assert_eq!(host.count_matching(|c| matches!(c, Call::AddLabel(..))), 0);
}

// Scenario D: with 31 qualifying issues, exactly 30 are marked oldest-first
// and the freshest one waits for the next tick.
#[tokio::test]
async fn budget_caps_marks_at_thirty_oldest_first() {
    let issues: Vec<Issue> = (1..=31u64)
        .map(|n| stale_issue(n, 10 + n as i64))
        .collect();
    let host = FakeHost::with_issues(issues);
    host.seed_label(NO_RESPONSE_LABEL);
    let engine = LifecycleEngine::new(host.clone());

    let summary = engine.sweep(&ctx(test_config())).await.unwrap();

    assert_eq!(summary.marked, 30);
    // Issue 1 is the least stale of the batch and must be the one deferred.
    assert_eq!(host.count_matching(|c| matches!(c, Call::AddLabel(..))), 30);
    assert_eq!(
        host.count_matching(|c| matches!(c, Call::AddLabel(1, _))),
        0
    );
}

// Mark and unassign phases draw from one shared budget.
#[tokio::test]
async fn phases_share_one_budget() {
    let mut issues: Vec<Issue> = (1..=25).map(|n| stale_issue(n, 30)).collect();
    issues.extend((26..=35).map(|n| flagged_issue(n, 40)));
    let host = FakeHost::with_issues(issues);
    host.seed_label(NO_RESPONSE_LABEL);
    let engine = LifecycleEngine::new(host.clone());

    let mut config = test_config();
    config.days_until_unassign = Some(14.0);
    let summary = engine.sweep(&ctx(config)).await.unwrap();

    assert_eq!(summary.marked, 25);
    assert_eq!(summary.unassigned, 5);
    assert_eq!(summary.deferred, 5);
    assert_eq!(
        host.count_matching(|c| matches!(c, Call::EditAssignees(..))),
        5
    );
}

// Scenario E: without an unassign threshold the unassign phase never mutates,
// no matter how stale flagged issues are.
#[tokio::test]
async fn missing_unassign_threshold_disables_phase() {
    let host = FakeHost::with_issues(vec![flagged_issue(42, 400)]);
    host.seed_label(NO_RESPONSE_LABEL);
    let engine = LifecycleEngine::new(host.clone());

    let summary = engine.sweep(&ctx(test_config())).await.unwrap();

    assert_eq!(summary.unassigned, 0);
    assert!(host.calls().is_empty());
}

// Scenario F: dry-run performs no mutation for any candidate.
#[tokio::test]
async fn dry_run_only_logs() {
    let host = FakeHost::with_issues(vec![stale_issue(42, 10), flagged_issue(43, 30)]);
    host.seed_label(NO_RESPONSE_LABEL);
    let engine = LifecycleEngine::new(host.clone());

    let mut config = test_config();
    config.perform = false;
    config.days_until_unassign = Some(14.0);
    let summary = engine.sweep(&ctx(config)).await.unwrap();

    // Decision logic is identical to perform mode.
    assert_eq!(summary.marked, 1);
    assert_eq!(summary.unassigned, 1);
    assert!(host.calls().is_empty());
}

// Locked issues are excluded from every mutating action.
#[tokio::test]
async fn locked_issues_are_never_touched() {
    let mut locked = stale_issue(42, 10);
    locked.locked = true;
    let mut locked_flagged = flagged_issue(43, 30);
    locked_flagged.locked = true;
    let host = FakeHost::with_issues(vec![locked, locked_flagged]);
    host.seed_label(NO_RESPONSE_LABEL);
    let engine = LifecycleEngine::new(host.clone());

    let mut config = test_config();
    config.days_until_unassign = Some(14.0);
    engine.sweep(&ctx(config)).await.unwrap();

    assert!(host.calls().is_empty());
}

// Pull requests are not mark candidates.
#[tokio::test]
async fn pull_requests_are_not_marked() {
    let mut pr = stale_issue(42, 10);
    pr.pull_request = Some(PullRequestMarker { url: None });
    let host = FakeHost::with_issues(vec![pr]);
    host.seed_label(NO_RESPONSE_LABEL);
    let engine = LifecycleEngine::new(host.clone());

    engine.sweep(&ctx(test_config())).await.unwrap();

    assert!(host.calls().is_empty());
}

// A failing comment call abandons that issue without marking it, and the
// sweep continues with the next candidate.
#[tokio::test]
async fn comment_failure_abandons_issue_but_not_sweep() {
    let host = FakeHost::with_issues(vec![stale_issue(1, 10), stale_issue(2, 9)]);
    host.seed_label(NO_RESPONSE_LABEL);
    *host.fail_comments.lock().unwrap() = true;
    let engine = LifecycleEngine::new(host.clone());

    let summary = engine.sweep(&ctx(test_config())).await.unwrap();

    assert_eq!(summary.marked, 0);
    assert_eq!(summary.errors, 2);
    assert_eq!(host.count_matching(|c| matches!(c, Call::AddLabel(..))), 0);
}

// A listing failure aborts only its phase.
#[tokio::test]
async fn mark_listing_failure_leaves_unassign_phase_running() {
    let host = FakeHost::with_issues(vec![stale_issue(1, 10), flagged_issue(2, 30)]);
    host.seed_label(NO_RESPONSE_LABEL);
    *host.fail_mark_listing.lock().unwrap() = true;
    let engine = LifecycleEngine::new(host.clone());

    let mut config = test_config();
    config.days_until_unassign = Some(14.0);
    let summary = engine.sweep(&ctx(config)).await.unwrap();

    assert_eq!(summary.marked, 0);
    assert_eq!(summary.unassigned, 1);
}

// An unexpected label-fetch error is fatal for the sweep.
#[tokio::test]
async fn label_fetch_error_is_fatal() {
    let host = FakeHost::with_issues(vec![stale_issue(42, 10)]);
    *host.fail_get_label.lock().unwrap() = true;
    let engine = LifecycleEngine::new(host.clone());

    let result = engine.sweep(&ctx(test_config())).await;

    assert!(result.is_err());
    assert!(host.calls().is_empty());
}

// A missing mark threshold is a configuration error surfaced before any
// query or mutation.
#[tokio::test]
async fn missing_mark_threshold_is_fatal() {
    let host = FakeHost::with_issues(vec![stale_issue(42, 10)]);
    let engine = LifecycleEngine::new(host.clone());

    let mut config = test_config();
    config.days_until_no_response = None;
    let result = engine.sweep(&ctx(config)).await;

    assert!(result.is_err());
    assert!(host.calls().is_empty());
}

// Exempt labels keep an issue out of the mark phase.
#[tokio::test]
async fn exempt_labels_exclude_from_marking() {
    let mut issue = stale_issue(42, 10);
    issue.labels.push(Label {
        name: "on-hold".to_string(),
        color: None,
    });
    let host = FakeHost::with_issues(vec![issue]);
    host.seed_label(NO_RESPONSE_LABEL);
    let engine = LifecycleEngine::new(host.clone());

    let mut config = test_config();
    config.exempt_labels = vec!["on-hold".to_string()];
    let summary = engine.sweep(&ctx(config)).await.unwrap();

    assert_eq!(summary.marked, 0);
    assert!(host.calls().is_empty());
}

// Events from the bot itself never trigger an unmark.
#[tokio::test]
async fn bot_events_are_ignored() {
    let flagged = flagged_issue(42, 10);
    let host = FakeHost::with_issues(vec![flagged.clone()]);
    let reactor = EventReactor::new(host.clone(), test_config());

    let bot = EventSender {
        login: "some-app".to_string(),
        kind: Some("Bot".to_string()),
    };
    reactor
        .on_activity(&activity_event("created", &flagged, bot))
        .await
        .unwrap();

    let own = user_sender("unassign-bot");
    reactor
        .on_activity(&activity_event("created", &flagged, own))
        .await
        .unwrap();

    assert!(host.calls().is_empty());
}

// The label-add event produced by a mark must not immediately unmark.
#[tokio::test]
async fn sentinel_label_add_event_does_not_unmark() {
    let flagged = flagged_issue(42, 10);
    let host = FakeHost::with_issues(vec![flagged.clone()]);
    let reactor = EventReactor::new(host.clone(), test_config());

    let mut event = activity_event("labeled", &flagged, user_sender("carol"));
    event.label = Some(Label {
        name: NO_RESPONSE_LABEL.to_string(),
        color: None,
    });
    reactor.on_activity(&event).await.unwrap();

    assert!(host.calls().is_empty());
}

// A payload without labels causes a fresh fetch before deciding.
#[tokio::test]
async fn missing_payload_labels_trigger_fetch() {
    let flagged = flagged_issue(42, 10);
    let host = FakeHost::with_issues(vec![flagged.clone()]);
    let reactor = EventReactor::new(host.clone(), test_config());

    let mut event = activity_event("created", &flagged, user_sender("bob"));
    event.issue.as_mut().unwrap().labels = None;
    reactor.on_activity(&event).await.unwrap();

    assert_eq!(
        host.calls(),
        vec![Call::RemoveLabel(42, NO_RESPONSE_LABEL.to_string())]
    );
}

// Closed issues are not unmarked.
#[tokio::test]
async fn closed_issues_are_not_unmarked() {
    let mut closed = flagged_issue(42, 10);
    closed.state = IssueState::Closed;
    let host = FakeHost::with_issues(vec![closed.clone()]);
    let reactor = EventReactor::new(host.clone(), test_config());

    reactor
        .on_activity(&activity_event("closed", &closed, user_sender("bob")))
        .await
        .unwrap();

    assert!(host.calls().is_empty());
}

// Removing the label twice treats the second removal as already satisfied.
#[tokio::test]
async fn unmark_tolerates_already_removed_label() {
    let flagged = flagged_issue(42, 10);
    let host = FakeHost::with_issues(vec![flagged.clone()]);
    let reactor = EventReactor::new(host.clone(), test_config());

    let event = activity_event("created", &flagged, user_sender("bob"));
    reactor.on_activity(&event).await.unwrap();
    // The stored issue lost its label; the event payload still claims it.
    reactor.on_activity(&event).await.unwrap();

    assert_eq!(
        host.count_matching(|c| matches!(c, Call::RemoveLabel(..))),
        1
    );
}
