//! No-response issue lifecycle service.
//!
//! This crate provides:
//! - A mark-and-sweep engine that flags assigned issues gone quiet with a
//!   sentinel label and later clears the assignee of issues that stayed quiet
//! - A webhook reactor that lifts the flag when activity resumes
//! - A GitHub REST binding for listing, labeling, commenting and assignment
//! - An HTTP server for webhook handling (standalone service)
//! - Per-repository sweep scheduling

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail
#![allow(clippy::cast_possible_truncation)]

pub mod config;
pub mod events;
pub mod platform;
pub mod scheduler;
pub mod server;
pub mod sweep;

pub use config::Config;
pub use events::{ActivityEvent, EventReactor};
pub use platform::github::GitHub;
pub use platform::traits::{
    Issue, IssueHost, IssueQuery, IssueState, Label, PlatformError, TargetKind, User,
};
pub use server::{build_router, AppState};
pub use sweep::{LifecycleEngine, RepositoryContext, SweepSummary};
