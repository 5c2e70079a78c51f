//! GitHub REST implementation of the issue-host trait.

mod client;
mod models;

pub use client::GitHub;
