//! Deploy gating conditions
//!
//! A [`DeployCondition`] is a pure predicate over run metadata. Evaluation
//! performs no IO and short-circuits on the repository identity before any
//! branch or tag predicate is looked at, so a decision is never derived from
//! fork metadata.

#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// The event that triggered a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A branch or tag push
    #[default]
    Push,
    /// A pull request build
    PullRequest,
    /// A scheduled build
    Cron,
    /// A build triggered through the API
    Api,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::PullRequest => write!(f, "pull_request"),
            Self::Cron => write!(f, "cron"),
            Self::Api => write!(f, "api"),
        }
    }
}

/// Metadata describing the run being gated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Repository slug, e.g. `owner/name`
    pub repo: String,

    /// Branch the run was triggered on
    pub branch: String,

    /// Tag name if this is a tagged build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Event that triggered the run
    #[serde(default)]
    pub event: EventType,
}

impl RunMetadata {
    /// Creates metadata for a plain branch push
    pub fn push(repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            tag: None,
            event: EventType::Push,
        }
    }

    /// Sets the tag for a tagged build
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the triggering event
    #[must_use]
    pub fn with_event(mut self, event: EventType) -> Self {
        self.event = event;
        self
    }
}

/// Condition gating the deploy stage, from the descriptor's `deploy.on` block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeployCondition {
    /// Deploy only from this repository slug
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Deploy only from this branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Deploy only tagged builds
    #[serde(default)]
    pub tags: bool,
}

impl DeployCondition {
    /// Evaluates the condition against run metadata.
    ///
    /// Pure, no side effects. The repository predicate is checked first and
    /// short-circuits: when it fails, branch and tag predicates are never
    /// consulted. Pull request builds never deploy.
    pub fn evaluate(&self, meta: &RunMetadata) -> bool {
        if let Some(repo) = &self.repo
            && repo != &meta.repo
        {
            return false;
        }

        if meta.event == EventType::PullRequest {
            return false;
        }

        if self.tags {
            return meta.tag.is_some();
        }

        if let Some(branch) = &self.branch {
            return branch == &meta.branch;
        }

        true
    }
}

impl fmt::Display for DeployCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "on(repo: {}, branch: {}, tags: {})",
            self.repo.as_deref().unwrap_or("*"),
            self.branch.as_deref().unwrap_or("*"),
            self.tags
        )
    }
}
