//! Audit trail and review-queue records.
//!
//! These are the durable record of every governance decision. They are only
//! ever inserted, never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::workflow::UserId;

/// A single entry in the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Workflow the action was taken on
    pub workflow_id: String,

    /// Who took the action (the admin identity for automatic actions)
    pub actor: UserId,

    /// What happened
    pub action: AuditAction,

    /// Human-readable reason (NO secrets)
    pub reason: String,

    /// When the entry was recorded
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Create a new entry stamped with the current time
    pub fn new(
        workflow_id: impl Into<String>,
        actor: impl Into<UserId>,
        action: AuditAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            actor: actor.into(),
            action,
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Lifecycle actions that end up in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Publish,
    Unpublish,
    Delete,

    /// Publish attempt routed to human review
    Flag,

    /// Reviewer approved a flagged workflow
    Approve,

    /// Reviewer rejected a flagged workflow
    Deny,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Delete => "delete",
            Self::Flag => "flag",
            Self::Approve => "approve",
            Self::Deny => "deny",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "publish" => Some(Self::Publish),
            "unpublish" => Some(Self::Unpublish),
            "delete" => Some(Self::Delete),
            "flag" => Some(Self::Flag),
            "approve" => Some(Self::Approve),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workflow waiting on human review after a flagged publish attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewQueueEntry {
    /// Row id assigned by the store (`None` until persisted)
    pub id: Option<i64>,

    pub workflow_id: String,

    /// Collaborators removed when the workflow was flagged
    pub demoted_collaborators: Vec<UserId>,

    pub recorded_at: DateTime<Utc>,
}

impl ReviewQueueEntry {
    pub fn new(workflow_id: impl Into<String>, demoted_collaborators: Vec<UserId>) -> Self {
        Self {
            id: None,
            workflow_id: workflow_id.into(),
            demoted_collaborators,
            recorded_at: Utc::now(),
        }
    }
}

/// Outcome of a human review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Denied,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

/// Resolution of one review-queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub review_id: i64,
    pub reviewer: UserId,
    pub verdict: Verdict,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ReviewDecision {
    pub fn new(review_id: i64, reviewer: impl Into<UserId>, verdict: Verdict, reason: Option<String>) -> Self {
        Self {
            review_id,
            reviewer: reviewer.into(),
            verdict,
            reason,
            recorded_at: Utc::now(),
        }
    }
}
