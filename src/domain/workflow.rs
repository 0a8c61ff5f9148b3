//! Workflow snapshots as reported by the platform.
//!
//! The platform is the system of record for workflows. The engine only ever
//! holds a transient snapshot per request, so every field that the platform
//! may omit decodes to an empty value rather than failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque platform user identifier
pub type UserId = String;

/// A single step of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Built-in or custom function the step runs
    #[serde(default)]
    pub function_id: String,
}

impl Step {
    pub fn new(function_id: impl Into<String>) -> Self {
        Self {
            function_id: function_id.into(),
        }
    }
}

/// Kind of trigger bound to a workflow, as reported in `trigger_types`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Shortcut,
    Webhook,
    Schedule,
    Event,

    /// Any kind the engine does not have a rebinding policy for
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Shortcut => "shortcut",
            Self::Webhook => "webhook",
            Self::Schedule => "schedule",
            Self::Event => "event",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerType {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
}

/// Snapshot of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Externally assigned, immutable identifier
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub trigger_ids: Vec<String>,

    /// Kind of each trigger, parallel to `trigger_ids`
    #[serde(default)]
    pub trigger_types: Vec<TriggerType>,

    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default)]
    pub collaborators: Vec<UserId>,

    #[serde(default)]
    pub is_published: bool,

    /// Unix seconds of the last edit
    #[serde(default)]
    pub date_updated: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

impl Workflow {
    /// Create an empty, unpublished snapshot
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            trigger_ids: Vec::new(),
            trigger_types: Vec::new(),
            steps: Vec::new(),
            collaborators: Vec::new(),
            is_published: false,
            date_updated: 0,
            app_id: None,
            team_id: None,
        }
    }

    pub fn with_trigger(mut self, trigger_id: impl Into<String>, kind: TriggerKind) -> Self {
        self.trigger_ids.push(trigger_id.into());
        self.trigger_types.push(TriggerType { kind });
        self
    }

    pub fn with_step(mut self, function_id: impl Into<String>) -> Self {
        self.steps.push(Step::new(function_id));
        self
    }

    pub fn with_collaborator(mut self, user: impl Into<UserId>) -> Self {
        self.collaborators.push(user.into());
        self
    }

    /// The trigger the engine rebinds after publishing
    pub fn primary_trigger_id(&self) -> Option<&str> {
        self.trigger_ids.first().map(String::as_str)
    }

    pub fn primary_trigger_kind(&self) -> Option<TriggerKind> {
        self.trigger_types.first().map(|t| t.kind)
    }

    pub fn has_collaborator(&self, user: &str) -> bool {
        self.collaborators.iter().any(|c| c == user)
    }

    /// Collaborators other than `excluded`, in snapshot order
    pub fn collaborators_except<'a>(&'a self, excluded: &'a [&str]) -> impl Iterator<Item = &'a UserId> {
        self.collaborators
            .iter()
            .filter(move |c| !excluded.contains(&c.as_str()))
    }
}

/// Declared input of a published workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputParameter {
    pub name: String,

    /// Parameter type path, e.g. `slack#/types/user_id`
    #[serde(rename = "type")]
    pub type_path: String,
}

impl InputParameter {
    /// Last path segment of the type, used as the template variable
    pub fn short_type(&self) -> &str {
        self.type_path.rsplit('/').next().unwrap_or(&self.type_path)
    }
}

/// What the platform returns from a successful publish
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedWorkflow {
    #[serde(default)]
    pub input_parameters: BTreeMap<String, InputParameter>,
}

/// A trigger as returned by trigger create/update calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,

    #[serde(rename = "type", default = "unknown_kind")]
    pub kind: TriggerKind,

    #[serde(default)]
    pub share_url: String,
}

fn unknown_kind() -> TriggerKind {
    TriggerKind::Unknown
}

/// Publication lifecycle state as seen by the governance engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Never published through the engine
    Draft,

    /// Flagged by a rule and waiting on a human reviewer
    PendingReview,

    Published,

    Unpublished,

    /// Gone from the platform; cannot be re-entered
    Deleted,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Published => "published",
            Self::Unpublished => "unpublished",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}
