//! Adapter interfaces for the external platform.
//!
//! The engine never talks HTTP directly. Every workflow, trigger and
//! collaborator operation goes through [`PlatformApi`], and every message
//! goes through [`MessageSink`]. Each call either succeeds or reports a
//! single [`ApiError`]; nothing is retried at this layer.

pub mod slack;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{PublishedWorkflow, Trigger, UserId, Workflow};

// Re-export the Slack client
pub use slack::{SlackClient, SlackConfig};

/// Failure of a single platform call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The platform answered `{ok: false, error}`
    #[error("{0}")]
    Platform(String),

    /// The call never produced a platform answer (network, timeout, decoding)
    #[error("transport error: {0}")]
    Transport(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Publish-status filter for workflow search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    All,
    Published,
    Unpublished,
}

/// Parameters for `searchWorkflows`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowQuery {
    pub query: Option<String>,
    pub collaborators: Vec<UserId>,
    pub publish_status: PublishStatus,
}

impl WorkflowQuery {
    /// Everything `collaborator` can see, optionally narrowed by title
    pub fn for_collaborator(title: &str, collaborator: impl Into<UserId>) -> Self {
        let query = match title.trim() {
            "" => None,
            t => Some(t.to_string()),
        };
        Self {
            query,
            collaborators: vec![collaborator.into()],
            publish_status: PublishStatus::All,
        }
    }
}

/// Templated binding for one workflow input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputBinding {
    pub value: String,
}

/// Parameters for `createTrigger`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCreate {
    pub trigger_id: String,
    pub workflow_id: String,
    pub name: String,
    pub app_id: Option<String>,
    pub team_id: Option<String>,
}

/// Parameters for `updateTrigger`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerUpdate {
    pub trigger_id: String,
    pub workflow_id: String,
    pub inputs: BTreeMap<String, InputBinding>,
    pub name: String,
    pub description: String,
}

/// Workflow, trigger and collaborator operations of the platform
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn search_workflows(&self, query: &WorkflowQuery) -> ApiResult<Vec<Workflow>>;

    async fn create_workflow(
        &self,
        title: &str,
        description: &str,
        team_id: Option<&str>,
    ) -> ApiResult<Workflow>;

    async fn publish_workflow(&self, workflow_id: &str) -> ApiResult<PublishedWorkflow>;

    async fn unpublish_workflow(&self, workflow_id: &str) -> ApiResult<()>;

    async fn delete_workflow(&self, workflow_id: &str) -> ApiResult<()>;

    async fn create_trigger(&self, request: &TriggerCreate) -> ApiResult<Trigger>;

    async fn update_trigger(&self, request: &TriggerUpdate) -> ApiResult<Trigger>;

    async fn add_collaborators(&self, workflow_id: &str, users: &[UserId]) -> ApiResult<()>;

    async fn remove_collaborators(&self, workflow_id: &str, users: &[UserId]) -> ApiResult<()>;
}

/// A message to a channel or user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    /// Channel id, or a user id for a direct message
    pub channel: String,

    /// Plain-text body, also the fallback for rich blocks
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<serde_json::Value>,
}

impl OutboundMessage {
    pub fn text(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            blocks: None,
        }
    }

    pub fn with_blocks(mut self, blocks: serde_json::Value) -> Self {
        self.blocks = Some(blocks);
        self
    }
}

/// Delivery of human-readable messages
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn post_message(&self, message: &OutboundMessage) -> ApiResult<()>;
}
