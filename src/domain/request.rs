//! Governance requests and their outcomes.
//!
//! The dispatch layer hands the engine an opaque JSON action payload. It is
//! decoded into [`ActionPayload`] here and nothing past this boundary sees
//! untyped fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::workflow::{UserId, WorkflowState};

/// Lifecycle action an actor can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedAction {
    Publish,
    Unpublish,
    Delete,
}

impl std::fmt::Display for RequestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// `(requestedAction, workflowId, workflowTitle, actingUser)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceRequest {
    pub action: RequestedAction,
    pub workflow_id: String,

    /// Display title, used as the search query. May be empty.
    pub workflow_title: String,

    pub actor: UserId,
}

impl GovernanceRequest {
    pub fn new(
        action: RequestedAction,
        workflow_id: impl Into<String>,
        workflow_title: impl Into<String>,
        actor: impl Into<UserId>,
    ) -> Self {
        Self {
            action,
            workflow_id: workflow_id.into(),
            workflow_title: workflow_title.into(),
            actor: actor.into(),
        }
    }
}

/// Errors decoding an action payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Malformed action payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Action payload is missing a workflow id")]
    MissingWorkflowId,
}

/// Wire shape of the payload attached to a workflow's action menu
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ActionPayload {
    Publish(PayloadTarget),
    Unpublish(PayloadTarget),
    Delete(PayloadTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadTarget {
    pub workflow_id: String,

    #[serde(default)]
    pub workflow_name: String,
}

impl ActionPayload {
    /// Decode and validate a raw payload
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let payload: Self = serde_json::from_str(raw)?;
        if payload.target().workflow_id.trim().is_empty() {
            return Err(PayloadError::MissingWorkflowId);
        }
        Ok(payload)
    }

    pub fn action(&self) -> RequestedAction {
        match self {
            Self::Publish(_) => RequestedAction::Publish,
            Self::Unpublish(_) => RequestedAction::Unpublish,
            Self::Delete(_) => RequestedAction::Delete,
        }
    }

    pub fn target(&self) -> &PayloadTarget {
        match self {
            Self::Publish(t) | Self::Unpublish(t) | Self::Delete(t) => t,
        }
    }

    pub fn into_request(self, actor: impl Into<UserId>) -> GovernanceRequest {
        let action = self.action();
        let target = match self {
            Self::Publish(t) | Self::Unpublish(t) | Self::Delete(t) => t,
        };
        GovernanceRequest::new(action, target.workflow_id, target.workflow_name, actor)
    }
}

/// Successful result of a governance request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub workflow_id: String,

    /// State the workflow ended in
    pub state: WorkflowState,

    /// Names of the rules that flagged the workflow, in rule order
    pub violations: Vec<String>,

    /// Collaborators removed pending review
    pub demoted: Vec<UserId>,

    /// Link handed out to collaborators after a publish
    pub share_link: Option<String>,
}

impl Outcome {
    pub fn new(workflow_id: impl Into<String>, state: WorkflowState) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            state,
            violations: Vec::new(),
            demoted: Vec::new(),
            share_link: None,
        }
    }
}

/// `{ok, error?}` shape returned to the dispatch layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn from_result<E: std::fmt::Display>(result: &Result<Outcome, E>) -> Self {
        match result {
            Ok(_) => Self { ok: true, error: None },
            Err(e) => Self {
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publish_payload() {
        let payload =
            ActionPayload::parse(r#"{"action":"publish","workflowName":"Standup","workflowId":"Wf1"}"#)
                .unwrap();

        assert_eq!(payload.action(), RequestedAction::Publish);
        let request = payload.into_request("U1");
        assert_eq!(request.workflow_id, "Wf1");
        assert_eq!(request.workflow_title, "Standup");
        assert_eq!(request.actor, "U1");
    }

    #[test]
    fn test_parse_payload_without_name() {
        let payload = ActionPayload::parse(r#"{"action":"delete","workflowId":"Wf9"}"#).unwrap();
        assert_eq!(payload.action(), RequestedAction::Delete);
        assert_eq!(payload.target().workflow_name, "");
    }

    #[test]
    fn test_rejects_unknown_action() {
        let result = ActionPayload::parse(r#"{"action":"archive","workflowId":"Wf1"}"#);
        assert!(matches!(result, Err(PayloadError::Malformed(_))));
    }

    #[test]
    fn test_rejects_blank_workflow_id() {
        let result = ActionPayload::parse(r#"{"action":"unpublish","workflowId":"  "}"#);
        assert!(matches!(result, Err(PayloadError::MissingWorkflowId)));
    }

    #[test]
    fn test_response_shape() {
        let ok: Result<Outcome, String> = Ok(Outcome::new("Wf1", WorkflowState::Published));
        assert_eq!(serde_json::to_string(&Response::from_result(&ok)).unwrap(), r#"{"ok":true}"#);

        let failed: Result<Outcome, String> = Err("invalid_auth".to_string());
        let response = Response::from_result(&failed);
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("invalid_auth"));
    }
}
