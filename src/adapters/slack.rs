//! Slack Web API adapter.
//!
//! Workflow administration methods are called with a user token (plus the
//! session cookie the admin endpoints require); messages are posted with the
//! bot token. Every response is the usual `{ok, error?, ...}` envelope.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{
    ApiError, ApiResult, MessageSink, OutboundMessage, PlatformApi, TriggerCreate, TriggerUpdate,
    WorkflowQuery,
};
use crate::domain::{PublishedWorkflow, Trigger, UserId, Workflow};

/// Configuration for the Slack client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Base URL of the Web API, ending in `/`
    pub base_url: String,
    pub user_token: String,
    pub bot_token: String,
    pub session_cookie: Option<String>,
    pub timeout_seconds: u64,
}

/// Slack Web API client
pub struct SlackClient {
    config: SlackConfig,
    client: reqwest::Client,
}

/// Response envelope shared by every Web API method
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    workflows: Vec<Workflow>,
}

#[derive(Debug, Deserialize)]
struct WorkflowBody {
    workflow: Workflow,
}

#[derive(Debug, Deserialize)]
struct PublishBody {
    #[serde(default)]
    decorated_workflow: PublishedWorkflow,
}

#[derive(Debug, Deserialize)]
struct TriggerBody {
    trigger: Trigger,
}

#[derive(Debug, Deserialize)]
struct Empty {}

impl SlackClient {
    /// Create a new Slack client
    pub fn new(config: SlackConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Build API URL
    fn api_url(&self, method: &str) -> String {
        format!("{}{}", self.config.base_url, method)
    }

    /// Call an admin method with the user token
    async fn user_call<T: DeserializeOwned>(&self, method: &str, mut body: Value) -> ApiResult<T> {
        if let Value::Object(ref mut map) = body {
            map.insert("token".to_string(), json!(self.config.user_token));
        }

        let mut request = self
            .client
            .post(self.api_url(method))
            .bearer_auth(&self.config.user_token)
            .json(&body);

        if let Some(ref cookie) = self.config.session_cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        self.finish(method, request).await
    }

    async fn finish<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> ApiResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{}: {}", method, e)))?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Transport(format!("{}: failed to parse response: {}", method, e)))?;

        debug!(method, ok = envelope.ok, "Slack API call");

        if !envelope.ok {
            return Err(ApiError::Platform(
                envelope.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        envelope
            .body
            .ok_or_else(|| ApiError::Transport(format!("{}: response body missing", method)))
    }
}

#[async_trait]
impl PlatformApi for SlackClient {
    async fn search_workflows(&self, query: &WorkflowQuery) -> ApiResult<Vec<Workflow>> {
        let mut body = json!({
            "collaborator_ids": query.collaborators,
            "publish_status": query.publish_status,
        });
        if let Some(ref q) = query.query {
            body["query"] = json!(q);
        }

        let result: SearchBody = self.user_call("admin.workflows.search", body).await?;
        Ok(result.workflows)
    }

    async fn create_workflow(
        &self,
        title: &str,
        description: &str,
        team_id: Option<&str>,
    ) -> ApiResult<Workflow> {
        let result: WorkflowBody = self
            .user_call(
                "functions.workflows.create",
                json!({
                    "title": title,
                    "description": description,
                    "team_id": team_id,
                }),
            )
            .await?;
        Ok(result.workflow)
    }

    async fn publish_workflow(&self, workflow_id: &str) -> ApiResult<PublishedWorkflow> {
        let result: PublishBody = self
            .user_call("functions.workflows.publish", json!({ "workflow_id": workflow_id }))
            .await?;
        Ok(result.decorated_workflow)
    }

    async fn unpublish_workflow(&self, workflow_id: &str) -> ApiResult<()> {
        let _: Empty = self
            .user_call("functions.workflows.unpublish", json!({ "workflow_id": workflow_id }))
            .await?;
        Ok(())
    }

    async fn delete_workflow(&self, workflow_id: &str) -> ApiResult<()> {
        let _: Empty = self
            .user_call("functions.workflows.delete", json!({ "workflow_id": workflow_id }))
            .await?;
        Ok(())
    }

    async fn create_trigger(&self, request: &TriggerCreate) -> ApiResult<Trigger> {
        let result: TriggerBody = self
            .user_call(
                "workflows.triggers.create",
                json!({
                    "trigger_id": request.trigger_id,
                    "inputs": {},
                    "workflow": request.workflow_id,
                    "name": request.name,
                    "workflow_app_id": request.app_id,
                    "team_id": request.team_id,
                }),
            )
            .await?;
        Ok(result.trigger)
    }

    async fn update_trigger(&self, request: &TriggerUpdate) -> ApiResult<Trigger> {
        let result: TriggerBody = self
            .user_call(
                "workflows.triggers.update",
                json!({
                    "trigger_id": request.trigger_id,
                    "inputs": request.inputs,
                    "workflow": request.workflow_id,
                    "name": request.name,
                    "description": request.description,
                }),
            )
            .await?;
        Ok(result.trigger)
    }

    async fn add_collaborators(&self, workflow_id: &str, users: &[UserId]) -> ApiResult<()> {
        let _: Empty = self
            .user_call(
                "admin.workflows.collaborators.add",
                json!({ "workflow_ids": [workflow_id], "collaborator_ids": users }),
            )
            .await?;
        Ok(())
    }

    async fn remove_collaborators(&self, workflow_id: &str, users: &[UserId]) -> ApiResult<()> {
        let _: Empty = self
            .user_call(
                "admin.workflows.collaborators.remove",
                json!({ "workflow_ids": [workflow_id], "collaborator_ids": users }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageSink for SlackClient {
    async fn post_message(&self, message: &OutboundMessage) -> ApiResult<()> {
        let request = self
            .client
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(&self.config.bot_token)
            .json(message);

        let _: Empty = self.finish("chat.postMessage", request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SlackConfig {
        SlackConfig {
            base_url: "https://slack.com/api/".to_string(),
            user_token: "xoxp-test".to_string(),
            bot_token: "xoxb-test".to_string(),
            session_cookie: None,
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_api_url() {
        let client = SlackClient::new(config()).unwrap();
        assert_eq!(
            client.api_url("admin.workflows.search"),
            "https://slack.com/api/admin.workflows.search"
        );
    }

    #[test]
    fn test_envelope_failure_decoding() {
        let envelope: Envelope<Empty> =
            serde_json::from_str(r#"{"ok": false, "error": "invalid_auth"}"#).unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.error.as_deref(), Some("invalid_auth"));
    }

    #[test]
    fn test_publish_body_decoding() {
        let json = r#"{
            "ok": true,
            "decorated_workflow": {
                "input_parameters": {
                    "interactivity": {"name": "interactivity", "type": "slack#/types/interactivity"},
                    "channel": {"name": "channel", "type": "slack#/types/channel_id"}
                }
            }
        }"#;
        let envelope: Envelope<PublishBody> = serde_json::from_str(json).unwrap();
        let published = envelope.body.unwrap().decorated_workflow;

        assert_eq!(published.input_parameters.len(), 2);
        assert_eq!(published.input_parameters["channel"].short_type(), "channel_id");
    }
}
