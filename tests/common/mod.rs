//! Shared fixtures for the governance integration tests.
//!
//! `FakePlatform` keeps an in-memory workflow set, records every call in
//! order, and fails any method that has been scripted to fail.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use flowgate::adapters::{
    ApiError, ApiResult, MessageSink, OutboundMessage, PlatformApi, TriggerCreate, TriggerUpdate,
    WorkflowQuery,
};
use flowgate::core::{AuditLog, GovernanceSettings, PublicationOrchestrator, ReviewChannel};
use flowgate::domain::{PublishedWorkflow, Trigger, TriggerKind, UserId, Workflow};

pub const ADMIN: &str = "UADMIN";
pub const REVIEW_CHANNEL: &str = "CREVIEW";
pub const REVIEWERS: &str = "SREVIEW";
pub const LINK_BASE: &str = "https://slack.com/shortcuts/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Search(Vec<UserId>),
    CreateWorkflow(String),
    Publish(String),
    Unpublish(String),
    Delete(String),
    CreateTrigger(TriggerCreate),
    UpdateTrigger(TriggerUpdate),
    AddCollaborators(String, Vec<UserId>),
    RemoveCollaborators(String, Vec<UserId>),
}

#[derive(Default)]
pub struct FakePlatform {
    workflows: Mutex<HashMap<String, Workflow>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    published: Mutex<PublishedWorkflow>,
}

impl FakePlatform {
    pub fn with_workflows(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        let platform = Self::default();
        {
            let mut map = platform.workflows.lock().unwrap();
            for w in workflows {
                map.insert(w.id.clone(), w);
            }
        }
        platform
    }

    /// Make every call to `method` fail with a platform error
    pub fn fail(&self, method: &'static str, code: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(method, ApiError::Platform(code.to_string()));
    }

    pub fn clear_failure(&self, method: &'static str) {
        self.failures.lock().unwrap().remove(method);
    }

    pub fn set_published(&self, published: PublishedWorkflow) {
        *self.published.lock().unwrap() = published;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn workflow(&self, id: &str) -> Option<Workflow> {
        self.workflows.lock().unwrap().get(id).cloned()
    }

    fn record(&self, method: &'static str, call: Call) -> ApiResult<()> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn update(&self, workflow_id: &str, f: impl FnOnce(&mut Workflow)) -> ApiResult<()> {
        let mut map = self.workflows.lock().unwrap();
        match map.get_mut(workflow_id) {
            Some(w) => {
                f(w);
                Ok(())
            }
            None => Err(ApiError::Platform("workflow_not_found".to_string())),
        }
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn search_workflows(&self, query: &WorkflowQuery) -> ApiResult<Vec<Workflow>> {
        self.record("search", Call::Search(query.collaborators.clone()))?;
        let map = self.workflows.lock().unwrap();
        Ok(map
            .values()
            .filter(|w| query.collaborators.iter().any(|c| w.has_collaborator(c)))
            .cloned()
            .collect())
    }

    async fn create_workflow(
        &self,
        title: &str,
        description: &str,
        team_id: Option<&str>,
    ) -> ApiResult<Workflow> {
        self.record("create_workflow", Call::CreateWorkflow(title.to_string()))?;
        let mut workflow = Workflow::new("WfNEW", title);
        workflow.description = description.to_string();
        workflow.team_id = team_id.map(str::to_string);
        self.workflows
            .lock()
            .unwrap()
            .insert(workflow.id.clone(), workflow.clone());
        Ok(workflow)
    }

    async fn publish_workflow(&self, workflow_id: &str) -> ApiResult<PublishedWorkflow> {
        self.record("publish", Call::Publish(workflow_id.to_string()))?;
        self.update(workflow_id, |w| w.is_published = true)?;
        Ok(self.published.lock().unwrap().clone())
    }

    async fn unpublish_workflow(&self, workflow_id: &str) -> ApiResult<()> {
        self.record("unpublish", Call::Unpublish(workflow_id.to_string()))?;
        self.update(workflow_id, |w| w.is_published = false)
    }

    async fn delete_workflow(&self, workflow_id: &str) -> ApiResult<()> {
        self.record("delete", Call::Delete(workflow_id.to_string()))?;
        self.workflows.lock().unwrap().remove(workflow_id);
        Ok(())
    }

    async fn create_trigger(&self, request: &TriggerCreate) -> ApiResult<Trigger> {
        self.record("create_trigger", Call::CreateTrigger(request.clone()))?;
        Ok(Trigger {
            id: request.trigger_id.clone(),
            kind: TriggerKind::Shortcut,
            share_url: format!("{}{}", LINK_BASE, request.trigger_id),
        })
    }

    async fn update_trigger(&self, request: &TriggerUpdate) -> ApiResult<Trigger> {
        self.record("update_trigger", Call::UpdateTrigger(request.clone()))?;
        Ok(Trigger {
            id: request.trigger_id.clone(),
            kind: TriggerKind::Shortcut,
            share_url: format!("{}{}/start", LINK_BASE, request.trigger_id),
        })
    }

    async fn add_collaborators(&self, workflow_id: &str, users: &[UserId]) -> ApiResult<()> {
        self.record(
            "add_collaborators",
            Call::AddCollaborators(workflow_id.to_string(), users.to_vec()),
        )?;
        self.update(workflow_id, |w| {
            for u in users {
                if !w.has_collaborator(u) {
                    w.collaborators.push(u.clone());
                }
            }
        })
    }

    async fn remove_collaborators(&self, workflow_id: &str, users: &[UserId]) -> ApiResult<()> {
        self.record(
            "remove_collaborators",
            Call::RemoveCollaborators(workflow_id.to_string(), users.to_vec()),
        )?;
        self.update(workflow_id, |w| w.collaborators.retain(|c| !users.contains(c)))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<OutboundMessage>>,
    failing: Mutex<bool>,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            failing: Mutex::new(true),
        }
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn sent_to(&self, channel: &str) -> Vec<OutboundMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.channel == channel)
            .collect()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn post_message(&self, message: &OutboundMessage) -> ApiResult<()> {
        self.messages.lock().unwrap().push(message.clone());
        if *self.failing.lock().unwrap() {
            return Err(ApiError::Platform("channel_not_found".to_string()));
        }
        Ok(())
    }
}

pub struct Harness {
    pub orchestrator: PublicationOrchestrator,
    pub platform: Arc<FakePlatform>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<AuditLog>,
}

pub fn settings() -> GovernanceSettings {
    GovernanceSettings {
        admin_user_id: ADMIN.to_string(),
        review_channel: ReviewChannel {
            channel_id: REVIEW_CHANNEL.to_string(),
            usergroup_id: REVIEWERS.to_string(),
        },
        link_base: LINK_BASE.to_string(),
    }
}

pub fn harness(platform: FakePlatform) -> Harness {
    harness_with_sink(platform, RecordingSink::default())
}

pub fn harness_with_sink(platform: FakePlatform, sink: RecordingSink) -> Harness {
    let platform = Arc::new(platform);
    let sink = Arc::new(sink);
    let store = Arc::new(AuditLog::open_in_memory().unwrap());

    let orchestrator = PublicationOrchestrator::new(
        platform.clone(),
        sink.clone(),
        Arc::clone(&store),
        settings(),
    );

    Harness {
        orchestrator,
        platform,
        sink,
        store,
    }
}

/// A workflow that passes every rule: link trigger, send-message step
pub fn clean_workflow(id: &str, collaborators: &[&str]) -> Workflow {
    let mut workflow = Workflow::new(id, "Standup")
        .with_trigger("Ftt0101", TriggerKind::Shortcut)
        .with_step("Fn0102");
    for c in collaborators {
        workflow = workflow.with_collaborator(*c);
    }
    workflow
}

/// A workflow with a webhook trigger
pub fn webhook_workflow(id: &str, collaborators: &[&str]) -> Workflow {
    let mut workflow = Workflow::new(id, "Inbound hook")
        .with_trigger("Ftt0107", TriggerKind::Webhook)
        .with_step("Fn0102");
    for c in collaborators {
        workflow = workflow.with_collaborator(*c);
    }
    workflow
}
