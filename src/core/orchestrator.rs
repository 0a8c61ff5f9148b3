//! Publication orchestrator.
//!
//! Drives publish, unpublish and delete requests through rule evaluation,
//! collaborator reconciliation, the external platform and the audit trail.
//! Each request is one sequential chain of external calls that stops at the
//! first failure. The only automatic remedy is the compensating unpublish
//! after a failed trigger rebinding.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::audit_log::AuditLog;
use super::collaborators::CollaboratorSync;
use super::error::{GovernanceError, Operation};
use super::notify::{AccessLink, NotificationDispatcher, ReviewChannel};
use super::rebind::{rebind_trigger, RebindError, Rebinding};
use super::rules::{quoted_names, RuleEngine, RuleViolation};
use crate::adapters::{ApiError, MessageSink, PlatformApi, TriggerCreate, WorkflowQuery};
use crate::domain::{
    ActionPayload, AuditAction, AuditEntry, GovernanceRequest, Outcome, RequestedAction, Response,
    ReviewDecision, ReviewQueueEntry, TriggerKind, UserId, Verdict, Workflow, WorkflowState,
};

/// Audit reason for the compensating unpublish
pub const ROLLBACK_REASON: &str = "automatic rollback: trigger rebinding failed";

/// Audit reason for actor-initiated lifecycle requests
pub const REQUEST_REASON: &str = "requested via review surface";

/// Identities and destinations the engine acts with
#[derive(Debug, Clone)]
pub struct GovernanceSettings {
    /// Reserved identity kept on every governed workflow
    pub admin_user_id: UserId,

    pub review_channel: ReviewChannel,

    /// Prefix for workflow links, followed by the primary trigger id
    pub link_base: String,
}

type Result<T> = std::result::Result<T, GovernanceError>;

pub struct PublicationOrchestrator {
    platform: Arc<dyn PlatformApi>,
    store: Arc<AuditLog>,
    rules: RuleEngine,
    collaborators: CollaboratorSync,
    notifier: NotificationDispatcher,
    settings: GovernanceSettings,
}

impl PublicationOrchestrator {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        sink: Arc<dyn MessageSink>,
        store: Arc<AuditLog>,
        settings: GovernanceSettings,
    ) -> Self {
        Self {
            collaborators: CollaboratorSync::new(Arc::clone(&platform), settings.admin_user_id.clone()),
            notifier: NotificationDispatcher::new(sink, settings.review_channel.clone()),
            rules: RuleEngine::standard(),
            platform,
            store,
            settings,
        }
    }

    /// Replace the rule set
    pub fn with_rules(mut self, rules: RuleEngine) -> Self {
        self.rules = rules;
        self
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.store
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    /// Decode a raw action payload and run it
    pub async fn dispatch(&self, raw_payload: &str, actor: &str) -> Response {
        match ActionPayload::parse(raw_payload) {
            Ok(payload) => Response::from_result(&self.handle(&payload.into_request(actor)).await),
            Err(e) => {
                warn!(error = %e, "Rejected action payload");
                Response {
                    ok: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Run a governance request
    pub async fn handle(&self, request: &GovernanceRequest) -> Result<Outcome> {
        match request.action {
            RequestedAction::Publish => self.publish(request).await,
            RequestedAction::Unpublish => self.unpublish(request).await,
            RequestedAction::Delete => self.delete(request).await,
        }
    }

    #[instrument(skip_all, fields(workflow_id = %request.workflow_id, actor = %request.actor))]
    pub async fn publish(&self, request: &GovernanceRequest) -> Result<Outcome> {
        let mut workflow = self
            .prepare(&request.workflow_id, &request.workflow_title, &request.actor)
            .await?;

        if self.store.pending_review(&workflow.id)?.is_some() {
            info!("Publish requested while pending review");
            return Err(GovernanceError::PendingReview {
                workflow_id: workflow.id,
            });
        }

        let title = display_title(&request.workflow_title, &workflow);
        let violations = self.rules.evaluate(&workflow);

        if !violations.is_empty() {
            return self
                .flag(&mut workflow, &title, &request.actor, violations)
                .await;
        }

        let link = self.publish_and_rebind(&workflow, &title).await?;

        self.store.append(&AuditEntry::new(
            &workflow.id,
            &request.actor,
            AuditAction::Publish,
            REQUEST_REASON,
        ))?;
        info!("Workflow published");

        let recipients = self.recipients(&workflow, &request.actor);
        self.notifier
            .workflow_published(&title, &request.actor, &link, &recipients)
            .await;

        let mut outcome = Outcome::new(&workflow.id, WorkflowState::Published);
        outcome.share_link = Some(link.url().to_string());
        Ok(outcome)
    }

    #[instrument(skip_all, fields(workflow_id = %request.workflow_id, actor = %request.actor))]
    pub async fn unpublish(&self, request: &GovernanceRequest) -> Result<Outcome> {
        let workflow = self
            .prepare(&request.workflow_id, &request.workflow_title, &request.actor)
            .await?;
        let title = display_title(&request.workflow_title, &workflow);

        self.store.append(&AuditEntry::new(
            &workflow.id,
            &request.actor,
            AuditAction::Unpublish,
            REQUEST_REASON,
        ))?;

        self.platform
            .unpublish_workflow(&workflow.id)
            .await
            .map_err(|e| self.call_failed(Operation::Unpublish, &workflow.id, e))?;
        info!("Workflow unpublished");

        let recipients = self.recipients(&workflow, &request.actor);
        self.notifier
            .workflow_unpublished(&title, &request.actor, &recipients)
            .await;

        Ok(Outcome::new(&workflow.id, WorkflowState::Unpublished))
    }

    #[instrument(skip_all, fields(workflow_id = %request.workflow_id, actor = %request.actor))]
    pub async fn delete(&self, request: &GovernanceRequest) -> Result<Outcome> {
        let workflow = self
            .prepare(&request.workflow_id, &request.workflow_title, &request.actor)
            .await?;
        let title = display_title(&request.workflow_title, &workflow);

        self.store.append(&AuditEntry::new(
            &workflow.id,
            &request.actor,
            AuditAction::Delete,
            REQUEST_REASON,
        ))?;

        self.platform
            .delete_workflow(&workflow.id)
            .await
            .map_err(|e| self.call_failed(Operation::Delete, &workflow.id, e))?;
        info!("Workflow deleted");

        let recipients = self.recipients(&workflow, &request.actor);
        self.notifier
            .workflow_deleted(&title, &request.actor, &recipients)
            .await;

        Ok(Outcome::new(&workflow.id, WorkflowState::Deleted))
    }

    /// Publish a flagged workflow on a reviewer's say-so and give the
    /// demoted collaborators their access back
    #[instrument(skip(self))]
    pub async fn approve(&self, workflow_id: &str, reviewer: &str) -> Result<Outcome> {
        let admin = self.settings.admin_user_id.clone();
        let mut workflow = self.prepare(workflow_id, "", &admin).await?;
        let (review_id, review) = self.open_review(&workflow.id)?;
        let title = workflow.title.clone();

        let link = self.publish_and_rebind(&workflow, &title).await?;

        // The review stays open until everyone demoted is back
        self.collaborators
            .restore(&mut workflow, &review.demoted_collaborators)
            .await
            .map_err(|e| self.call_failed(Operation::AddCollaborators, &workflow.id, e))?;

        let decision = ReviewDecision::new(review_id, reviewer, Verdict::Approved, None);
        let audit = AuditEntry::new(
            &workflow.id,
            reviewer,
            AuditAction::Approve,
            "approved after manual review",
        );
        self.store.record_decision(&decision, &audit)?;
        info!("Flagged workflow approved and published");

        self.notifier
            .review_resolved(&title, true, None, Some(&link), &review.demoted_collaborators)
            .await;

        let mut outcome = Outcome::new(&workflow.id, WorkflowState::Published);
        outcome.share_link = Some(link.url().to_string());
        Ok(outcome)
    }

    /// Reject a flagged workflow. It stays unpublished and its collaborators
    /// are restored so they can change it.
    #[instrument(skip(self))]
    pub async fn deny(
        &self,
        workflow_id: &str,
        reviewer: &str,
        reason: Option<String>,
    ) -> Result<Outcome> {
        let admin = self.settings.admin_user_id.clone();
        let mut workflow = self.prepare(workflow_id, "", &admin).await?;
        let (review_id, review) = self.open_review(&workflow.id)?;

        self.collaborators
            .restore(&mut workflow, &review.demoted_collaborators)
            .await
            .map_err(|e| self.call_failed(Operation::AddCollaborators, &workflow.id, e))?;

        let audit_reason = match reason {
            Some(ref r) => format!("denied after manual review: {}", r),
            None => "denied after manual review".to_string(),
        };
        let decision = ReviewDecision::new(review_id, reviewer, Verdict::Denied, reason.clone());
        let audit = AuditEntry::new(&workflow.id, reviewer, AuditAction::Deny, audit_reason);
        self.store.record_decision(&decision, &audit)?;
        info!("Flagged workflow denied");

        self.notifier
            .review_resolved(
                &workflow.title,
                false,
                reason.as_deref(),
                None,
                &review.demoted_collaborators,
            )
            .await;

        Ok(Outcome::new(&workflow.id, self.current_state(&workflow)?))
    }

    /// Create a workflow with a fresh link trigger, owned by `actor` and the admin identity
    #[instrument(skip(self, description))]
    pub async fn create(
        &self,
        title: &str,
        description: &str,
        actor: &str,
        team_id: Option<&str>,
    ) -> Result<Outcome> {
        let workflow = self
            .platform
            .create_workflow(title, description, team_id)
            .await
            .map_err(|e| self.call_failed(Operation::CreateWorkflow, "", e))?;

        let trigger = self
            .platform
            .create_trigger(&TriggerCreate {
                trigger_id: Uuid::new_v4().to_string(),
                workflow_id: workflow.id.clone(),
                name: title.to_string(),
                app_id: workflow.app_id.clone(),
                team_id: workflow.team_id.clone(),
            })
            .await
            .map_err(|e| self.call_failed(Operation::CreateTrigger, &workflow.id, e))?;

        let mut owners = vec![actor.to_string()];
        if actor != self.settings.admin_user_id {
            owners.push(self.settings.admin_user_id.clone());
        }
        self.platform
            .add_collaborators(&workflow.id, &owners)
            .await
            .map_err(|e| self.call_failed(Operation::AddCollaborators, &workflow.id, e))?;

        info!(workflow_id = %workflow.id, "Workflow created");
        self.notifier
            .workflow_created(title, actor, &trigger.share_url)
            .await;

        let mut outcome = Outcome::new(&workflow.id, WorkflowState::Draft);
        outcome.share_link = Some(trigger.share_url);
        Ok(outcome)
    }

    /// Derive the lifecycle state of a workflow from its snapshot and the store.
    ///
    /// Never reports `Deleted`: a deleted workflow drops out of the platform's
    /// search results, so any later request for it fails with `NotFound`
    /// before a snapshot exists to derive from.
    pub fn current_state(&self, workflow: &Workflow) -> Result<WorkflowState> {
        if self.store.pending_review(&workflow.id)?.is_some() {
            return Ok(WorkflowState::PendingReview);
        }
        if workflow.is_published {
            return Ok(WorkflowState::Published);
        }

        let ever_published = self
            .store
            .entries_for(&workflow.id)?
            .iter()
            .any(|e| matches!(e.action, AuditAction::Publish | AuditAction::Approve));

        Ok(if ever_published {
            WorkflowState::Unpublished
        } else {
            WorkflowState::Draft
        })
    }

    /// Fetch the snapshot, make sure the admin can act on it, and anchor it locally
    async fn prepare(&self, workflow_id: &str, title: &str, collaborator: &str) -> Result<Workflow> {
        let mut workflow = self.fetch(workflow_id, title, collaborator).await?;

        self.collaborators
            .ensure_admin_present(&mut workflow)
            .await
            .map_err(|e| self.call_failed(Operation::AddCollaborators, workflow_id, e))?;

        self.store.upsert_workflow(&workflow.id)?;
        Ok(workflow)
    }

    async fn fetch(&self, workflow_id: &str, title: &str, collaborator: &str) -> Result<Workflow> {
        let query = WorkflowQuery::for_collaborator(title, collaborator);
        let workflows = self.platform.search_workflows(&query).await.map_err(|source| {
            error!(error = %source, "Workflow lookup failed");
            GovernanceError::Lookup {
                workflow_id: workflow_id.to_string(),
                source,
            }
        })?;

        workflows
            .into_iter()
            .find(|w| w.id == workflow_id)
            .ok_or_else(|| {
                warn!(workflow_id, "Workflow not found in search results");
                GovernanceError::NotFound {
                    workflow_id: workflow_id.to_string(),
                }
            })
    }

    /// Route a flagged workflow to review: record, demote, announce
    async fn flag(
        &self,
        workflow: &mut Workflow,
        title: &str,
        actor: &str,
        violations: Vec<RuleViolation>,
    ) -> Result<Outcome> {
        let to_remove = self.collaborators.demotion_list(workflow);

        let review = ReviewQueueEntry::new(&workflow.id, to_remove);
        let audit = AuditEntry::new(
            &workflow.id,
            &self.settings.admin_user_id,
            AuditAction::Flag,
            format!(
                "Workflow was automatically flagged for review ({})",
                quoted_names(&violations)
            ),
        );
        self.store.record_flag(&review, &audit)?;
        warn!(rules = %quoted_names(&violations), "Workflow flagged for review");

        let demoted = self
            .collaborators
            .demote(workflow)
            .await
            .map_err(|e| self.call_failed(Operation::RemoveCollaborators, &workflow.id, e))?;

        self.notifier
            .workflow_flagged(
                &workflow.id,
                title,
                &self.workflow_link(workflow),
                actor,
                &violations,
                &demoted,
            )
            .await;

        let mut outcome = Outcome::new(&workflow.id, WorkflowState::PendingReview);
        outcome.violations = violations.iter().map(|v| v.name.to_string()).collect();
        outcome.demoted = demoted;
        Ok(outcome)
    }

    /// Publish, then rebind the trigger; compensate if rebinding fails
    async fn publish_and_rebind(&self, workflow: &Workflow, title: &str) -> Result<AccessLink> {
        let published = self
            .platform
            .publish_workflow(&workflow.id)
            .await
            .map_err(|e| self.call_failed(Operation::Publish, &workflow.id, e))?;

        match rebind_trigger(self.platform.as_ref(), workflow, title, &published).await {
            Ok(Rebinding::Updated(trigger)) if trigger.kind == TriggerKind::Shortcut => {
                Ok(AccessLink::Start(trigger.share_url))
            }
            Ok(Rebinding::Updated(trigger)) => Ok(AccessLink::Details(trigger.share_url)),
            Ok(Rebinding::Unchanged) => Ok(AccessLink::Details(self.workflow_link(workflow))),
            Err(cause) => Err(self.compensate(workflow, cause).await),
        }
    }

    /// Undo a publish whose trigger could not be rebound
    async fn compensate(&self, workflow: &Workflow, cause: RebindError) -> GovernanceError {
        warn!(workflow_id = %workflow.id, error = %cause, "Trigger rebinding failed, rolling back publish");

        let rollback_error = self.platform.unpublish_workflow(&workflow.id).await.err();
        if let Some(ref e) = rollback_error {
            error!(workflow_id = %workflow.id, error = %e, "Compensating unpublish failed");
        }

        let audit = AuditEntry::new(
            &workflow.id,
            &self.settings.admin_user_id,
            AuditAction::Unpublish,
            ROLLBACK_REASON,
        );
        if let Err(e) = self.store.append(&audit) {
            error!(workflow_id = %workflow.id, error = %e, "Failed to record rollback");
            return e.into();
        }

        match cause {
            RebindError::WebhookFault => GovernanceError::InternalFault {
                workflow_id: workflow.id.clone(),
                detail: cause.to_string(),
            },
            cause => GovernanceError::RolledBack {
                workflow_id: workflow.id.clone(),
                cause: cause.to_string(),
                rollback_error,
            },
        }
    }

    fn open_review(&self, workflow_id: &str) -> Result<(i64, ReviewQueueEntry)> {
        self.store
            .pending_review(workflow_id)?
            .and_then(|review| review.id.map(|id| (id, review)))
            .ok_or_else(|| GovernanceError::NoPendingReview {
                workflow_id: workflow_id.to_string(),
            })
    }

    fn call_failed(&self, operation: Operation, workflow_id: &str, source: ApiError) -> GovernanceError {
        error!(%operation, workflow_id, error = %source, "External call failed");
        GovernanceError::external(operation, workflow_id, source)
    }

    /// Collaborators to notify besides the actor and the admin identity
    fn recipients(&self, workflow: &Workflow, actor: &str) -> Vec<UserId> {
        workflow
            .collaborators_except(&[actor, self.settings.admin_user_id.as_str()])
            .cloned()
            .collect()
    }

    fn workflow_link(&self, workflow: &Workflow) -> String {
        let target = workflow.primary_trigger_id().unwrap_or(&workflow.id);
        format!("{}{}", self.settings.link_base, target)
    }
}

fn display_title(requested: &str, workflow: &Workflow) -> String {
    if requested.trim().is_empty() {
        workflow.title.clone()
    } else {
        requested.to_string()
    }
}
