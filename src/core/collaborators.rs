//! Collaborator reconciliation.
//!
//! The admin identity is kept on every governed workflow so the engine can
//! always act on it. Demotion strips everyone else while a workflow waits on
//! review; restoration puts them back once a reviewer has decided.

use std::sync::Arc;

use tracing::{debug, info};

use crate::adapters::{ApiResult, PlatformApi};
use crate::domain::{UserId, Workflow};

pub struct CollaboratorSync {
    platform: Arc<dyn PlatformApi>,
    admin_user_id: UserId,
}

impl CollaboratorSync {
    pub fn new(platform: Arc<dyn PlatformApi>, admin_user_id: impl Into<UserId>) -> Self {
        Self {
            platform,
            admin_user_id: admin_user_id.into(),
        }
    }

    pub fn admin_user_id(&self) -> &str {
        &self.admin_user_id
    }

    /// Add the admin identity if the snapshot lacks it. Updates the snapshot
    /// and returns whether a call was made.
    pub async fn ensure_admin_present(&self, workflow: &mut Workflow) -> ApiResult<bool> {
        if workflow.has_collaborator(&self.admin_user_id) {
            debug!(workflow_id = %workflow.id, "Admin already a collaborator");
            return Ok(false);
        }

        self.platform
            .add_collaborators(&workflow.id, std::slice::from_ref(&self.admin_user_id))
            .await?;
        workflow.collaborators.push(self.admin_user_id.clone());

        info!(workflow_id = %workflow.id, "Added admin as collaborator");
        Ok(true)
    }

    /// Everyone the demotion would remove
    pub fn demotion_list(&self, workflow: &Workflow) -> Vec<UserId> {
        workflow
            .collaborators_except(&[self.admin_user_id.as_str()])
            .cloned()
            .collect()
    }

    /// Remove every non-admin collaborator and return who was removed
    pub async fn demote(&self, workflow: &mut Workflow) -> ApiResult<Vec<UserId>> {
        let removed = self.demotion_list(workflow);
        if removed.is_empty() {
            return Ok(removed);
        }

        self.platform.remove_collaborators(&workflow.id, &removed).await?;
        workflow.collaborators.retain(|c| *c == self.admin_user_id);

        info!(workflow_id = %workflow.id, removed = removed.len(), "Demoted collaborators");
        Ok(removed)
    }

    /// Put previously demoted collaborators back on a workflow
    pub async fn restore(&self, workflow: &mut Workflow, users: &[UserId]) -> ApiResult<()> {
        let missing: Vec<UserId> = users
            .iter()
            .filter(|u| !workflow.has_collaborator(u))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        self.platform.add_collaborators(&workflow.id, &missing).await?;
        workflow.collaborators.extend(missing.iter().cloned());

        info!(workflow_id = %workflow.id, restored = missing.len(), "Restored collaborators");
        Ok(())
    }
}
