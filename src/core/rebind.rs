//! Trigger rebinding after a successful publish.
//!
//! Publishing creates a new version of the workflow definition; shortcut
//! triggers have to be pointed at the new inputs, other kinds do not. Each
//! trigger kind gets exactly one policy.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, error};

use crate::adapters::{ApiError, InputBinding, PlatformApi, TriggerUpdate};
use super::catalog::Catalog;
use crate::domain::{PublishedWorkflow, Trigger, TriggerKind, Workflow};

/// What rebinding did to the trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rebinding {
    /// The trigger was updated and the platform returned its new state
    Updated(Trigger),

    /// The trigger kind needs no update
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RebindError {
    #[error("trigger update failed: {0}")]
    Api(#[from] ApiError),

    #[error("workflow has no trigger to rebind")]
    NoTrigger,

    #[error("no rebinding policy for trigger kind '{0}'")]
    Unsupported(TriggerKind),

    /// Webhook workflows are always flagged before publishing, so this is a bug
    #[error("webhook trigger reached rebinding; webhook workflows must be flagged before publish")]
    WebhookFault,
}

/// Bindings keyed by input name, each mapped to `{{data.<short type>}}`
pub fn input_bindings(published: &PublishedWorkflow) -> BTreeMap<String, InputBinding> {
    published
        .input_parameters
        .values()
        .map(|param| {
            (
                param.name.clone(),
                InputBinding {
                    value: format!("{{{{data.{}}}}}", param.short_type()),
                },
            )
        })
        .collect()
}

/// Apply the rebinding policy for the workflow's primary trigger
pub async fn rebind_trigger(
    platform: &dyn PlatformApi,
    workflow: &Workflow,
    title: &str,
    published: &PublishedWorkflow,
) -> Result<Rebinding, RebindError> {
    let trigger_id = workflow.primary_trigger_id().ok_or(RebindError::NoTrigger)?;
    let kind = workflow
        .primary_trigger_kind()
        .or_else(|| Catalog::builtin().trigger_kind(trigger_id))
        .unwrap_or(TriggerKind::Unknown);

    match kind {
        TriggerKind::Shortcut => {
            let update = TriggerUpdate {
                trigger_id: trigger_id.to_string(),
                workflow_id: workflow.id.clone(),
                inputs: input_bindings(published),
                name: title.to_string(),
                description: workflow.description.clone(),
            };
            let trigger = platform.update_trigger(&update).await?;
            debug!(workflow_id = %workflow.id, trigger_id, "Rebound shortcut trigger");
            Ok(Rebinding::Updated(trigger))
        }
        TriggerKind::Webhook => {
            error!(
                workflow_id = %workflow.id,
                trigger_id,
                fault = "webhook_rebinding",
                "Internal consistency fault: webhook trigger reached rebinding"
            );
            Err(RebindError::WebhookFault)
        }
        // Scheduled triggers keep working across publishes
        TriggerKind::Schedule => Ok(Rebinding::Unchanged),
        // TODO: confirm against the platform whether event triggers need their inputs rebound
        TriggerKind::Event => Ok(Rebinding::Unchanged),
        TriggerKind::Unknown => Err(RebindError::Unsupported(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InputParameter;

    #[test]
    fn test_bindings_use_short_type_names() {
        let mut published = PublishedWorkflow::default();
        published.input_parameters.insert(
            "interactivity".to_string(),
            InputParameter {
                name: "interactivity".to_string(),
                type_path: "slack#/types/interactivity".to_string(),
            },
        );
        published.input_parameters.insert(
            "user".to_string(),
            InputParameter {
                name: "user".to_string(),
                type_path: "slack#/types/user_id".to_string(),
            },
        );

        let bindings = input_bindings(&published);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings["interactivity"].value, "{{data.interactivity}}");
        assert_eq!(bindings["user"].value, "{{data.user_id}}");
    }

    #[test]
    fn test_no_inputs_no_bindings() {
        assert!(input_bindings(&PublishedWorkflow::default()).is_empty());
    }

    #[test]
    fn test_fault_message_is_distinct() {
        assert_ne!(
            RebindError::WebhookFault.to_string(),
            RebindError::Unsupported(TriggerKind::Unknown).to_string()
        );
    }
}
