//! Governance error taxonomy.

use thiserror::Error;

use super::audit_log::StoreError;
use crate::adapters::ApiError;

/// External operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateWorkflow,
    Publish,
    Unpublish,
    Delete,
    CreateTrigger,
    AddCollaborators,
    RemoveCollaborators,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CreateWorkflow => "create workflow",
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Delete => "delete",
            Self::CreateTrigger => "create trigger",
            Self::AddCollaborators => "add collaborators",
            Self::RemoveCollaborators => "remove collaborators",
        };
        f.write_str(name)
    }
}

/// Why a governance request did not complete
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The workflow search itself failed
    #[error("Failed to look up workflow '{workflow_id}': {source}")]
    Lookup {
        workflow_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Workflow '{workflow_id}' was not found")]
    NotFound { workflow_id: String },

    #[error("Failed to {operation} workflow '{workflow_id}': {source}")]
    ExternalCall {
        operation: Operation,
        workflow_id: String,
        #[source]
        source: ApiError,
    },

    /// Published, then rolled back because the trigger could not be rebound
    #[error("Workflow '{workflow_id}' was published but rolled back: {cause}")]
    RolledBack {
        workflow_id: String,
        cause: String,
        /// Set when the compensating unpublish itself failed
        rollback_error: Option<ApiError>,
    },

    /// A state the rules should have made unreachable
    #[error("Internal consistency fault on workflow '{workflow_id}': {detail}")]
    InternalFault { workflow_id: String, detail: String },

    #[error("Workflow '{workflow_id}' is pending review")]
    PendingReview { workflow_id: String },

    #[error("Workflow '{workflow_id}' has no pending review")]
    NoPendingReview { workflow_id: String },

    #[error("Governance store error: {0}")]
    Store(#[from] StoreError),
}

impl GovernanceError {
    pub(crate) fn external(operation: Operation, workflow_id: &str, source: ApiError) -> Self {
        Self::ExternalCall {
            operation,
            workflow_id: workflow_id.to_string(),
            source,
        }
    }

    /// Whether an automatic unpublish was issued while handling this error
    pub fn is_compensated(&self) -> bool {
        matches!(self, Self::RolledBack { .. } | Self::InternalFault { .. })
    }
}
