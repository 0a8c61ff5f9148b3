//! Domain types for the flowgate governance engine.
//!
//! This module contains the core data structures:
//! - Workflow: Transient snapshots of platform workflows
//! - Audit: Append-only audit and review-queue records
//! - Request: Governance requests, payload decoding and outcomes

pub mod audit;
pub mod request;
pub mod workflow;

// Re-export commonly used types
pub use audit::{AuditAction, AuditEntry, ReviewDecision, ReviewQueueEntry, Verdict};
pub use request::{ActionPayload, GovernanceRequest, Outcome, PayloadError, RequestedAction, Response};
pub use workflow::{
    InputParameter, PublishedWorkflow, Step, Trigger, TriggerKind, TriggerType, UserId, Workflow,
    WorkflowState,
};
