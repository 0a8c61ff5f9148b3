//! Core governance logic.
//!
//! This module contains:
//! - Catalog: Built-in trigger and step identifiers
//! - RuleEngine: Publish-time rulesets
//! - AuditLog: Durable audit trail and review queue
//! - CollaboratorSync: Admin presence, demotion and restoration
//! - NotificationDispatcher: Status messages to people and the review channel
//! - PublicationOrchestrator: The publish/unpublish/delete state machine

pub mod audit_log;
pub mod catalog;
pub mod collaborators;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod rebind;
pub mod rules;

// Re-export commonly used types
pub use audit_log::{AuditLog, StoreError};
pub use catalog::Catalog;
pub use collaborators::CollaboratorSync;
pub use error::{GovernanceError, Operation};
pub use notify::{AccessLink, NotificationDispatcher, ReviewChannel};
pub use orchestrator::{GovernanceSettings, PublicationOrchestrator, REQUEST_REASON, ROLLBACK_REASON};
pub use rebind::{input_bindings, rebind_trigger, RebindError, Rebinding};
pub use rules::{quoted_names, RuleEngine, RuleViolation, Ruleset, STANDARD_RULES};
