//! flowgate - Workflow publication governance engine
//!
//! Sits between people who build automated workflows on a collaborative
//! messaging platform and the platform's publish/unpublish/delete
//! operations. Publish requests are checked against a fixed set of
//! rulesets; anything that fails is held for manual review, with its
//! collaborators demoted until a reviewer decides.
//!
//! # Architecture
//!
//! The engine holds no workflow state of its own:
//! - Workflow snapshots are fetched from the platform per request
//! - Every decision is recorded in an append-only audit trail
//! - A failed trigger rebinding after publish is compensated by an unpublish
//!
//! # Modules
//!
//! - `adapters`: Platform API and message delivery (Slack Web API)
//! - `core`: Rules, audit store, collaborator sync, orchestration
//! - `domain`: Data structures (Workflow, AuditEntry, GovernanceRequest)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Publish a workflow on behalf of a user
//! flowgate publish Wf0123 --actor U0456 --title "Standup"
//!
//! # Dry-run the rulesets against a snapshot
//! flowgate check workflow.json
//!
//! # Resolve a flagged workflow
//! flowgate approve Wf0123 --reviewer U0789
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{ApiError, MessageSink, PlatformApi, SlackClient, SlackConfig};
pub use core::{AuditLog, GovernanceError, GovernanceSettings, PublicationOrchestrator, RuleEngine};
pub use domain::{GovernanceRequest, Outcome, RequestedAction, Workflow, WorkflowState};
