//! Command-line interface for flowgate.
//!
//! Provides commands for running governance requests against the platform,
//! resolving flagged workflows, evaluating snapshots offline, and inspecting
//! the audit trail and review queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::adapters::{MessageSink, PlatformApi, SlackClient};
use crate::config::{self, ResolvedConfig};
use crate::core::{quoted_names, AuditLog, PublicationOrchestrator, RuleEngine};
use crate::domain::{GovernanceRequest, Outcome, RequestedAction, Workflow};

/// flowgate - Workflow publication governance engine
#[derive(Parser, Debug)]
#[command(name = "flowgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Workflow ID
    pub workflow_id: String,

    /// User making the request
    #[arg(short, long)]
    pub actor: String,

    /// Workflow title, used to narrow the lookup
    #[arg(short, long, default_value = "")]
    pub title: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish a workflow (rules are evaluated first)
    Publish(RequestArgs),

    /// Unpublish a workflow
    Unpublish(RequestArgs),

    /// Delete a workflow
    Delete(RequestArgs),

    /// Run a raw action payload ({"action": ..., "workflowId": ...})
    Dispatch {
        /// Payload JSON
        payload: String,

        /// User making the request
        #[arg(short, long)]
        actor: String,
    },

    /// Approve a flagged workflow and publish it
    Approve {
        workflow_id: String,

        #[arg(short, long)]
        reviewer: String,
    },

    /// Deny a flagged workflow
    Deny {
        workflow_id: String,

        #[arg(short, long)]
        reviewer: String,

        /// Note passed on to the collaborators
        #[arg(long)]
        reason: Option<String>,
    },

    /// Create a workflow with a link trigger
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long)]
        actor: String,

        #[arg(long)]
        team_id: Option<String>,
    },

    /// Evaluate the rulesets against a workflow snapshot (JSON file)
    Check {
        snapshot: PathBuf,
    },

    /// Show the audit trail for a workflow
    Audit {
        workflow_id: String,
    },

    /// List workflows waiting on review
    Queue,

    /// Show the resolved configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Publish(args) => run_request(RequestedAction::Publish, args).await,
            Commands::Unpublish(args) => run_request(RequestedAction::Unpublish, args).await,
            Commands::Delete(args) => run_request(RequestedAction::Delete, args).await,
            Commands::Dispatch { payload, actor } => dispatch(&payload, &actor).await,
            Commands::Approve {
                workflow_id,
                reviewer,
            } => {
                let orchestrator = build_orchestrator()?;
                let outcome = orchestrator.approve(&workflow_id, &reviewer).await?;
                print_outcome(&outcome);
                Ok(())
            }
            Commands::Deny {
                workflow_id,
                reviewer,
                reason,
            } => {
                let orchestrator = build_orchestrator()?;
                let outcome = orchestrator.deny(&workflow_id, &reviewer, reason).await?;
                print_outcome(&outcome);
                Ok(())
            }
            Commands::Create {
                title,
                description,
                actor,
                team_id,
            } => {
                let orchestrator = build_orchestrator()?;
                let outcome = orchestrator
                    .create(&title, &description, &actor, team_id.as_deref())
                    .await?;
                print_outcome(&outcome);
                Ok(())
            }
            Commands::Check { snapshot } => check_snapshot(&snapshot),
            Commands::Audit { workflow_id } => show_audit(&workflow_id),
            Commands::Queue => show_queue(),
            Commands::Config => show_config(),
        }
    }
}

/// Open the governance store, creating its directory if needed
fn open_store(cfg: &ResolvedConfig) -> Result<AuditLog> {
    if let Some(parent) = cfg.database.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    AuditLog::open(&cfg.database)
        .with_context(|| format!("Failed to open governance store: {}", cfg.database.display()))
}

fn build_orchestrator() -> Result<PublicationOrchestrator> {
    let cfg = config::config()?;
    let store = Arc::new(open_store(cfg)?);
    let client = Arc::new(SlackClient::new(cfg.slack_config()?)?);

    let platform: Arc<dyn PlatformApi> = client.clone();
    let sink: Arc<dyn MessageSink> = client;

    Ok(PublicationOrchestrator::new(
        platform,
        sink,
        store,
        cfg.governance.clone(),
    ))
}

async fn run_request(action: RequestedAction, args: RequestArgs) -> Result<()> {
    let orchestrator = build_orchestrator()?;
    let request = GovernanceRequest::new(action, args.workflow_id, args.title, args.actor);

    let outcome = orchestrator.handle(&request).await?;
    print_outcome(&outcome);
    Ok(())
}

async fn dispatch(payload: &str, actor: &str) -> Result<()> {
    let orchestrator = build_orchestrator()?;
    let response = orchestrator.dispatch(payload, actor).await;

    println!("{}", serde_json::to_string(&response)?);
    if let Some(error) = response.error {
        anyhow::bail!(error);
    }
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    println!("Workflow: {}", outcome.workflow_id);
    println!("State:    {}", outcome.state);
    if let Some(ref link) = outcome.share_link {
        println!("Link:     {}", link);
    }
    if !outcome.violations.is_empty() {
        println!("\nFlagged by:");
        for rule in &outcome.violations {
            println!("  - {}", rule);
        }
    }
    if !outcome.demoted.is_empty() {
        println!("\nRemoved collaborators: {}", outcome.demoted.join(", "));
    }
}

/// Evaluate the standard rulesets against a snapshot file
fn check_snapshot(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let workflow: Workflow = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

    let violations = RuleEngine::standard().evaluate(&workflow);

    if violations.is_empty() {
        println!("'{}' passes every ruleset", workflow.title);
    } else {
        println!("'{}' would be flagged: {}", workflow.title, quoted_names(&violations));
    }
    Ok(())
}

/// Show the audit trail for a workflow
fn show_audit(workflow_id: &str) -> Result<()> {
    let cfg = config::config()?;
    let store = open_store(cfg)?;
    let entries = store.entries_for(workflow_id)?;

    if entries.is_empty() {
        println!("No audit entries for {}", workflow_id);
        return Ok(());
    }

    println!("{:<27} {:<10} {:<14} {}", "RECORDED", "ACTION", "ACTOR", "REASON");
    println!("{}", "-".repeat(90));
    for entry in entries {
        println!(
            "{:<27} {:<10} {:<14} {}",
            entry.recorded_at.to_rfc3339(),
            entry.action.as_str(),
            entry.actor,
            entry.reason
        );
    }

    Ok(())
}

/// List workflows waiting on review
fn show_queue() -> Result<()> {
    let cfg = config::config()?;
    let store = open_store(cfg)?;
    let pending = store.pending_reviews()?;

    if pending.is_empty() {
        println!("Review queue is empty");
        return Ok(());
    }

    println!("{:<8} {:<16} {:<27} {}", "REVIEW", "WORKFLOW", "FLAGGED", "DEMOTED");
    println!("{}", "-".repeat(90));
    for review in pending {
        println!(
            "{:<8} {:<16} {:<27} {}",
            review.id.map(|id| id.to_string()).unwrap_or_default(),
            review.workflow_id,
            review.recorded_at.to_rfc3339(),
            review.demoted_collaborators.join(", ")
        );
    }

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("flowgate configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using env and defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Database: {}", cfg.database.display());
    println!();
    println!("Governance:");
    println!("  Admin user:     {}", cfg.governance.admin_user_id);
    println!("  Review channel: {}", cfg.governance.review_channel.channel_id);
    println!("  Reviewer group: {}", cfg.governance.review_channel.usergroup_id);
    println!("  Link base:      {}", cfg.governance.link_base);
    println!();
    println!("API:");
    println!("  Base URL: {}", cfg.api_base);
    println!("  Timeout:  {}s", cfg.timeout_seconds);
    println!("  {:?}", cfg.credentials);

    Ok(())
}
