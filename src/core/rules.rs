//! Publication rules.
//!
//! Each rule is a named, independent predicate over a workflow snapshot. A
//! rule returning `true` means the workflow must go to human review instead
//! of being published automatically.

use serde::Serialize;

use super::catalog::{
    Catalog, LIST_ITEM_UPDATED_TRIGGER, MESSAGE_POSTED_TRIGGER, SWITCH_STEP,
    UPDATE_LIST_RECORD_STEP, WEBHOOK_TRIGGER,
};
use crate::domain::Workflow;

/// A named predicate over a workflow snapshot
#[derive(Clone, Copy)]
pub struct Ruleset {
    pub name: &'static str,
    pub evaluate: fn(&Workflow, &Catalog) -> bool,
}

impl std::fmt::Debug for Ruleset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ruleset").field("name", &self.name).finish()
    }
}

/// A rule that flagged a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleViolation {
    pub name: &'static str,
}

fn has_step(workflow: &Workflow, function_id: &str) -> bool {
    workflow.steps.iter().any(|s| s.function_id == function_id)
}

fn has_trigger(workflow: &Workflow, trigger_id: &str) -> bool {
    workflow.trigger_ids.iter().any(|t| t == trigger_id)
}

// Other rules only look at top-level steps, not the steps inside branches
fn branching(workflow: &Workflow, _: &Catalog) -> bool {
    has_step(workflow, SWITCH_STEP)
}

fn webhook_trigger(workflow: &Workflow, _: &Catalog) -> bool {
    has_trigger(workflow, WEBHOOK_TRIGGER)
}

fn keyword_trigger(workflow: &Workflow, _: &Catalog) -> bool {
    has_trigger(workflow, MESSAGE_POSTED_TRIGGER)
}

// Updating a list record from a list-update trigger can loop forever
fn list_recursion(workflow: &Workflow, _: &Catalog) -> bool {
    has_trigger(workflow, LIST_ITEM_UPDATED_TRIGGER) && has_step(workflow, UPDATE_LIST_RECORD_STEP)
}

fn custom_trigger(workflow: &Workflow, catalog: &Catalog) -> bool {
    workflow.trigger_ids.iter().any(|t| !catalog.is_known_trigger(t))
}

fn custom_step(workflow: &Workflow, catalog: &Catalog) -> bool {
    workflow
        .steps
        .iter()
        .any(|s| !catalog.is_known_step(&s.function_id))
}

/// The fixed rule set, in reporting order
pub const STANDARD_RULES: &[Ruleset] = &[
    Ruleset {
        name: "Filter branching workflows",
        evaluate: branching,
    },
    Ruleset {
        name: "Filter webhook triggers",
        evaluate: webhook_trigger,
    },
    Ruleset {
        name: "Filter keyword execution trigger",
        evaluate: keyword_trigger,
    },
    Ruleset {
        name: "Filter list recursion attempts",
        evaluate: list_recursion,
    },
    Ruleset {
        name: "Filter custom triggers",
        evaluate: custom_trigger,
    },
    Ruleset {
        name: "Filter custom steps",
        evaluate: custom_step,
    },
];

/// Evaluates snapshots against an ordered list of rules
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<Ruleset>,
    catalog: &'static Catalog,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleEngine {
    /// The standard rules over the built-in catalog
    pub fn standard() -> Self {
        Self::new(STANDARD_RULES.to_vec(), Catalog::builtin())
    }

    pub fn new(rules: Vec<Ruleset>, catalog: &'static Catalog) -> Self {
        Self { rules, catalog }
    }

    pub fn rules(&self) -> &[Ruleset] {
        &self.rules
    }

    /// Names of every rule that flags `workflow`, in rule order
    pub fn evaluate(&self, workflow: &Workflow) -> Vec<RuleViolation> {
        self.rules
            .iter()
            .filter(|rule| (rule.evaluate)(workflow, self.catalog))
            .map(|rule| RuleViolation { name: rule.name })
            .collect()
    }
}

/// `"A", "B"` style list used in audit reasons
pub fn quoted_names(violations: &[RuleViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("\"{}\"", v.name))
        .collect::<Vec<_>>()
        .join(", ")
}
