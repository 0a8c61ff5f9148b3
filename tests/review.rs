//! Review Resolution Integration Tests
//!
//! Approving and denying flagged workflows.

mod common;

use common::*;
use flowgate::core::{GovernanceError, Operation};
use flowgate::domain::{
    AuditAction, GovernanceRequest, RequestedAction, TriggerKind, Workflow, WorkflowState,
};

/// Shortcut workflow flagged only for its custom step
fn custom_step_workflow(id: &str) -> Workflow {
    Workflow::new(id, "Expenses")
        .with_trigger("Ftt0101", TriggerKind::Shortcut)
        .with_step("Fn_custom")
        .with_collaborator("U1")
        .with_collaborator("U2")
}

async fn flagged(workflow: Workflow) -> Harness {
    let id = workflow.id.clone();
    let h = harness(FakePlatform::with_workflows([workflow]));
    let outcome = h
        .orchestrator
        .handle(&GovernanceRequest::new(RequestedAction::Publish, id, "", "U1"))
        .await
        .unwrap();
    assert_eq!(outcome.state, WorkflowState::PendingReview);
    h
}

#[tokio::test]
async fn test_approve_publishes_and_restores_collaborators() {
    let h = flagged(custom_step_workflow("Wf1")).await;

    let outcome = h.orchestrator.approve("Wf1", "UREV").await.unwrap();

    assert_eq!(outcome.state, WorkflowState::Published);
    assert!(outcome.share_link.is_some());
    assert_eq!(h.platform.count(|c| matches!(c, Call::Publish(_))), 1);
    assert!(h.store.pending_review("Wf1").unwrap().is_none());

    let snapshot = h.platform.workflow("Wf1").unwrap();
    assert!(snapshot.has_collaborator("U1"));
    assert!(snapshot.has_collaborator("U2"));
    assert!(snapshot.has_collaborator(ADMIN));

    let actions: Vec<AuditAction> = h
        .store
        .entries_for("Wf1")
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec![AuditAction::Flag, AuditAction::Approve]);

    let approvals = h.sink.sent_to("U2");
    assert!(approvals.last().unwrap().text.contains("was approved and published"));

    assert_eq!(
        h.orchestrator.current_state(&snapshot).unwrap(),
        WorkflowState::Published
    );
}

#[tokio::test]
async fn test_deny_restores_collaborators_without_publishing() {
    let h = flagged(custom_step_workflow("Wf1")).await;

    let outcome = h
        .orchestrator
        .deny("Wf1", "UREV", Some("custom steps need a security review".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.state, WorkflowState::Draft);
    assert_eq!(h.platform.count(|c| matches!(c, Call::Publish(_))), 0);
    assert!(h.store.pending_review("Wf1").unwrap().is_none());

    let snapshot = h.platform.workflow("Wf1").unwrap();
    assert!(snapshot.has_collaborator("U1"));
    assert!(snapshot.has_collaborator("U2"));

    let entries = h.store.entries_for("Wf1").unwrap();
    assert_eq!(entries.last().unwrap().action, AuditAction::Deny);
    assert_eq!(entries.last().unwrap().actor, "UREV");

    let notice = h.sink.sent_to("U1").last().cloned().unwrap();
    assert!(notice.text.contains("was not approved"));
    assert!(notice.text.contains("custom steps need a security review"));
}

#[tokio::test]
async fn test_a_review_is_resolved_only_once() {
    let h = flagged(custom_step_workflow("Wf1")).await;
    h.orchestrator.deny("Wf1", "UREV", None).await.unwrap();

    let err = h.orchestrator.approve("Wf1", "UREV").await.unwrap_err();
    assert!(matches!(err, GovernanceError::NoPendingReview { .. }));

    let err = h.orchestrator.deny("Wf1", "UREV", None).await.unwrap_err();
    assert!(matches!(err, GovernanceError::NoPendingReview { .. }));

    assert_eq!(h.platform.count(|c| matches!(c, Call::Publish(_))), 0);
}

#[tokio::test]
async fn test_approve_without_review_is_rejected() {
    let h = harness(FakePlatform::with_workflows([clean_workflow("Wf1", &["U1", ADMIN])]));

    let err = h.orchestrator.approve("Wf1", "UREV").await.unwrap_err();

    assert!(matches!(err, GovernanceError::NoPendingReview { .. }));
    assert_eq!(h.platform.count(|c| matches!(c, Call::Publish(_))), 0);
}

#[tokio::test]
async fn test_approving_a_webhook_workflow_is_rolled_back() {
    let h = flagged(webhook_workflow("Wf2", &["U1", "U2"])).await;

    let err = h.orchestrator.approve("Wf2", "UREV").await.unwrap_err();

    assert!(matches!(err, GovernanceError::InternalFault { .. }));
    assert_eq!(h.platform.count(|c| matches!(c, Call::Unpublish(_))), 1);

    // Nothing was decided, so the review stays open and nobody is restored
    assert!(h.store.pending_review("Wf2").unwrap().is_some());
    assert_eq!(
        h.platform.workflow("Wf2").unwrap().collaborators,
        vec![ADMIN.to_string()]
    );
}

#[tokio::test]
async fn test_failed_restore_keeps_the_review_open_for_deny() {
    let h = flagged(custom_step_workflow("Wf1")).await;
    h.platform.fail("add_collaborators", "ratelimited");

    let err = h.orchestrator.deny("Wf1", "UREV", None).await.unwrap_err();

    assert!(matches!(
        err,
        GovernanceError::ExternalCall {
            operation: Operation::AddCollaborators,
            ..
        }
    ));
    assert!(h.store.pending_review("Wf1").unwrap().is_some());
    assert!(!h.platform.workflow("Wf1").unwrap().has_collaborator("U1"));
    assert_eq!(h.store.entries_for("Wf1").unwrap().len(), 1);

    h.platform.clear_failure("add_collaborators");
    let outcome = h.orchestrator.deny("Wf1", "UREV", None).await.unwrap();

    assert_eq!(outcome.state, WorkflowState::Draft);
    assert!(h.store.pending_review("Wf1").unwrap().is_none());
    let snapshot = h.platform.workflow("Wf1").unwrap();
    assert!(snapshot.has_collaborator("U1"));
    assert!(snapshot.has_collaborator("U2"));

    let actions: Vec<AuditAction> = h
        .store
        .entries_for("Wf1")
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec![AuditAction::Flag, AuditAction::Deny]);
}

#[tokio::test]
async fn test_failed_restore_keeps_the_review_open_for_approve() {
    let h = flagged(custom_step_workflow("Wf1")).await;
    h.platform.fail("add_collaborators", "ratelimited");

    let err = h.orchestrator.approve("Wf1", "UREV").await.unwrap_err();

    assert!(matches!(
        err,
        GovernanceError::ExternalCall {
            operation: Operation::AddCollaborators,
            ..
        }
    ));
    // Published, but still waiting on review until the collaborators are back
    let snapshot = h.platform.workflow("Wf1").unwrap();
    assert!(snapshot.is_published);
    assert_eq!(
        h.orchestrator.current_state(&snapshot).unwrap(),
        WorkflowState::PendingReview
    );

    h.platform.clear_failure("add_collaborators");
    let outcome = h.orchestrator.approve("Wf1", "UREV").await.unwrap();

    assert_eq!(outcome.state, WorkflowState::Published);
    assert!(h.store.pending_review("Wf1").unwrap().is_none());
    let snapshot = h.platform.workflow("Wf1").unwrap();
    assert!(snapshot.has_collaborator("U1"));
    assert!(snapshot.has_collaborator("U2"));
    assert_eq!(
        h.store.entries_for("Wf1").unwrap().last().unwrap().action,
        AuditAction::Approve
    );
}
