//! Lifecycle Integration Tests
//!
//! Unpublish, delete, creation, and the raw action payload boundary.

mod common;

use common::*;
use flowgate::core::{GovernanceError, Operation, REQUEST_REASON};
use flowgate::domain::{AuditAction, GovernanceRequest, RequestedAction, WorkflowState};

fn request(action: RequestedAction, workflow_id: &str, actor: &str) -> GovernanceRequest {
    GovernanceRequest::new(action, workflow_id, "Standup", actor)
}

fn published(id: &str, collaborators: &[&str]) -> flowgate::domain::Workflow {
    let mut workflow = clean_workflow(id, collaborators);
    workflow.is_published = true;
    workflow
}

#[tokio::test]
async fn test_unpublish() {
    let h = harness(FakePlatform::with_workflows([published("Wf1", &["U1", "U2", ADMIN])]));

    let outcome = h
        .orchestrator
        .handle(&request(RequestedAction::Unpublish, "Wf1", "U1"))
        .await
        .unwrap();

    assert_eq!(outcome.state, WorkflowState::Unpublished);
    assert!(!h.platform.workflow("Wf1").unwrap().is_published);

    let entries = h.store.entries_for("Wf1").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::Unpublish);
    assert_eq!(entries[0].actor, "U1");
    assert_eq!(entries[0].reason, REQUEST_REASON);

    assert!(h.sink.sent_to("U2")[0].text.contains("just unpublished"));
}

#[tokio::test]
async fn test_unpublish_failure_keeps_the_audit_entry() {
    let platform = FakePlatform::with_workflows([published("Wf1", &["U1"])]);
    platform.fail("unpublish", "workflow_not_published");
    let h = harness(platform);

    let err = h
        .orchestrator
        .handle(&request(RequestedAction::Unpublish, "Wf1", "U1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GovernanceError::ExternalCall {
            operation: Operation::Unpublish,
            ..
        }
    ));
    assert!(!err.is_compensated());
    assert!(h.platform.workflow("Wf1").unwrap().is_published);
    assert_eq!(h.store.entries_for("Wf1").unwrap().len(), 1);
    assert!(h.sink.messages().is_empty());
}

#[tokio::test]
async fn test_delete() {
    let h = harness(FakePlatform::with_workflows([published("Wf1", &["U1", "U2"])]));

    let outcome = h
        .orchestrator
        .handle(&request(RequestedAction::Delete, "Wf1", "U1"))
        .await
        .unwrap();

    assert_eq!(outcome.state, WorkflowState::Deleted);
    assert!(outcome.state.is_terminal());
    assert!(h.platform.workflow("Wf1").is_none());

    let entries = h.store.entries_for("Wf1").unwrap();
    assert_eq!(entries[0].action, AuditAction::Delete);
    assert!(h.sink.sent_to("U2")[0].text.contains("just deleted"));
}

#[tokio::test]
async fn test_deleted_workflow_is_not_found_afterwards() {
    let h = harness(FakePlatform::with_workflows([published("Wf1", &["U1"])]));
    h.orchestrator
        .handle(&request(RequestedAction::Delete, "Wf1", "U1"))
        .await
        .unwrap();

    for action in [RequestedAction::Publish, RequestedAction::Unpublish, RequestedAction::Delete] {
        let err = h
            .orchestrator
            .handle(&request(action, "Wf1", "U1"))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotFound { .. }));
    }

    assert_eq!(h.platform.count(|c| matches!(c, Call::Delete(_))), 1);
    assert_eq!(h.store.entries_for("Wf1").unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_failure_is_reported() {
    let platform = FakePlatform::with_workflows([published("Wf1", &["U1"])]);
    platform.fail("delete", "restricted_action");
    let h = harness(platform);

    let err = h
        .orchestrator
        .handle(&request(RequestedAction::Delete, "Wf1", "U1"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to delete workflow 'Wf1': restricted_action");
    assert!(h.platform.workflow("Wf1").is_some());
}

#[tokio::test]
async fn test_create_workflow() {
    let h = harness(FakePlatform::default());

    let outcome = h
        .orchestrator
        .create("Standup", "Daily check-in", "U1", Some("T1"))
        .await
        .unwrap();

    assert_eq!(outcome.workflow_id, "WfNEW");
    assert_eq!(outcome.state, WorkflowState::Draft);

    let calls = h.platform.calls();
    assert_eq!(calls[0], Call::CreateWorkflow("Standup".to_string()));
    let trigger = match &calls[1] {
        Call::CreateTrigger(t) => t.clone(),
        other => panic!("expected trigger creation, got {:?}", other),
    };
    assert_eq!(trigger.workflow_id, "WfNEW");
    assert_eq!(trigger.name, "Standup");
    assert_eq!(trigger.team_id.as_deref(), Some("T1"));
    assert!(uuid::Uuid::parse_str(&trigger.trigger_id).is_ok());
    assert_eq!(
        calls[2],
        Call::AddCollaborators(
            "WfNEW".to_string(),
            vec!["U1".to_string(), ADMIN.to_string()]
        )
    );

    assert_eq!(
        outcome.share_link,
        Some(format!("{}{}", LINK_BASE, trigger.trigger_id))
    );
    assert!(h.sink.sent_to("U1")[0].text.contains("was created"));
}

#[tokio::test]
async fn test_create_stops_at_first_failure() {
    let platform = FakePlatform::default();
    platform.fail("create_trigger", "invalid_app");
    let h = harness(platform);

    let err = h
        .orchestrator
        .create("Standup", "", "U1", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GovernanceError::ExternalCall {
            operation: Operation::CreateTrigger,
            ..
        }
    ));
    assert_eq!(h.platform.count(|c| matches!(c, Call::AddCollaborators(..))), 0);
    assert!(h.sink.messages().is_empty());
}

#[tokio::test]
async fn test_dispatch_payloads() {
    let h = harness(FakePlatform::with_workflows([clean_workflow("Wf1", &["U1"])]));

    let response = h
        .orchestrator
        .dispatch(
            r#"{"action":"publish","workflowId":"Wf1","workflowName":"Standup"}"#,
            "U1",
        )
        .await;
    assert!(response.ok);
    assert!(response.error.is_none());

    let response = h
        .orchestrator
        .dispatch(r#"{"action":"archive","workflowId":"Wf1"}"#, "U1")
        .await;
    assert!(!response.ok);

    let response = h
        .orchestrator
        .dispatch(r#"{"action":"delete","workflowId":""}"#, "U1")
        .await;
    assert!(!response.ok);

    // Only the first payload reached the platform
    assert_eq!(h.platform.count(|c| matches!(c, Call::Search(_))), 1);
}

#[tokio::test]
async fn test_dispatch_reports_governance_errors() {
    let platform = FakePlatform::with_workflows([clean_workflow("Wf1", &["U1"])]);
    platform.fail("publish", "workflow_invalid");
    let h = harness(platform);

    let response = h
        .orchestrator
        .dispatch(r#"{"action":"publish","workflowId":"Wf1"}"#, "U1")
        .await;

    assert!(!response.ok);
    assert_eq!(
        response.error.as_deref(),
        Some("Failed to publish workflow 'Wf1': workflow_invalid")
    );
}
