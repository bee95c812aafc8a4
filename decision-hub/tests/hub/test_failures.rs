//! Failure isolation, timeout, and deadline tests

use super::common::*;
use decision_hub::backend::{StageEndpoints, TaskQueueBackend};
use decision_hub::config::Settings;
use decision_hub::hub::DecisionHub;
use decision_hub_sdk::{StageKind, WorkflowRequest, WorkflowStatus};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_failed_stage_does_not_abort_siblings() {
    let mut dependencies = real_dependencies();
    dependencies.rules = Arc::new(FailingStage {
        kind: StageKind::Rules,
    });
    let hub = hub_with_stages(60, 4, dependencies);

    let result = hub
        .run_workflow(WorkflowRequest::new("S1"))
        .await
        .unwrap();

    // The workflow ran to completion even though one stage failed
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert!(result.compliance.is_none());
    assert_eq!(result.scenarios.len(), 1);

    assert_eq!(result.stage_failures.len(), 1);
    let failure = &result.stage_failures[0];
    assert_eq!(failure.stage, StageKind::Rules);
    assert!(!failure.timed_out);
    assert!(failure.reason.contains("engine rejected"));
}

#[tokio::test]
async fn test_stage_timeout_is_marked_and_isolated() {
    let mut dependencies = real_dependencies();
    dependencies.scenario = Arc::new(SlowStage {
        kind: StageKind::Scenario,
        delay: Duration::from_secs(5),
    });
    let hub = hub_with_stages(1, 4, dependencies);

    let result = hub
        .run_workflow(WorkflowRequest::new("S1"))
        .await
        .unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert!(result.compliance.is_some());
    assert!(result.scenarios.is_empty());

    assert_eq!(result.stage_failures.len(), 1);
    let failure = &result.stage_failures[0];
    assert_eq!(failure.stage, StageKind::Scenario);
    assert!(failure.timed_out);
}

#[tokio::test]
async fn test_workflow_deadline_cancels_outstanding_stages() {
    let delay = Duration::from_millis(600);
    let dependencies = decision_hub::hub::DecisionHubDependencies {
        rules: Arc::new(SlowStage {
            kind: StageKind::Rules,
            delay,
        }),
        scenario: Arc::new(SlowStage {
            kind: StageKind::Scenario,
            delay,
        }),
        optimization: Arc::new(SlowStage {
            kind: StageKind::Optimization,
            delay,
        }),
    };
    // Ceiling of one serializes the five invocations; together they cannot
    // finish inside the one-second timeout plus grace
    let hub = hub_with_stages(1, 1, dependencies);

    let mut request = WorkflowRequest::new("S1");
    request.run_optimization = true;
    request.metadata.insert(
        "scenario_sets".to_string(),
        serde_json::json!(["baseline", "stress-test", "expansion"]),
    );

    let result = hub.run_workflow(request).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Failed);
    assert!(!result.stage_failures.is_empty());
    assert!(result.stage_failures.iter().any(|f| f.timed_out));

    // Stages that finished before the deadline are kept
    let completed = usize::from(result.compliance.is_some())
        + result.scenarios.len()
        + usize::from(result.optimization.is_some());
    assert!(completed >= 1);
    assert_eq!(completed + result.stage_failures.len(), 5);
}

#[tokio::test]
async fn test_unreachable_backend_fails_stages_not_workflow() {
    let settings = Settings::default();
    let backend = Arc::new(TaskQueueBackend::new(
        settings.max_parallel_scenarios,
        StageEndpoints::default(),
    ));
    let hub = DecisionHub::new(settings, backend, real_dependencies());

    let result = hub
        .run_workflow(WorkflowRequest::new("S1"))
        .await
        .unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert!(result.compliance.is_none());
    assert!(result.scenarios.is_empty());

    assert_eq!(result.stage_failures.len(), 2);
    assert!(result.stage_failures.iter().all(|f| !f.timed_out));
    assert!(result
        .stage_failures
        .iter()
        .any(|f| f.reason.contains("no celery worker endpoint")));
}
