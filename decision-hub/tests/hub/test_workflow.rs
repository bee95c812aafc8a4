//! End-to-end workflow aggregation tests

use super::common::*;
use decision_hub_sdk::{WorkflowRequest, WorkflowStatus};

#[tokio::test]
async fn test_no_selected_stages_still_completes() {
    let hub = default_hub();

    let result = hub.run_workflow(empty_request("S1")).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.strategy_id, "S1");
    assert!(result.compliance.is_none());
    assert!(result.scenarios.is_empty());
    assert!(result.optimization.is_none());
    assert!(result.stage_failures.is_empty());
}

#[tokio::test]
async fn test_default_selectors_produce_rules_and_one_scenario() {
    let hub = default_hub();

    let result = hub
        .run_workflow(WorkflowRequest::new("S1"))
        .await
        .unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);

    let compliance = result.compliance.expect("rules were selected");
    assert_eq!(compliance.strategy_id, "S1");

    assert_eq!(result.scenarios.len(), 1);
    assert_eq!(result.scenarios[0].scenario_set, "default");
    assert_eq!(result.scenarios[0].strategy_id, "S1");

    assert!(result.optimization.is_none());
    assert!(result.stage_failures.is_empty());
}

#[tokio::test]
async fn test_workflow_ids_are_unique_per_invocation() {
    let hub = default_hub();
    let request = empty_request("S1");

    let first = hub.run_workflow(request.clone()).await.unwrap();
    let second = hub.run_workflow(request).await.unwrap();

    assert!(first.workflow_id.starts_with("workflow-"));
    assert!(second.workflow_id.starts_with("workflow-"));
    assert_ne!(first.workflow_id, second.workflow_id);
}

#[tokio::test]
async fn test_compliance_presence_tracks_its_selector_only() {
    let hub = default_hub();

    let mut request = empty_request("S1");
    request.run_optimization = true;

    let result = hub.run_workflow(request).await.unwrap();

    assert!(result.compliance.is_none());
    assert!(result.scenarios.is_empty());
    assert!(result.optimization.is_some());
    assert_eq!(result.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn test_optimization_objective_from_metadata() {
    let hub = default_hub();

    let mut request = empty_request("S1");
    request.run_optimization = true;
    request.metadata.insert(
        "objective".to_string(),
        serde_json::json!("financial_resilience"),
    );

    let result = hub.run_workflow(request).await.unwrap();

    let optimization = result.optimization.expect("optimization was selected");
    assert_eq!(optimization.objective, "financial_resilience");
}

#[tokio::test]
async fn test_metadata_is_echoed_on_the_result() {
    let hub = default_hub();

    let mut request = empty_request("S1");
    request
        .metadata
        .insert("campus".to_string(), serde_json::json!("north"));
    request
        .metadata
        .insert("cycle".to_string(), serde_json::json!(2026));

    let result = hub.run_workflow(request).await.unwrap();

    assert_eq!(result.metadata.get("campus"), Some(&serde_json::json!("north")));
    assert_eq!(result.metadata.get("cycle"), Some(&serde_json::json!(2026)));
}

#[tokio::test]
async fn test_scenario_sets_fan_out_preserving_request_order() {
    let hub = default_hub();

    let mut request = empty_request("S1");
    request.run_scenarios = true;
    request.metadata.insert(
        "scenario_sets".to_string(),
        serde_json::json!(["baseline", "stress-test", "expansion"]),
    );
    request
        .metadata
        .insert("runs".to_string(), serde_json::json!(20));

    let result = hub.run_workflow(request).await.unwrap();

    let sets: Vec<_> = result
        .scenarios
        .iter()
        .map(|s| s.scenario_set.as_str())
        .collect();
    assert_eq!(sets, vec!["baseline", "stress-test", "expansion"]);
    assert_eq!(result.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn test_status_is_pollable_after_completion() {
    let hub = default_hub();

    let result = hub.run_workflow(empty_request("S1")).await.unwrap();

    let tracked = hub.status(&result.workflow_id).expect("workflow was tracked");
    assert_eq!(tracked.status, WorkflowStatus::Completed);
    assert!(hub.status("workflow-unknown").is_none());
}

#[tokio::test]
async fn test_identical_requests_yield_equivalent_results() {
    let hub = default_hub();

    let mut request = WorkflowRequest::new("S1");
    request
        .metadata
        .insert("runs".to_string(), serde_json::json!(50));

    let first = hub.run_workflow(request.clone()).await.unwrap();
    let second = hub.run_workflow(request).await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(
        first.compliance.as_ref().map(|c| c.passed),
        second.compliance.as_ref().map(|c| c.passed)
    );
    assert_eq!(first.scenarios.len(), second.scenarios.len());
    assert_eq!(first.scenarios[0].metrics, second.scenarios[0].metrics);
}
