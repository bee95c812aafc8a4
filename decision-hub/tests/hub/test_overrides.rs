//! Metadata override precedence tests

use super::common::*;
use decision_hub_sdk::{WorkflowStatus, DEFAULT_OBJECTIVE, DEFAULT_RUNS};

#[tokio::test]
async fn test_scenario_set_override_beats_default() {
    let hub = default_hub();

    let mut request = empty_request("S1");
    request.run_scenarios = true;
    request
        .metadata
        .insert("scenario_set".to_string(), serde_json::json!("stress-test"));

    let result = hub.run_workflow(request).await.unwrap();

    assert_eq!(result.scenarios.len(), 1);
    assert_eq!(result.scenarios[0].scenario_set, "stress-test");
}

#[tokio::test]
async fn test_runs_override_reaches_the_simulation() {
    let hub = default_hub();

    let mut request = empty_request("S1");
    request.run_scenarios = true;
    request
        .metadata
        .insert("runs".to_string(), serde_json::json!(250));
    request
        .metadata
        .insert("horizon_years".to_string(), serde_json::json!(10));

    let result = hub.run_workflow(request).await.unwrap();

    let metrics = &result.scenarios[0].metrics;
    assert_eq!(metrics.get("runs"), Some(&250.0));
    assert_eq!(metrics.get("horizon_years"), Some(&10.0));
}

#[tokio::test]
async fn test_wrongly_typed_override_falls_back_to_default() {
    let hub = default_hub();

    let mut request = empty_request("S1");
    request.run_scenarios = true;
    request
        .metadata
        .insert("runs".to_string(), serde_json::json!("many"));
    request
        .metadata
        .insert("scenario_set".to_string(), serde_json::json!(7));

    let result = hub.run_workflow(request).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.scenarios[0].scenario_set, "default");
    assert_eq!(
        result.scenarios[0].metrics.get("runs"),
        Some(&f64::from(DEFAULT_RUNS))
    );
}

#[tokio::test]
async fn test_objective_defaults_when_metadata_is_silent() {
    let hub = default_hub();

    let mut request = empty_request("S1");
    request.run_optimization = true;

    let result = hub.run_workflow(request).await.unwrap();

    assert_eq!(
        result.optimization.expect("optimization was selected").objective,
        DEFAULT_OBJECTIVE
    );
}

#[tokio::test]
async fn test_assumptions_flow_into_scenario_metrics() {
    let hub = default_hub();

    let mut flat = empty_request("S1");
    flat.run_scenarios = true;
    flat.metadata
        .insert("runs".to_string(), serde_json::json!(100));

    let mut boosted = flat.clone();
    boosted.metadata.insert(
        "assumptions".to_string(),
        serde_json::json!({"growth_rate": 0.12}),
    );

    let flat_result = hub.run_workflow(flat).await.unwrap();
    let boosted_result = hub.run_workflow(boosted).await.unwrap();

    let flat_npv = flat_result.scenarios[0].metrics["expected_npv"];
    let boosted_npv = boosted_result.scenarios[0].metrics["expected_npv"];
    assert!(boosted_npv > flat_npv);
}
