//! Workflow orchestration core
//!
//! The decision hub owns one `run_workflow` call end to end: it decides
//! which stages to invoke, synthesizes each stage's request from the
//! workflow metadata, fans the invocations out through the configured
//! execution backend, and aggregates whatever comes back (including
//! per-stage failures) into a single [`WorkflowResult`].

use crate::backend;
use crate::config::Settings;
use crate::stages::{OptimizationService, RulesEngineService, ScenarioSimulationService};
use anyhow::Result;
use chrono::{DateTime, Utc};
use decision_hub_sdk::{
    ComplianceCheckRequest, ExecutionBackend, OptimizationRequest, ScenarioRunRequest, Stage,
    StageError, StageFailure, StageKind, StageOutput, StageRequest, WorkflowRequest,
    WorkflowResult, WorkflowStatus, DEFAULT_HORIZON_YEARS, DEFAULT_OBJECTIVE, DEFAULT_RUNS,
    DEFAULT_SCENARIO_SET,
};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Slack on top of the per-dispatch timeout before the whole workflow is
/// deadlined and outstanding stage invocations are cancelled
const DEADLINE_GRACE: Duration = Duration::from_secs(1);

/// Container for the stage services the hub dispatches
pub struct DecisionHubDependencies {
    pub rules: Arc<dyn Stage>,
    pub scenario: Arc<dyn Stage>,
    pub optimization: Arc<dyn Stage>,
}

impl DecisionHubDependencies {
    /// Default in-process stage services
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            rules: Arc::new(RulesEngineService::new()),
            scenario: Arc::new(ScenarioSimulationService::new(
                settings.max_parallel_scenarios,
            )),
            optimization: Arc::new(OptimizationService::new()),
        }
    }
}

/// Status snapshot for one tracked workflow
#[derive(Debug, Clone, Serialize)]
pub struct TrackedStatus {
    pub status: WorkflowStatus,
    pub updated_at: DateTime<Utc>,
}

/// Coordinates validation, simulation, and optimization workflows
pub struct DecisionHub {
    settings: Settings,
    backend: Arc<dyn ExecutionBackend>,
    rules: Arc<dyn Stage>,
    scenario: Arc<dyn Stage>,
    optimization: Arc<dyn Stage>,
    /// Observed status per workflow id, for polling
    statuses: Mutex<HashMap<String, TrackedStatus>>,
}

impl DecisionHub {
    pub fn new(
        settings: Settings,
        backend: Arc<dyn ExecutionBackend>,
        dependencies: DecisionHubDependencies,
    ) -> Self {
        Self {
            settings,
            backend,
            rules: dependencies.rules,
            scenario: dependencies.scenario,
            optimization: dependencies.optimization,
            statuses: Mutex::new(HashMap::new()),
        }
    }

    /// Build a hub with the backend and stage services the configuration
    /// selects
    pub fn from_settings(settings: Settings) -> Self {
        let backend = backend::for_settings(&settings);
        let dependencies = DecisionHubDependencies::from_settings(&settings);
        Self::new(settings, backend, dependencies)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Last observed status of a workflow, if this hub has seen it
    pub fn status(&self, workflow_id: &str) -> Option<TrackedStatus> {
        self.statuses.lock().unwrap().get(workflow_id).cloned()
    }

    fn track(&self, workflow_id: &str, status: WorkflowStatus) {
        self.statuses.lock().unwrap().insert(
            workflow_id.to_string(),
            TrackedStatus {
                status,
                updated_at: Utc::now(),
            },
        );
    }

    /// Execute the requested analysis workflow
    ///
    /// All selected stages are dispatched concurrently through the
    /// execution backend and joined before the aggregated result is built.
    /// A failed stage is recorded in `stage_failures` and never aborts its
    /// siblings; only the whole-workflow deadline (per-dispatch timeout
    /// plus a small grace period) elapsing marks the workflow `failed`, in
    /// which case outstanding invocations are cancelled and the results
    /// that did complete are kept. `scenarios` preserves the order the
    /// scenario requests were synthesized in, regardless of completion
    /// order.
    pub async fn run_workflow(&self, request: WorkflowRequest) -> Result<WorkflowResult> {
        let workflow_id = format!("workflow-{}", Uuid::new_v4());
        self.track(&workflow_id, WorkflowStatus::Accepted);

        info!(
            workflow_id = %workflow_id,
            strategy_id = %request.strategy_id,
            run_rules = request.run_rules,
            run_scenarios = request.run_scenarios,
            run_optimization = request.run_optimization,
            orchestration_backend = self.backend.name(),
            "workflow received"
        );

        let invocations = self.plan_stages(&request);
        let kinds: Vec<StageKind> = invocations.iter().map(|(_, req)| req.kind()).collect();

        self.track(&workflow_id, WorkflowStatus::Running);

        let timeout = self.settings.default_timeout();
        let deadline = timeout + DEADLINE_GRACE;

        let mut tasks = FuturesUnordered::new();
        for (index, (stage, stage_request)) in invocations.into_iter().enumerate() {
            let backend = Arc::clone(&self.backend);
            tasks.push(async move {
                let outcome = backend.dispatch(stage, stage_request, timeout).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<StageOutput, StageError>>> =
            kinds.iter().map(|_| None).collect();

        let deadline_hit = tokio::time::timeout(deadline, async {
            while let Some((index, outcome)) = tasks.next().await {
                match &outcome {
                    Ok(output) => info!(
                        workflow_id = %workflow_id,
                        stage = %output.kind(),
                        "stage completed"
                    ),
                    Err(err) => warn!(
                        workflow_id = %workflow_id,
                        stage = %err.stage(),
                        error = %err,
                        "stage failed"
                    ),
                }
                outcomes[index] = Some(outcome);
            }
        })
        .await
        .is_err();

        // Dropping the unfinished dispatch futures cancels them
        drop(tasks);

        let mut compliance = None;
        let mut scenarios = Vec::new();
        let mut optimization = None;
        let mut stage_failures = Vec::new();

        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(StageOutput::Rules(result))) => compliance = Some(result),
                Some(Ok(StageOutput::Scenario(result))) => scenarios.push(result),
                Some(Ok(StageOutput::Optimization(result))) => optimization = Some(result),
                Some(Err(err)) => stage_failures.push(StageFailure::from(&err)),
                None => stage_failures.push(StageFailure {
                    stage: kinds[index],
                    reason: "cancelled: workflow deadline elapsed".to_string(),
                    timed_out: true,
                }),
            }
        }

        let status = if deadline_hit {
            WorkflowStatus::Failed
        } else {
            WorkflowStatus::Completed
        };
        self.track(&workflow_id, status);

        info!(
            workflow_id = %workflow_id,
            status = %status,
            scenarios = scenarios.len(),
            stage_failures = stage_failures.len(),
            "workflow settled"
        );

        Ok(WorkflowResult {
            workflow_id,
            strategy_id: request.strategy_id,
            status,
            compliance,
            scenarios,
            optimization,
            stage_failures,
            metadata: request.metadata,
        })
    }

    /// Pair every selected stage with its synthesized request, in selector
    /// order (rules, scenarios, optimization)
    fn plan_stages(&self, request: &WorkflowRequest) -> Vec<(Arc<dyn Stage>, StageRequest)> {
        let mut invocations: Vec<(Arc<dyn Stage>, StageRequest)> = Vec::new();

        if request.run_rules {
            invocations.push((
                Arc::clone(&self.rules),
                StageRequest::Rules(build_compliance_request(request)),
            ));
        }
        if request.run_scenarios {
            for scenario_request in build_scenario_requests(request) {
                invocations.push((
                    Arc::clone(&self.scenario),
                    StageRequest::Scenario(scenario_request),
                ));
            }
        }
        if request.run_optimization {
            invocations.push((
                Arc::clone(&self.optimization),
                StageRequest::Optimization(build_optimization_request(request)),
            ));
        }

        invocations
    }
}

fn build_compliance_request(request: &WorkflowRequest) -> ComplianceCheckRequest {
    ComplianceCheckRequest {
        strategy_id: request.strategy_id.clone(),
        constraints: request.metadata_str_list("constraints"),
        policies: request.metadata_str_list("policies"),
        budget_limit: request.metadata_f64("budget_limit"),
        context: request.metadata.clone(),
    }
}

/// One scenario request per set named in `metadata.scenario_sets`; absent
/// that key, the single `scenario_set` override (or its default) yields
/// exactly one request
fn build_scenario_requests(request: &WorkflowRequest) -> Vec<ScenarioRunRequest> {
    let mut sets = request.metadata_str_list("scenario_sets");
    if sets.is_empty() {
        sets.push(
            request
                .metadata_str("scenario_set")
                .unwrap_or(DEFAULT_SCENARIO_SET)
                .to_string(),
        );
    }

    sets.into_iter()
        .map(|scenario_set| ScenarioRunRequest {
            strategy_id: request.strategy_id.clone(),
            scenario_set,
            runs: request.metadata_u32("runs").unwrap_or(DEFAULT_RUNS),
            horizon_years: request
                .metadata_u32("horizon_years")
                .unwrap_or(DEFAULT_HORIZON_YEARS),
            assumptions: request.metadata_object("assumptions"),
            parallelism: request
                .metadata_u32("parallelism")
                .map(|parallelism| parallelism as usize),
        })
        .collect()
}

fn build_optimization_request(request: &WorkflowRequest) -> OptimizationRequest {
    OptimizationRequest {
        strategy_id: Some(request.strategy_id.clone()),
        objective: request
            .metadata_str("objective")
            .unwrap_or(DEFAULT_OBJECTIVE)
            .to_string(),
        constraints: request.metadata_str_list("constraints"),
        parameters: request.metadata_object("optimization_parameters"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_requests_default_to_one_run() {
        let request = WorkflowRequest::new("S1");
        let scenario_requests = build_scenario_requests(&request);

        assert_eq!(scenario_requests.len(), 1);
        assert_eq!(scenario_requests[0].scenario_set, "default");
        assert_eq!(scenario_requests[0].runs, DEFAULT_RUNS);
        assert_eq!(scenario_requests[0].horizon_years, DEFAULT_HORIZON_YEARS);
    }

    #[test]
    fn test_scenario_sets_fan_out_in_order() {
        let mut request = WorkflowRequest::new("S1");
        request.metadata.insert(
            "scenario_sets".to_string(),
            serde_json::json!(["baseline", "stress-test", "expansion"]),
        );

        let scenario_requests = build_scenario_requests(&request);
        let sets: Vec<_> = scenario_requests
            .iter()
            .map(|r| r.scenario_set.as_str())
            .collect();

        assert_eq!(sets, vec!["baseline", "stress-test", "expansion"]);
    }

    #[test]
    fn test_compliance_request_carries_full_metadata_as_context() {
        let mut request = WorkflowRequest::new("S1");
        request
            .metadata
            .insert("budget_limit".to_string(), serde_json::json!(500.0));
        request
            .metadata
            .insert("policies".to_string(), serde_json::json!(["board_approval"]));

        let compliance = build_compliance_request(&request);

        assert_eq!(compliance.strategy_id, "S1");
        assert_eq!(compliance.budget_limit, Some(500.0));
        assert_eq!(compliance.policies, vec!["board_approval".to_string()]);
        assert_eq!(compliance.context.len(), request.metadata.len());
    }

    #[test]
    fn test_optimization_request_objective_override() {
        let mut request = WorkflowRequest::new("S1");
        request.metadata.insert(
            "objective".to_string(),
            serde_json::json!("financial_resilience"),
        );

        let optimization = build_optimization_request(&request);
        assert_eq!(optimization.objective, "financial_resilience");
        assert_eq!(optimization.strategy_id.as_deref(), Some("S1"));
    }
}
