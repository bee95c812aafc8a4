//! Common test utilities for hub integration tests

use decision_hub::backend::InMemoryBackend;
use decision_hub::config::Settings;
use decision_hub::hub::{DecisionHub, DecisionHubDependencies};
use decision_hub_sdk::{
    async_trait, ComplianceCheckResult, Metadata, OptimizationResult, ScenarioRunResult, Stage,
    StageError, StageKind, StageOutput, StageRequest, WorkflowRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Hub with the real stage services and the in-memory backend
pub fn default_hub() -> DecisionHub {
    DecisionHub::from_settings(Settings::default())
}

/// Hub over injected stage services, with a short per-dispatch timeout so
/// timeout paths finish quickly
pub fn hub_with_stages(
    timeout_seconds: u64,
    max_parallel: usize,
    dependencies: DecisionHubDependencies,
) -> DecisionHub {
    let settings = Settings {
        default_timeout_seconds: timeout_seconds,
        max_parallel_scenarios: max_parallel,
        ..Default::default()
    };
    let backend = Arc::new(InMemoryBackend::new(max_parallel));
    DecisionHub::new(settings, backend, dependencies)
}

/// The real stage services, for mixing with fakes
pub fn real_dependencies() -> DecisionHubDependencies {
    DecisionHubDependencies::from_settings(&Settings::default())
}

/// Request with every selector off
pub fn empty_request(strategy_id: &str) -> WorkflowRequest {
    let mut request = WorkflowRequest::new(strategy_id);
    request.run_rules = false;
    request.run_scenarios = false;
    request.run_optimization = false;
    request
}

/// Stage that always fails with an execution error
pub struct FailingStage {
    pub kind: StageKind,
}

#[async_trait]
impl Stage for FailingStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn execute(&self, _request: StageRequest) -> Result<StageOutput, StageError> {
        Err(StageError::Execution {
            stage: self.kind,
            reason: "engine rejected the request".to_string(),
        })
    }
}

/// Stage that sleeps before answering successfully
pub struct SlowStage {
    pub kind: StageKind,
    pub delay: Duration,
}

#[async_trait]
impl Stage for SlowStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn execute(&self, request: StageRequest) -> Result<StageOutput, StageError> {
        tokio::time::sleep(self.delay).await;

        Ok(match request {
            StageRequest::Rules(req) => StageOutput::Rules(ComplianceCheckResult {
                strategy_id: req.strategy_id,
                passed: true,
                violations: Vec::new(),
                details: Metadata::new(),
            }),
            StageRequest::Scenario(req) => StageOutput::Scenario(ScenarioRunResult {
                strategy_id: req.strategy_id,
                scenario_set: req.scenario_set,
                metrics: HashMap::new(),
                summary: None,
            }),
            StageRequest::Optimization(req) => StageOutput::Optimization(OptimizationResult {
                objective: req.objective,
                recommendations: Vec::new(),
                metadata: Metadata::new(),
            }),
        })
    }
}
