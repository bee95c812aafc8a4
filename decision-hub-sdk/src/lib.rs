//! Shared types and capability traits for decision-hub workflows
//!
//! This crate defines the wire-level data model (workflow and stage
//! request/result pairs), the uniform [`Stage`] capability implemented by
//! every analysis stage, and the [`ExecutionBackend`] abstraction that
//! decides *how* a stage invocation actually runs. Orchestration logic
//! lives in the `decision-hub` crate; everything here is plain data and
//! contracts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// Re-export async trait for implementors
pub use async_trait::async_trait;

/// Free-form key-value bag carried on requests and results
pub type Metadata = HashMap<String, serde_json::Value>;

// ============================================================================
// Stage defaults
// ============================================================================
// Documented defaults for metadata-driven stage overrides. A missing (or
// wrongly typed) metadata key always falls back to these, never fails the
// stage.

/// Scenario bundle executed when the request names none
pub const DEFAULT_SCENARIO_SET: &str = "default";
/// Monte Carlo runs per scenario when the request names no count
pub const DEFAULT_RUNS: u32 = 100;
/// Forecast horizon in years when the request names none
pub const DEFAULT_HORIZON_YEARS: u32 = 5;
/// Optimization objective when the request names none
pub const DEFAULT_OBJECTIVE: &str = "enrollment_growth";

/// Bounds accepted for scenario run counts
pub const RUNS_RANGE: std::ops::RangeInclusive<u32> = 1..=10_000;
/// Bounds accepted for the forecast horizon
pub const HORIZON_YEARS_RANGE: std::ops::RangeInclusive<u32> = 1..=30;

// ============================================================================
// Workflow data model
// ============================================================================

/// Orchestration payload handled by the decision hub
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    /// Candidate strategy identifier
    pub strategy_id: String,
    /// Whether to trigger compliance validation
    #[serde(default = "default_true")]
    pub run_rules: bool,
    /// Whether to schedule scenario simulations
    #[serde(default = "default_true")]
    pub run_scenarios: bool,
    /// Whether to run optimization loops
    #[serde(default)]
    pub run_optimization: bool,
    /// Additional context from upstream services, also consulted for
    /// per-stage overrides (`scenario_set`, `runs`, `objective`, ...)
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_true() -> bool {
    true
}

impl WorkflowRequest {
    /// Build a request for a strategy with the default selectors
    /// (rules and scenarios on, optimization off)
    pub fn new(strategy_id: impl Into<String>) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            run_rules: true,
            run_scenarios: true,
            run_optimization: false,
            metadata: Metadata::new(),
        }
    }

    /// Reject malformed requests before orchestration begins
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.strategy_id.trim().is_empty() {
            return Err(ValidationError::new("strategy_id", "must not be empty"));
        }
        if let Some(runs) = self.metadata.get("runs").and_then(|v| v.as_u64()) {
            let runs = u32::try_from(runs).unwrap_or(u32::MAX);
            if !RUNS_RANGE.contains(&runs) {
                return Err(ValidationError::new("runs", "must be between 1 and 10000"));
            }
        }
        if let Some(horizon) = self.metadata.get("horizon_years").and_then(|v| v.as_u64()) {
            let horizon = u32::try_from(horizon).unwrap_or(u32::MAX);
            if !HORIZON_YEARS_RANGE.contains(&horizon) {
                return Err(ValidationError::new(
                    "horizon_years",
                    "must be between 1 and 30",
                ));
            }
        }
        if let Some(limit) = self.metadata.get("budget_limit").and_then(|v| v.as_f64()) {
            if limit < 0.0 {
                return Err(ValidationError::new("budget_limit", "must not be negative"));
            }
        }
        Ok(())
    }

    /// String-valued metadata override, or `None` if missing or wrongly typed
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// Integer-valued metadata override, or `None` if missing, wrongly
    /// typed, or out of `u32` range
    pub fn metadata_u32(&self, key: &str) -> Option<u32> {
        self.metadata
            .get(key)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Float-valued metadata override
    pub fn metadata_f64(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).and_then(|v| v.as_f64())
    }

    /// String-array metadata override; non-string elements are skipped
    pub fn metadata_str_list(&self, key: &str) -> Vec<String> {
        self.metadata
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Object-valued metadata override, empty when missing or wrongly typed
    pub fn metadata_object(&self, key: &str) -> Metadata {
        self.metadata
            .get(key)
            .and_then(|v| v.as_object())
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

/// Status codes for workflow execution
///
/// `accepted` → `running` → `completed` | `failed`; the last two are
/// terminal. A synchronous orchestrator collapses the transitions within
/// one call, but each one is still recorded so a polled implementation can
/// observe them independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Accepted,
    Running,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Accepted => "accepted",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate response returned by the decision hub
///
/// Invariant: a stage result field is populated iff that stage's selector
/// was true in the request and the stage did not fail; a failed selected
/// stage is recorded in `stage_failures` instead of being silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub strategy_id: String,
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceCheckResult>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioRunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationResult>,
    #[serde(default)]
    pub stage_failures: Vec<StageFailure>,
    #[serde(default)]
    pub metadata: Metadata,
}

// ============================================================================
// Stage request/result pairs
// ============================================================================

/// Request payload for the rules and compliance engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCheckRequest {
    /// Identifier for the strategy being validated
    pub strategy_id: String,
    /// Constraints to evaluate
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Policy IDs that must be satisfied
    #[serde(default)]
    pub policies: Vec<String>,
    /// Optional budget ceiling to enforce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_limit: Option<f64>,
    /// Arbitrary contextual metadata
    #[serde(default)]
    pub context: Metadata,
}

/// Result payload from the rules engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCheckResult {
    pub strategy_id: String,
    pub passed: bool,
    #[serde(default)]
    pub violations: Vec<String>,
    #[serde(default)]
    pub details: Metadata,
}

/// Payload describing a scenario simulation job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRunRequest {
    /// Identifier for the candidate strategy
    pub strategy_id: String,
    /// Named scenario bundle to execute
    pub scenario_set: String,
    /// Number of Monte Carlo runs to execute
    #[serde(default = "default_runs")]
    pub runs: u32,
    /// Forecast horizon for the simulation
    #[serde(default = "default_horizon_years")]
    pub horizon_years: u32,
    /// Adjustable assumptions for the run
    #[serde(default)]
    pub assumptions: Metadata,
    /// Override for the default parallel batch count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,
}

fn default_runs() -> u32 {
    DEFAULT_RUNS
}

fn default_horizon_years() -> u32 {
    DEFAULT_HORIZON_YEARS
}

impl ScenarioRunRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.strategy_id.trim().is_empty() {
            return Err(ValidationError::new("strategy_id", "must not be empty"));
        }
        if !RUNS_RANGE.contains(&self.runs) {
            return Err(ValidationError::new("runs", "must be between 1 and 10000"));
        }
        if !HORIZON_YEARS_RANGE.contains(&self.horizon_years) {
            return Err(ValidationError::new(
                "horizon_years",
                "must be between 1 and 30",
            ));
        }
        Ok(())
    }
}

/// Result payload from scenario simulations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRunResult {
    pub strategy_id: String,
    pub scenario_set: String,
    /// Numeric KPIs produced by the simulation
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Input payload for optimization workloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    /// Existing strategy to refine, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    /// Optimization objective to maximize or minimize
    #[serde(default = "default_objective")]
    pub objective: String,
    /// Soft or hard constraints to honor
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Objective-specific parameters
    #[serde(default)]
    pub parameters: Metadata,
}

fn default_objective() -> String {
    DEFAULT_OBJECTIVE.to_string()
}

/// Single ranked recommendation from the optimization engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub detail: String,
}

/// Result payload from the optimization engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub objective: String,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub metadata: Metadata,
}

// ============================================================================
// Uniform stage capability
// ============================================================================

/// The three stage kinds the orchestrator can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Rules,
    Scenario,
    Optimization,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Rules => "rules",
            StageKind::Scenario => "scenario",
            StageKind::Optimization => "optimization",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed request for one stage invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageRequest {
    Rules(ComplianceCheckRequest),
    Scenario(ScenarioRunRequest),
    Optimization(OptimizationRequest),
}

impl StageRequest {
    pub fn kind(&self) -> StageKind {
        match self {
            StageRequest::Rules(_) => StageKind::Rules,
            StageRequest::Scenario(_) => StageKind::Scenario,
            StageRequest::Optimization(_) => StageKind::Optimization,
        }
    }
}

/// The typed result of one stage invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageOutput {
    Rules(ComplianceCheckResult),
    Scenario(ScenarioRunResult),
    Optimization(OptimizationResult),
}

impl StageOutput {
    pub fn kind(&self) -> StageKind {
        match self {
            StageOutput::Rules(_) => StageKind::Rules,
            StageOutput::Scenario(_) => StageKind::Scenario,
            StageOutput::Optimization(_) => StageKind::Optimization,
        }
    }

    pub fn into_rules(self) -> Option<ComplianceCheckResult> {
        match self {
            StageOutput::Rules(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_scenario(self) -> Option<ScenarioRunResult> {
        match self {
            StageOutput::Scenario(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_optimization(self) -> Option<OptimizationResult> {
        match self {
            StageOutput::Optimization(result) => Some(result),
            _ => None,
        }
    }
}

/// One independent analysis step: accepts a typed request, returns a typed
/// result, may fail, may be cancelled (by dropping the returned future).
///
/// Implementations must be stateless across invocations so the orchestrator
/// can dispatch them concurrently, including for the same strategy.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Which request variant this stage accepts
    fn kind(&self) -> StageKind;

    /// Run the stage to completion
    async fn execute(&self, request: StageRequest) -> Result<StageOutput, StageError>;
}

// ============================================================================
// Execution backend abstraction
// ============================================================================

/// Pluggable mechanism that actually runs a stage invocation
///
/// Selected by configuration at startup; the orchestrator's fan-out logic
/// never branches on which implementation it holds. Implementations must
/// bound concurrent work by their configured ceiling, queueing (not
/// failing) requests beyond it, and must surface a timeout as
/// [`StageError::Timeout`] so the caller can tell which stage timed out.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Configuration name of this backend (`in-memory`, `celery`, `ray`)
    fn name(&self) -> &str;

    /// Execute one unit of work, bounded by `timeout`
    async fn dispatch(
        &self,
        stage: Arc<dyn Stage>,
        request: StageRequest,
        timeout: Duration,
    ) -> Result<StageOutput, StageError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Request rejected before orchestration began
#[derive(Debug, Clone, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Failure of a single stage invocation
///
/// Timeouts and dispatch failures are distinct variants so the orchestrator
/// can record *which* stage timed out versus which could not be reached.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{stage} stage timed out after {timeout_seconds}s")]
    Timeout {
        stage: StageKind,
        timeout_seconds: u64,
    },

    #[error("failed to dispatch {stage} stage: {reason}")]
    Dispatch { stage: StageKind, reason: String },

    #[error("{stage} stage execution failed: {reason}")]
    Execution { stage: StageKind, reason: String },

    #[error("{stage} stage received a {received} request")]
    Mismatch { stage: StageKind, received: StageKind },
}

impl StageError {
    /// The stage this error belongs to
    pub fn stage(&self) -> StageKind {
        match self {
            StageError::Timeout { stage, .. }
            | StageError::Dispatch { stage, .. }
            | StageError::Execution { stage, .. }
            | StageError::Mismatch { stage, .. } => *stage,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StageError::Timeout { .. })
    }
}

/// Per-stage failure marker carried on the aggregated workflow result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: StageKind,
    pub reason: String,
    pub timed_out: bool,
}

impl From<&StageError> for StageFailure {
    fn from(error: &StageError) -> Self {
        Self {
            stage: error.stage(),
            reason: error.to_string(),
            timed_out: error.is_timeout(),
        }
    }
}
