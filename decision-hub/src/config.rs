//! Service configuration loaded from environment variables
//!
//! Every knob is read from an `ANALYSIS_`-prefixed variable (a `.env` file
//! is honored when the binary loads one). Settings are constructed once at
//! startup and passed by handle into the orchestrator and backends; nothing
//! here is a process-wide singleton.

use anyhow::{bail, Context, Result};
use decision_hub_sdk::StageKind;
use std::str::FromStr;
use std::time::Duration;

/// Prefix for all service environment variables
pub const ENV_PREFIX: &str = "ANALYSIS_";

/// Backend used to queue and orchestrate background workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestrationBackend {
    InMemory,
    Celery,
    Ray,
}

impl OrchestrationBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestrationBackend::InMemory => "in-memory",
            OrchestrationBackend::Celery => "celery",
            OrchestrationBackend::Ray => "ray",
        }
    }
}

impl Default for OrchestrationBackend {
    fn default() -> Self {
        OrchestrationBackend::InMemory
    }
}

impl FromStr for OrchestrationBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in-memory" | "in_memory" => Ok(OrchestrationBackend::InMemory),
            "celery" => Ok(OrchestrationBackend::Celery),
            "ray" => Ok(OrchestrationBackend::Ray),
            other => Err(format!("unknown orchestration backend: {}", other)),
        }
    }
}

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_title: String,
    pub api_version: String,

    /// Maximum number of stage invocations to execute concurrently
    pub max_parallel_scenarios: usize,
    /// Default timeout for long-running analysis tasks
    pub default_timeout_seconds: u64,
    /// Backend used to run stage invocations
    pub orchestration_backend: OrchestrationBackend,

    /// Endpoint for a dedicated rules engine, if external
    pub rules_engine_url: Option<String>,
    /// Endpoint for an external scenario simulation cluster
    pub scenario_runner_url: Option<String>,
    /// Endpoint for an external optimization solver
    pub optimization_engine_url: Option<String>,

    pub api_host: String,
    pub api_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_title: "Strategic Analysis API".to_string(),
            api_version: env!("CARGO_PKG_VERSION").to_string(),
            max_parallel_scenarios: 4,
            default_timeout_seconds: 300,
            orchestration_backend: OrchestrationBackend::InMemory,
            rules_engine_url: None,
            scenario_runner_url: None,
            optimization_engine_url: None,
            api_host: "127.0.0.1".to_string(),
            api_port: 8080,
        }
    }
}

impl Settings {
    /// Load settings from `ANALYSIS_*` environment variables, falling back
    /// to defaults for anything unset
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(value) = read_var("MAX_PARALLEL_SCENARIOS") {
            settings.max_parallel_scenarios = value
                .parse()
                .with_context(|| format!("invalid {}MAX_PARALLEL_SCENARIOS", ENV_PREFIX))?;
        }
        if let Some(value) = read_var("DEFAULT_TIMEOUT_SECONDS") {
            settings.default_timeout_seconds = value
                .parse()
                .with_context(|| format!("invalid {}DEFAULT_TIMEOUT_SECONDS", ENV_PREFIX))?;
        }
        if let Some(value) = read_var("ORCHESTRATION_BACKEND") {
            settings.orchestration_backend = value
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid {}ORCHESTRATION_BACKEND", ENV_PREFIX))?;
        }

        settings.rules_engine_url = read_var("RULES_ENGINE_URL");
        settings.scenario_runner_url = read_var("SCENARIO_RUNNER_URL");
        settings.optimization_engine_url = read_var("OPTIMIZATION_ENGINE_URL");

        if let Some(value) = read_var("API_HOST") {
            settings.api_host = value;
        }
        if let Some(value) = read_var("API_PORT") {
            settings.api_port = value
                .parse()
                .with_context(|| format!("invalid {}API_PORT", ENV_PREFIX))?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Enforce the configuration bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_scenarios < 1 {
            bail!("max_parallel_scenarios must be at least 1");
        }
        if self.default_timeout_seconds < 30 {
            bail!("default_timeout_seconds must be at least 30");
        }
        Ok(())
    }

    /// Per-dispatch timeout as a [`Duration`]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_seconds)
    }

    /// Remote worker endpoint for a stage, when one is configured
    pub fn endpoint_for(&self, kind: StageKind) -> Option<&str> {
        match kind {
            StageKind::Rules => self.rules_engine_url.as_deref(),
            StageKind::Scenario => self.scenario_runner_url.as_deref(),
            StageKind::Optimization => self.optimization_engine_url.as_deref(),
        }
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name))
        .ok()
        .filter(|value| !value.trim().is_empty())
}
