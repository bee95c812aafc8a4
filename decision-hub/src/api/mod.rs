//! HTTP API layer
//!
//! Thin axum surface over the decision hub and the standalone stage
//! services; request validation happens here, before orchestration.

pub mod handlers;

use crate::config::Settings;
use crate::hub::{DecisionHub, DecisionHubDependencies};
use crate::stages::{OptimizationService, RulesEngineService, ScenarioSimulationService};
use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::info;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub hub: Arc<DecisionHub>,
    pub rules: Arc<RulesEngineService>,
    pub scenario: Arc<ScenarioSimulationService>,
    pub optimization: Arc<OptimizationService>,
}

impl AppState {
    /// Construct the hub and stage services once; the same service
    /// instances back both the hub's stages and the standalone endpoints
    pub fn from_settings(settings: Settings) -> Self {
        let rules = Arc::new(RulesEngineService::new());
        let scenario = Arc::new(ScenarioSimulationService::new(
            settings.max_parallel_scenarios,
        ));
        let optimization = Arc::new(OptimizationService::new());

        let backend = crate::backend::for_settings(&settings);
        let hub = Arc::new(DecisionHub::new(
            settings.clone(),
            backend,
            DecisionHubDependencies {
                rules: rules.clone(),
                scenario: scenario.clone(),
                optimization: optimization.clone(),
            },
        ));

        Self {
            settings,
            hub,
            rules,
            scenario,
            optimization,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/decision/workflows",
            post(handlers::run_workflow),
        )
        .route(
            "/api/v1/decision/workflows/:workflow_id/status",
            get(handlers::workflow_status),
        )
        .route("/api/v1/rules/checks", post(handlers::check_rules))
        .route("/api/v1/scenario/runs", post(handlers::run_scenario))
        .route(
            "/api/v1/optimization/jobs",
            post(handlers::run_optimization),
        )
        .with_state(state)
}

/// Bind and serve the API until the process is stopped
pub async fn serve(settings: Settings) -> Result<()> {
    let bind_addr = format!("{}:{}", settings.api_host, settings.api_port);
    let state = AppState::from_settings(settings);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!(
        addr = %bind_addr,
        backend = state.hub.backend_name(),
        "decision hub listening"
    );

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server terminated")
}
