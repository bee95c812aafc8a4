//! Request handlers for the API endpoints

use super::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use decision_hub_sdk::{
    ComplianceCheckRequest, ComplianceCheckResult, OptimizationRequest, OptimizationResult,
    ScenarioRunRequest, ScenarioRunResult, ValidationError, WorkflowRequest, WorkflowResult,
    WorkflowStatus,
};
use serde::Serialize;

/// Error payload returned by every endpoint
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: String,
    version: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.settings.api_title.clone(),
        version: state.settings.api_version.clone(),
    })
}

pub async fn run_workflow(
    State(state): State<AppState>,
    Json(request): Json<WorkflowRequest>,
) -> Result<(StatusCode, Json<WorkflowResult>), ApiError> {
    request.validate()?;

    let result = state
        .hub
        .run_workflow(request)
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(result)))
}

#[derive(Serialize)]
pub struct WorkflowStatusResponse {
    workflow_id: String,
    status: WorkflowStatus,
    updated_at: DateTime<Utc>,
}

pub async fn workflow_status(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<WorkflowStatusResponse>, ApiError> {
    let tracked = state
        .hub
        .status(&workflow_id)
        .ok_or_else(|| ApiError::not_found(format!("unknown workflow '{}'", workflow_id)))?;

    Ok(Json(WorkflowStatusResponse {
        workflow_id,
        status: tracked.status,
        updated_at: tracked.updated_at,
    }))
}

pub async fn check_rules(
    State(state): State<AppState>,
    Json(request): Json<ComplianceCheckRequest>,
) -> Result<Json<ComplianceCheckResult>, ApiError> {
    if request.strategy_id.trim().is_empty() {
        return Err(ValidationError::new("strategy_id", "must not be empty").into());
    }
    if matches!(request.budget_limit, Some(limit) if limit < 0.0) {
        return Err(ValidationError::new("budget_limit", "must not be negative").into());
    }

    Ok(Json(state.rules.evaluate(&request).await))
}

pub async fn run_scenario(
    State(state): State<AppState>,
    Json(request): Json<ScenarioRunRequest>,
) -> Result<(StatusCode, Json<ScenarioRunResult>), ApiError> {
    request.validate()?;

    let result = state
        .scenario
        .launch(&request)
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(result)))
}

pub async fn run_optimization(
    State(state): State<AppState>,
    Json(request): Json<OptimizationRequest>,
) -> (StatusCode, Json<OptimizationResult>) {
    let result = state.optimization.optimize(&request).await;
    (StatusCode::ACCEPTED, Json(result))
}
