//! Rules and compliance engine service

use decision_hub_sdk::{
    async_trait, ComplianceCheckRequest, ComplianceCheckResult, Stage, StageError, StageKind,
    StageOutput, StageRequest,
};
use tracing::info;

/// Evaluates strategies against compliance and policy constraints
///
/// The evaluation is a placeholder engine: each named policy or constraint
/// is looked up in the request context and treated as violated when the
/// context flags it `false`, and an optional budget ceiling is checked
/// against the `projected_spend` context value. A dedicated rules engine
/// can replace this without changing the request/result contract.
#[derive(Debug, Clone, Default)]
pub struct RulesEngineService;

impl RulesEngineService {
    pub fn new() -> Self {
        Self
    }

    /// Run a compliance check for one strategy
    pub async fn evaluate(&self, request: &ComplianceCheckRequest) -> ComplianceCheckResult {
        info!(
            strategy_id = %request.strategy_id,
            constraints = request.constraints.len(),
            policies = request.policies.len(),
            "rules check accepted"
        );

        let mut violations = Vec::new();

        for policy in &request.policies {
            if request.context.get(policy).and_then(|v| v.as_bool()) == Some(false) {
                violations.push(format!("policy:{}", policy));
            }
        }

        for constraint in &request.constraints {
            if request.context.get(constraint).and_then(|v| v.as_bool()) == Some(false) {
                violations.push(format!("constraint:{}", constraint));
            }
        }

        if let Some(limit) = request.budget_limit {
            let projected = request
                .context
                .get("projected_spend")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            if projected > limit {
                violations.push("budget_limit_exceeded".to_string());
            }
        }

        let mut details = decision_hub_sdk::Metadata::new();
        details.insert(
            "policies_evaluated".to_string(),
            serde_json::json!(request.policies.len()),
        );
        details.insert(
            "constraints_evaluated".to_string(),
            serde_json::json!(request.constraints.len()),
        );
        if let Some(limit) = request.budget_limit {
            details.insert("budget_limit".to_string(), serde_json::json!(limit));
        }

        ComplianceCheckResult {
            strategy_id: request.strategy_id.clone(),
            passed: violations.is_empty(),
            violations,
            details,
        }
    }
}

#[async_trait]
impl Stage for RulesEngineService {
    fn kind(&self) -> StageKind {
        StageKind::Rules
    }

    async fn execute(&self, request: StageRequest) -> Result<StageOutput, StageError> {
        match request {
            StageRequest::Rules(request) => Ok(StageOutput::Rules(self.evaluate(&request).await)),
            other => Err(StageError::Mismatch {
                stage: StageKind::Rules,
                received: other.kind(),
            }),
        }
    }
}
