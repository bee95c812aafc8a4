//! Optimization service

use decision_hub_sdk::{
    async_trait, Metadata, OptimizationRequest, OptimizationResult, Recommendation, Stage,
    StageError, StageKind, StageOutput, StageRequest,
};
use tracing::info;

/// Generates optimized strategic initiatives subject to constraints
///
/// Recommendations come from objective-keyed templates; a real solver can
/// replace this service behind the same request/result contract.
#[derive(Debug, Clone, Default)]
pub struct OptimizationService;

impl OptimizationService {
    pub fn new() -> Self {
        Self
    }

    /// Produce ranked recommendations for one optimization request
    pub async fn optimize(&self, request: &OptimizationRequest) -> OptimizationResult {
        info!(
            objective = %request.objective,
            strategy_id = request.strategy_id.as_deref().unwrap_or("-"),
            constraint_count = request.constraints.len(),
            "optimization job accepted"
        );

        let mut recommendations = recommendations_for(&request.objective);
        for constraint in &request.constraints {
            recommendations.push(Recommendation {
                title: format!("Review constraint '{}'", constraint),
                detail: format!(
                    "Quantify how much objective headroom relaxing '{}' would buy before \
                     committing to it as a hard constraint",
                    constraint
                ),
            });
        }

        let mut metadata = Metadata::new();
        if let Some(strategy_id) = &request.strategy_id {
            metadata.insert("strategy_id".to_string(), serde_json::json!(strategy_id));
        }
        metadata.insert(
            "constraint_count".to_string(),
            serde_json::json!(request.constraints.len()),
        );
        if !request.parameters.is_empty() {
            metadata.insert(
                "parameters".to_string(),
                serde_json::json!(request.parameters),
            );
        }

        OptimizationResult {
            objective: request.objective.clone(),
            recommendations,
            metadata,
        }
    }
}

fn recommendations_for(objective: &str) -> Vec<Recommendation> {
    match objective {
        "enrollment_growth" => vec![
            Recommendation {
                title: "Expand highest-yield recruitment channels".to_string(),
                detail: "Shift outreach budget toward the channels with the best \
                         applicant-to-enrollment conversion in the trailing two cycles"
                    .to_string(),
            },
            Recommendation {
                title: "Stage capacity ahead of demand".to_string(),
                detail: "Sequence program capacity additions one cycle ahead of projected \
                         enrollment so growth is not supply-constrained"
                    .to_string(),
            },
        ],
        "financial_resilience" => vec![
            Recommendation {
                title: "Diversify revenue concentration".to_string(),
                detail: "Reduce dependence on the single largest revenue stream below the \
                         resilience threshold before funding new initiatives"
                    .to_string(),
            },
            Recommendation {
                title: "Build contingency reserves".to_string(),
                detail: "Direct surplus toward reserves until the stress-scenario runway \
                         target is met"
                    .to_string(),
            },
        ],
        other => vec![Recommendation {
            title: format!("Define measurable targets for '{}'", other),
            detail: "Custom objectives need explicit KPIs before the solver can rank \
                     initiatives against them"
                .to_string(),
        }],
    }
}

#[async_trait]
impl Stage for OptimizationService {
    fn kind(&self) -> StageKind {
        StageKind::Optimization
    }

    async fn execute(&self, request: StageRequest) -> Result<StageOutput, StageError> {
        match request {
            StageRequest::Optimization(request) => {
                Ok(StageOutput::Optimization(self.optimize(&request).await))
            }
            other => Err(StageError::Mismatch {
                stage: StageKind::Optimization,
                received: other.kind(),
            }),
        }
    }
}
