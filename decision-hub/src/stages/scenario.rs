//! Scenario simulation service

use crate::concurrency::execute_batches;
use decision_hub_sdk::{
    async_trait, ScenarioRunRequest, ScenarioRunResult, Stage, StageError, StageKind, StageOutput,
    StageRequest,
};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Monte Carlo runs executed per internal batch
const RUNS_PER_BATCH: u32 = 25;

/// Coordinates Monte Carlo scenario simulations
///
/// Runs are split into batches that fan out concurrently, bounded by the
/// service's parallelism ceiling (or the request's `parallelism` override).
/// The simulation itself is a deterministic placeholder: KPI samples are
/// derived from a seeded generator over the request parameters, so
/// identical requests produce identical metrics. Swap in an external
/// simulation engine behind the same request/result contract.
#[derive(Debug, Clone)]
pub struct ScenarioSimulationService {
    max_parallel: usize,
}

/// One batch of simulation runs, self-contained so batches can move into
/// concurrently executing tasks
#[derive(Debug, Clone)]
struct ScenarioBatch {
    index: u64,
    strategy_id: String,
    scenario_set: String,
    runs: u32,
    horizon_years: u32,
    growth_rate: f64,
    volatility: f64,
    base_value: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct BatchMetrics {
    index: u64,
    runs: u32,
    npv_total: f64,
    npv_min: f64,
    npv_max: f64,
    utilization_total: f64,
}

impl ScenarioSimulationService {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
        }
    }

    /// Launch one scenario run and aggregate its batch metrics
    pub async fn launch(
        &self,
        request: &ScenarioRunRequest,
    ) -> Result<ScenarioRunResult, StageError> {
        let run_id = format!("scenario-{}", Uuid::new_v4());
        let parallelism = request.parallelism.unwrap_or(self.max_parallel).max(1);

        info!(
            run_id = %run_id,
            strategy_id = %request.strategy_id,
            scenario_set = %request.scenario_set,
            runs = request.runs,
            horizon_years = request.horizon_years,
            parallelism,
            "scenario run launched"
        );

        let batches = build_batches(request);
        let mut batch_results = execute_batches(batches, parallelism, |batch, ctx| async move {
            debug!(
                batch = ctx.batch_number,
                total = ctx.total_batches,
                runs = batch.runs,
                "simulating batch"
            );
            Ok(simulate_batch(&batch))
        })
        .await
        .map_err(|err| StageError::Execution {
            stage: StageKind::Scenario,
            reason: err.to_string(),
        })?;

        // Batches complete in arbitrary order; aggregate in batch order so
        // the float sums are reproducible for identical requests
        batch_results.sort_by_key(|batch| batch.index);

        Ok(aggregate(request, parallelism, &batch_results))
    }
}

#[async_trait]
impl Stage for ScenarioSimulationService {
    fn kind(&self) -> StageKind {
        StageKind::Scenario
    }

    async fn execute(&self, request: StageRequest) -> Result<StageOutput, StageError> {
        match request {
            StageRequest::Scenario(request) => {
                Ok(StageOutput::Scenario(self.launch(&request).await?))
            }
            other => Err(StageError::Mismatch {
                stage: StageKind::Scenario,
                received: other.kind(),
            }),
        }
    }
}

fn build_batches(request: &ScenarioRunRequest) -> Vec<ScenarioBatch> {
    let growth_rate = assumption(request, "growth_rate", 0.02);
    let volatility = assumption(request, "volatility", 0.10);
    let base_value = assumption(request, "base_value", 1_000_000.0);

    let mut batches = Vec::new();
    let mut remaining = request.runs;
    let mut index = 0u64;
    while remaining > 0 {
        let runs = remaining.min(RUNS_PER_BATCH);
        batches.push(ScenarioBatch {
            index,
            strategy_id: request.strategy_id.clone(),
            scenario_set: request.scenario_set.clone(),
            runs,
            horizon_years: request.horizon_years,
            growth_rate,
            volatility,
            base_value,
        });
        remaining -= runs;
        index += 1;
    }
    batches
}

fn assumption(request: &ScenarioRunRequest, key: &str, default: f64) -> f64 {
    request
        .assumptions
        .get(key)
        .and_then(|v| v.as_f64())
        .unwrap_or(default)
}

/// Deterministic pseudo-simulation of one batch
fn simulate_batch(batch: &ScenarioBatch) -> BatchMetrics {
    let mut state = fnv1a(batch.strategy_id.as_bytes())
        ^ fnv1a(batch.scenario_set.as_bytes()).rotate_left(17)
        ^ batch.index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    // xorshift state must never be zero
    if state == 0 {
        state = 0x1234_5678_9ABC_DEF0;
    }

    let horizon_factor = (1.0 + batch.growth_rate).powi(batch.horizon_years as i32);

    let mut metrics = BatchMetrics {
        index: batch.index,
        runs: batch.runs,
        npv_min: f64::INFINITY,
        npv_max: f64::NEG_INFINITY,
        ..Default::default()
    };

    for _ in 0..batch.runs {
        let shock = next_unit(&mut state);
        let npv = batch.base_value * horizon_factor * (1.0 + batch.volatility * (2.0 * shock - 1.0));
        metrics.npv_total += npv;
        metrics.npv_min = metrics.npv_min.min(npv);
        metrics.npv_max = metrics.npv_max.max(npv);
        metrics.utilization_total += 0.5 + 0.45 * next_unit(&mut state);
    }

    metrics
}

fn aggregate(
    request: &ScenarioRunRequest,
    parallelism: usize,
    batches: &[BatchMetrics],
) -> ScenarioRunResult {
    let runs: u32 = batches.iter().map(|b| b.runs).sum();

    let mut metrics = HashMap::new();
    metrics.insert("runs".to_string(), f64::from(runs));
    metrics.insert(
        "horizon_years".to_string(),
        f64::from(request.horizon_years),
    );
    metrics.insert("parallelism".to_string(), parallelism as f64);

    if runs > 0 {
        let npv_total: f64 = batches.iter().map(|b| b.npv_total).sum();
        let utilization_total: f64 = batches.iter().map(|b| b.utilization_total).sum();
        let npv_min = batches.iter().map(|b| b.npv_min).fold(f64::INFINITY, f64::min);
        let npv_max = batches
            .iter()
            .map(|b| b.npv_max)
            .fold(f64::NEG_INFINITY, f64::max);

        metrics.insert("expected_npv".to_string(), npv_total / f64::from(runs));
        metrics.insert("npv_min".to_string(), npv_min);
        metrics.insert("npv_max".to_string(), npv_max);
        metrics.insert(
            "resource_utilization".to_string(),
            utilization_total / f64::from(runs),
        );
    } else {
        // runs=0 is rejected upstream; still return a well-formed result
        metrics.insert("expected_npv".to_string(), 0.0);
        metrics.insert("resource_utilization".to_string(), 0.0);
    }

    ScenarioRunResult {
        strategy_id: request.strategy_id.clone(),
        scenario_set: request.scenario_set.clone(),
        metrics,
        summary: Some(format!(
            "Simulated {} runs of scenario set '{}' over a {}-year horizon",
            runs, request.scenario_set, request.horizon_years
        )),
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xCBF2_9CE4_8422_2325u64;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100_0000_01B3);
    }
    hash
}

fn next_unit(state: &mut u64) -> f64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    (x >> 11) as f64 / (1u64 << 53) as f64
}
