//! Analysis stage services
//!
//! Each service is a stateless request→result transformation implementing
//! the uniform [`Stage`](decision_hub_sdk::Stage) capability. The internal
//! evaluation logic is a deterministic placeholder engine; each service can
//! be replaced by a real engine independently without touching the
//! orchestrator.

mod optimization;
mod rules;
mod scenario;

pub use optimization::OptimizationService;
pub use rules::RulesEngineService;
pub use scenario::ScenarioSimulationService;
