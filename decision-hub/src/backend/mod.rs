//! Execution backend implementations
//!
//! The orchestrator only ever sees the [`ExecutionBackend`] trait; which
//! implementation it holds is decided here, once, from configuration.

mod in_memory;
mod remote;

pub use in_memory::InMemoryBackend;
pub use remote::{ComputeClusterBackend, StageEndpoints, TaskQueueBackend};

use crate::config::{OrchestrationBackend, Settings};
use decision_hub_sdk::ExecutionBackend;
use std::sync::Arc;

/// Build the backend selected by configuration
pub fn for_settings(settings: &Settings) -> Arc<dyn ExecutionBackend> {
    let endpoints = StageEndpoints::from_settings(settings);
    match settings.orchestration_backend {
        OrchestrationBackend::InMemory => {
            Arc::new(InMemoryBackend::new(settings.max_parallel_scenarios))
        }
        OrchestrationBackend::Celery => Arc::new(TaskQueueBackend::new(
            settings.max_parallel_scenarios,
            endpoints,
        )),
        OrchestrationBackend::Ray => Arc::new(ComputeClusterBackend::new(
            settings.max_parallel_scenarios,
            endpoints,
        )),
    }
}
