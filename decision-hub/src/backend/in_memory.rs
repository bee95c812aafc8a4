//! Synchronous in-process execution backend

use decision_hub_sdk::{
    async_trait, ExecutionBackend, Stage, StageError, StageOutput, StageRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// Runs stage invocations inline on the local runtime
///
/// Admission is bounded by a semaphore sized to the parallelism ceiling;
/// dispatches beyond the ceiling queue on the semaphore rather than fail.
/// Each execution is bounded by the caller's timeout, and cancelling a
/// dispatch (dropping its future) cancels the stage with it.
pub struct InMemoryBackend {
    semaphore: Arc<Semaphore>,
}

impl InMemoryBackend {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }
}

#[async_trait]
impl ExecutionBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn dispatch(
        &self,
        stage: Arc<dyn Stage>,
        request: StageRequest,
        timeout: Duration,
    ) -> Result<StageOutput, StageError> {
        let kind = request.kind();

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| StageError::Dispatch {
                stage: kind,
                reason: "execution backend is shutting down".to_string(),
            })?;

        debug!(stage = %kind, timeout_seconds = timeout.as_secs(), "executing stage inline");

        match tokio::time::timeout(timeout, stage.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(StageError::Timeout {
                stage: kind,
                timeout_seconds: timeout.as_secs(),
            }),
        }
    }
}
