//! Remote execution backends (task queue and compute cluster)
//!
//! Both strategies share one wire contract: the serialized [`StageRequest`]
//! is POSTed to the worker endpoint configured for that stage kind, and the
//! response body is the worker's [`StageOutput`]. Whether a task-queue
//! ingress or a compute-cluster gateway sits behind the endpoint is the
//! remote side's concern.

use crate::config::Settings;
use decision_hub_sdk::{
    async_trait, ExecutionBackend, Stage, StageError, StageKind, StageOutput, StageRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// Worker endpoint URLs per stage kind
#[derive(Debug, Clone, Default)]
pub struct StageEndpoints {
    pub rules: Option<String>,
    pub scenario: Option<String>,
    pub optimization: Option<String>,
}

impl StageEndpoints {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            rules: settings.rules_engine_url.clone(),
            scenario: settings.scenario_runner_url.clone(),
            optimization: settings.optimization_engine_url.clone(),
        }
    }

    fn endpoint(&self, kind: StageKind) -> Option<&str> {
        match kind {
            StageKind::Rules => self.rules.as_deref(),
            StageKind::Scenario => self.scenario.as_deref(),
            StageKind::Optimization => self.optimization.as_deref(),
        }
    }
}

/// Shared HTTP dispatch used by both remote backends
struct RemoteDispatcher {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    endpoints: StageEndpoints,
}

impl RemoteDispatcher {
    fn new(max_parallel: usize, endpoints: StageEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
            endpoints,
        }
    }

    async fn dispatch(
        &self,
        backend: &str,
        request: StageRequest,
        timeout: Duration,
    ) -> Result<StageOutput, StageError> {
        let kind = request.kind();

        let url = self
            .endpoints
            .endpoint(kind)
            .ok_or_else(|| StageError::Dispatch {
                stage: kind,
                reason: format!("no {} worker endpoint configured for the {} stage", backend, kind),
            })?
            .to_string();

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| StageError::Dispatch {
                stage: kind,
                reason: "execution backend is shutting down".to_string(),
            })?;

        debug!(stage = %kind, backend, url = %url, "dispatching stage to remote worker");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    StageError::Timeout {
                        stage: kind,
                        timeout_seconds: timeout.as_secs(),
                    }
                } else {
                    StageError::Dispatch {
                        stage: kind,
                        reason: err.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(StageError::Execution {
                stage: kind,
                reason: format!("worker returned {}", response.status()),
            });
        }

        let output: StageOutput = response.json().await.map_err(|err| StageError::Execution {
            stage: kind,
            reason: format!("malformed worker response: {}", err),
        })?;

        if output.kind() != kind {
            return Err(StageError::Mismatch {
                stage: kind,
                received: output.kind(),
            });
        }

        Ok(output)
    }
}

/// Dispatches stage invocations to a distributed task queue
pub struct TaskQueueBackend {
    dispatcher: RemoteDispatcher,
}

impl TaskQueueBackend {
    pub fn new(max_parallel: usize, endpoints: StageEndpoints) -> Self {
        Self {
            dispatcher: RemoteDispatcher::new(max_parallel, endpoints),
        }
    }
}

#[async_trait]
impl ExecutionBackend for TaskQueueBackend {
    fn name(&self) -> &str {
        "celery"
    }

    async fn dispatch(
        &self,
        _stage: Arc<dyn Stage>,
        request: StageRequest,
        timeout: Duration,
    ) -> Result<StageOutput, StageError> {
        self.dispatcher.dispatch(self.name(), request, timeout).await
    }
}

/// Dispatches stage invocations to a distributed compute cluster
///
/// Intended for long-running simulation batches; the gateway blocks until
/// the cluster job settles, so the HTTP timeout bounds the whole job.
pub struct ComputeClusterBackend {
    dispatcher: RemoteDispatcher,
}

impl ComputeClusterBackend {
    pub fn new(max_parallel: usize, endpoints: StageEndpoints) -> Self {
        Self {
            dispatcher: RemoteDispatcher::new(max_parallel, endpoints),
        }
    }
}

#[async_trait]
impl ExecutionBackend for ComputeClusterBackend {
    fn name(&self) -> &str {
        "ray"
    }

    async fn dispatch(
        &self,
        _stage: Arc<dyn Stage>,
        request: StageRequest,
        timeout: Duration,
    ) -> Result<StageOutput, StageError> {
        self.dispatcher.dispatch(self.name(), request, timeout).await
    }
}
