// HTTP API layer
pub mod api;

// Execution backend implementations
pub mod backend;

// Batched concurrency helpers
pub mod concurrency;

// Service configuration
pub mod config;

// Workflow orchestrator
pub mod hub;

// Logging bootstrap
pub mod logging;

// Analysis stage services
pub mod stages;
