// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Job dispatch.
//!
//! Claimed jobs are routed by their type to a type-specific handler running
//! against the locally registered module. Handler errors become a `failed`
//! outcome carrying the error text; they never escape the poll loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use aegis_core::error::ModuleError;
use aegis_core::module::{with_deadline, Module, PingRequest};
use aegis_core::registry::ModuleRegistry;
use aegis_core::types::{Job, JobStatus};

// =============================================================================
// JobOutcome
// =============================================================================

/// Terminal outcome reported back for an executed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// `Completed` or `Failed`.
    pub status: JobStatus,
    /// Result text for completed jobs.
    pub result: String,
    /// Error text for failed jobs.
    pub error: String,
}

impl JobOutcome {
    /// Creates a completed outcome.
    pub fn completed(result: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Completed,
            result: result.into(),
            error: String::new(),
        }
    }

    /// Creates a failed outcome.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            result: String::new(),
            error: error.into(),
        }
    }
}

// =============================================================================
// JobHandler
// =============================================================================

/// A handler for one job type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job type this handler executes (e.g. `ping`).
    fn job_type(&self) -> &str;

    /// Executes the job against the module named by it.
    ///
    /// Returns the result text recorded on the completed job.
    async fn handle(&self, module: Arc<dyn Module>, job: &Job) -> Result<String, ModuleError>;
}

/// Handler for `ping` jobs, backed by the module's `Pinger` capability.
pub struct PingHandler;

#[async_trait]
impl JobHandler for PingHandler {
    fn job_type(&self) -> &str {
        "ping"
    }

    async fn handle(&self, module: Arc<dyn Module>, job: &Job) -> Result<String, ModuleError> {
        let pinger = module
            .as_pinger()
            .ok_or_else(|| ModuleError::failed(format!("module '{}' cannot ping", module.name())))?;

        let request: PingRequest = serde_json::from_value(job.request.clone())
            .map_err(|err| ModuleError::failed(format!("invalid ping payload: {}", err)))?;

        pinger.ping(&request).await
    }
}

// =============================================================================
// JobDispatcher
// =============================================================================

/// Routes claimed jobs to type-specific handlers.
pub struct JobDispatcher {
    registry: Arc<ModuleRegistry>,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    operation_timeout: Duration,
}

impl JobDispatcher {
    /// Creates a dispatcher over the locally registered modules, with the
    /// built-in handler set.
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        let mut dispatcher = Self {
            registry,
            handlers: HashMap::new(),
            operation_timeout: Duration::from_secs(10),
        };
        dispatcher.register_handler(Arc::new(PingHandler));
        dispatcher
    }

    /// Sets the deadline applied to each handler invocation.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Registers an additional handler. Later registrations win on type
    /// collisions.
    pub fn register_handler(&mut self, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(handler.job_type().to_string(), handler);
    }

    /// Returns `true` if the job's module is registered locally.
    ///
    /// The poll loop only claims jobs it can actually execute.
    pub fn handles(&self, job: &Job) -> bool {
        self.registry.contains(&job.module)
    }

    /// Executes a claimed job and converts every failure into a terminal
    /// `failed` outcome.
    pub async fn dispatch(&self, job: &Job) -> JobOutcome {
        let module = match self.registry.get(&job.module) {
            Ok(module) => module,
            Err(err) => return JobOutcome::failed(err.to_string()),
        };

        let handler = match self.handlers.get(&job.job_type) {
            Some(handler) => handler.clone(),
            None => {
                return JobOutcome::failed(format!("no handler for job type '{}'", job.job_type))
            }
        };

        debug!(job_id = %job.id, job_type = %job.job_type, module = %job.module, "Dispatching job");

        match with_deadline(self.operation_timeout, handler.handle(module, job)).await {
            Ok(result) => JobOutcome::completed(result),
            Err(err) => JobOutcome::failed(err.to_string()),
        }
    }
}

impl std::fmt::Debug for JobDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&String> = self.handlers.keys().collect();
        types.sort();
        f.debug_struct("JobDispatcher")
            .field("handlers", &types)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
