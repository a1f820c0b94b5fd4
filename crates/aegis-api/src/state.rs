// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;

use aegis_core::health::{HealthAggregator, OperatorTracker};
use aegis_core::jobs::JobQueue;
use aegis_core::lifecycle::PrivilegeService;
use aegis_core::registry::ModuleRegistry;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// AppState
// =============================================================================

/// State container handed to every handler via axum's state extraction.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Module registry for capability lookups.
    pub registry: Arc<ModuleRegistry>,
    /// Privilege lifecycle manager.
    pub service: Arc<PrivilegeService>,
    /// Asynchronous job queue.
    pub jobs: Arc<JobQueue>,
    /// Module health aggregator.
    pub health: Arc<HealthAggregator>,
    /// Operator liveness tracker.
    pub operators: Arc<OperatorTracker>,
}

impl AppState {
    /// Creates a new state builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for constructing [`AppState`].
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<ApiConfig>,
    registry: Option<Arc<ModuleRegistry>>,
    service: Option<Arc<PrivilegeService>>,
    jobs: Option<Arc<JobQueue>>,
    health: Option<Arc<HealthAggregator>>,
    operators: Option<Arc<OperatorTracker>>,
}

impl AppStateBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the module registry.
    pub fn registry(mut self, registry: Arc<ModuleRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the privilege service.
    pub fn service(mut self, service: Arc<PrivilegeService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Sets the job queue.
    pub fn jobs(mut self, jobs: Arc<JobQueue>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Sets the health aggregator.
    pub fn health(mut self, health: Arc<HealthAggregator>) -> Self {
        self.health = Some(health);
        self
    }

    /// Sets the operator tracker.
    pub fn operators(mut self, operators: Arc<OperatorTracker>) -> Self {
        self.operators = Some(operators);
        self
    }

    /// Builds the state.
    ///
    /// # Errors
    ///
    /// Fails when a required component is missing — wiring mistakes surface
    /// at startup.
    pub fn build(self) -> ApiResult<AppState> {
        let require = |name: &str| move || ApiError::internal(format!("{} not wired", name));

        Ok(AppState {
            config: Arc::new(self.config.unwrap_or_default()),
            registry: self.registry.ok_or_else(require("module registry"))?,
            service: self.service.ok_or_else(require("privilege service"))?,
            jobs: self.jobs.ok_or_else(require("job queue"))?,
            health: self.health.ok_or_else(require("health aggregator"))?,
            operators: self.operators.ok_or_else(require("operator tracker"))?,
        })
    }
}
