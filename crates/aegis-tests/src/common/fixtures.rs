// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pre-wired control planes and request payloads.

use std::sync::Arc;
use std::time::Duration;

use aegis_api::{ApiServer, AppState};
use aegis_core::lifecycle::NewPrivilegeRequest;
use aegis_core::module::Module;
use aegis_core::policy::StandardRuleEngine;
use aegis_core::registry::ModuleRegistry;
use aegis_core::types::PrivilegeLevel;
use aegis_core::{HealthAggregator, JobQueue, OperatorTracker, PrivilegeService};
use aegis_store::MemoryStore;

use crate::common::mocks::MockModule;

// =============================================================================
// ControlPlane
// =============================================================================

/// A fully wired in-process control plane.
///
/// Every component shares the same [`MemoryStore`], so tests can mix direct
/// service calls with HTTP traffic against [`ControlPlane::router`].
pub struct ControlPlane {
    /// The shared record store.
    pub store: Arc<MemoryStore>,
    /// The module registry.
    pub registry: Arc<ModuleRegistry>,
    /// The privilege lifecycle manager.
    pub service: Arc<PrivilegeService>,
    /// The job queue.
    pub jobs: Arc<JobQueue>,
    /// The operator liveness tracker.
    pub operators: Arc<OperatorTracker>,
    /// The enabled modules, in registration order.
    pub modules: Vec<Arc<dyn Module>>,
}

impl ControlPlane {
    /// Wires a control plane around the given modules.
    pub fn with_modules(modules: Vec<Arc<dyn Module>>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(ModuleRegistry::new());
        for module in &modules {
            registry
                .register(module.clone())
                .expect("fixture module names are unique");
        }

        let service = Arc::new(PrivilegeService::new(
            store.clone(),
            registry.clone(),
            Arc::new(StandardRuleEngine::default()),
        ));
        let jobs = Arc::new(JobQueue::new(store.clone()));
        let operators = Arc::new(OperatorTracker::new(store.clone()));

        Self {
            store,
            registry,
            service,
            jobs,
            operators,
            modules,
        }
    }

    /// Wires a control plane around a single [`MockModule`].
    pub fn with_mock() -> (Self, Arc<MockModule>) {
        let module = MockModule::new();
        let plane = Self::with_modules(vec![module.clone() as Arc<dyn Module>]);
        (plane, module)
    }

    /// Builds the HTTP router over this control plane.
    pub fn router(&self) -> axum::Router {
        let state = AppState::builder()
            .registry(self.registry.clone())
            .service(self.service.clone())
            .jobs(self.jobs.clone())
            .health(Arc::new(
                HealthAggregator::new(self.modules.clone())
                    .with_check_timeout(Duration::from_millis(500)),
            ))
            .operators(self.operators.clone())
            .build()
            .expect("fixture state is fully wired");

        ApiServer::new(state).router()
    }

    /// Serves the router on an ephemeral local port.
    ///
    /// Returns the base URL. The server task runs until the test process
    /// drops it.
    pub async fn serve(&self) -> String {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral port available");
        let addr = listener.local_addr().expect("bound socket has an address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        format!("http://{}", addr)
    }
}

// =============================================================================
// Request Payloads
// =============================================================================

/// A request well inside the default policy bounds.
pub fn valid_request(user_id: &str, resource_id: &str) -> NewPrivilegeRequest {
    NewPrivilegeRequest {
        user_id: user_id.to_string(),
        resource_id: resource_id.to_string(),
        level: PrivilegeLevel::Read,
        reason: "debug".to_string(),
        duration: Duration::from_secs(3600),
    }
}

/// A request with an explicit duration.
pub fn request_with_duration(duration: Duration) -> NewPrivilegeRequest {
    NewPrivilegeRequest {
        duration,
        ..valid_request("u1", "mysql-1")
    }
}
