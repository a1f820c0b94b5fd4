// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::handlers;
use crate::state::{AppState, AppStateBuilder};

// =============================================================================
// ApiServer
// =============================================================================

/// The control plane API server.
///
/// This is the main entry point for creating and running the HTTP server.
pub struct ApiServer {
    state: AppState,
    config: Arc<ApiConfig>,
}

impl ApiServer {
    /// Creates a new API server with the given state.
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        Self { state, config }
    }

    /// Creates the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(self.config.request_timeout));

        Router::new()
            // Health (aggregated module status)
            .route("/health", get(handlers::health))
            // Privilege lifecycle
            .route("/privilege/request", post(handlers::submit_request))
            .route("/privilege/approve", post(handlers::approve_request))
            .route("/privilege/revoke", post(handlers::revoke_grant))
            .route("/privilege/requests/pending", get(handlers::pending_requests))
            .route("/privilege/grants", get(handlers::active_grants))
            // Job queue (operator pull protocol)
            .route("/jobs/ping", post(handlers::create_ping_job))
            .route("/jobs/pending", get(handlers::pending_jobs))
            .route("/jobs/{id}", get(handlers::get_job).put(handlers::update_job))
            .route("/jobs/{id}/claim", post(handlers::claim_job))
            // Operator liveness
            .route("/operators/register", post(handlers::register_operator))
            .route("/operators/health", post(handlers::operator_heartbeat))
            .route("/operators", get(handlers::list_operators))
            .route("/operators/inactive", get(handlers::inactive_operators))
            // Server registry (ServerLister capability)
            .route("/servers/{module}", get(handlers::list_servers))
            .route("/servers/{module}/register", post(handlers::register_server))
            .route("/servers/{module}/inactive", post(handlers::mark_server_inactive))
            .layer(middleware)
            .with_state(self.state.clone())
    }

    /// Runs the server until the process exits.
    pub async fn run(self) -> ApiResult<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Runs the server with graceful shutdown.
    ///
    /// In-flight requests complete before the server exits.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.config.socket_addr();
        let router = self.router();

        info!(addr = %addr, "Starting control plane API server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| ApiError::internal(format!("Failed to bind {}: {}", addr, err)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|err| ApiError::internal(format!("Server error: {}", err)))?;

        info!("Control plane API server shutdown complete");
        Ok(())
    }

    /// Returns the address the server binds to.
    pub fn addr(&self) -> SocketAddr {
        self.config.socket_addr()
    }
}

// =============================================================================
// Server Builder
// =============================================================================

/// Builder for creating the API server.
pub struct ApiServerBuilder {
    state_builder: AppStateBuilder,
}

impl ApiServerBuilder {
    /// Creates a new server builder.
    pub fn new() -> Self {
        Self {
            state_builder: AppState::builder(),
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.state_builder = self.state_builder.config(config);
        self
    }

    /// Sets the module registry.
    pub fn registry(mut self, registry: Arc<aegis_core::ModuleRegistry>) -> Self {
        self.state_builder = self.state_builder.registry(registry);
        self
    }

    /// Sets the privilege lifecycle service.
    pub fn service(mut self, service: Arc<aegis_core::PrivilegeService>) -> Self {
        self.state_builder = self.state_builder.service(service);
        self
    }

    /// Sets the job queue.
    pub fn jobs(mut self, jobs: Arc<aegis_core::JobQueue>) -> Self {
        self.state_builder = self.state_builder.jobs(jobs);
        self
    }

    /// Sets the health aggregator.
    pub fn health(mut self, health: Arc<aegis_core::HealthAggregator>) -> Self {
        self.state_builder = self.state_builder.health(health);
        self
    }

    /// Sets the operator tracker.
    pub fn operators(mut self, operators: Arc<aegis_core::OperatorTracker>) -> Self {
        self.state_builder = self.state_builder.operators(operators);
        self
    }

    /// Builds the server.
    pub fn build(self) -> ApiResult<ApiServer> {
        let state = self.state_builder.build()?;
        Ok(ApiServer::new(state))
    }
}

impl Default for ApiServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use aegis_core::error::{ConfigError, ModuleError};
    use aegis_core::module::{Module, ModuleConfig};
    use aegis_core::policy::StandardRuleEngine;
    use aegis_core::types::{GrantId, Metadata, PrivilegeRequest};
    use aegis_core::{HealthAggregator, JobQueue, ModuleRegistry, OperatorTracker, PrivilegeService};
    use aegis_store::MemoryStore;

    struct StubModule {
        healthy: bool,
    }

    #[async_trait]
    impl Module for StubModule {
        fn name(&self) -> &str {
            "mysql"
        }

        fn describe(&self) -> &str {
            "stub mysql module"
        }

        fn validate_config(&self, _config: &ModuleConfig) -> Result<(), ConfigError> {
            Ok(())
        }

        async fn initialize(&self, _config: &ModuleConfig) -> Result<(), ModuleError> {
            Ok(())
        }

        async fn handle_privilege_request(
            &self,
            request: &mut PrivilegeRequest,
        ) -> Result<(), ModuleError> {
            request
                .metadata
                .insert("username".to_string(), serde_json::Value::String("u".into()));
            Ok(())
        }

        async fn revoke_privilege(
            &self,
            _grant_id: &GrantId,
            _metadata: &Metadata,
        ) -> Result<(), ModuleError> {
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ModuleError> {
            if self.healthy {
                Ok(())
            } else {
                Err(ModuleError::transient("connection refused"))
            }
        }
    }

    fn server_with(healthy: bool) -> ApiServer {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(ModuleRegistry::new());
        let module = Arc::new(StubModule { healthy });
        registry.register(module.clone()).unwrap();

        let service = Arc::new(PrivilegeService::new(
            store.clone(),
            registry.clone(),
            Arc::new(StandardRuleEngine::default()),
        ));

        ApiServerBuilder::new()
            .registry(registry)
            .service(service)
            .jobs(Arc::new(JobQueue::new(store.clone())))
            .health(Arc::new(HealthAggregator::new(vec![module])))
            .operators(Arc::new(OperatorTracker::new(store)))
            .build()
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthy_modules_return_200() {
        let router = server_with(true).router();

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["modules"]["mysql"], "healthy");
    }

    #[tokio::test]
    async fn test_degraded_health_returns_503_with_error_text() {
        let router = server_with(false).router();

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert!(body["modules"]["mysql"]
            .as_str()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn test_submit_request_returns_201() {
        let router = server_with(true).router();

        let response = router
            .oneshot(
                Request::post("/privilege/request")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "user_id": "u1",
                            "resource_id": "mysql-1",
                            "level": "read",
                            "reason": "debug",
                            "duration": "1h",
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["duration"], "1h");
    }

    #[tokio::test]
    async fn test_unknown_job_returns_404_with_body() {
        let router = server_with(true).router();

        let response = router
            .oneshot(Request::get("/jobs/job-missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["error"]["message"].as_str().unwrap().contains("job-missing"));
    }

    #[test]
    fn test_server_builder_requires_wiring() {
        assert!(ApiServerBuilder::new().build().is_err());
    }

    #[test]
    fn test_server_addr_defaults() {
        let server = server_with(true);
        assert_eq!(server.addr().port(), 8080);
    }
}
