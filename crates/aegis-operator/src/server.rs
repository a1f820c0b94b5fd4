// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The operator's local HTTP server.
//!
//! Runs next to the poll loop and exposes the operator's modules directly:
//! health for the local module set, plus privilege apply/revoke endpoints
//! for callers with network reach to the operator. The module is selected
//! by the resource identifier, exactly as the control plane does it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use aegis_core::error::ModuleError;
use aegis_core::module::with_deadline;
use aegis_core::registry::ModuleRegistry;
use aegis_core::types::{GrantId, Metadata, PrivilegeLevel, PrivilegeRequest, RequestStatus};
use aegis_core::HealthAggregator;

use crate::error::{OperatorError, OperatorResult};

// =============================================================================
// LocalState
// =============================================================================

/// State shared by the local handlers.
#[derive(Clone)]
struct LocalState {
    registry: Arc<ModuleRegistry>,
    health: Arc<HealthAggregator>,
    operation_timeout: Duration,
}

// =============================================================================
// OperatorServer
// =============================================================================

/// The local health/privilege HTTP server.
pub struct OperatorServer {
    state: LocalState,
    port: u16,
}

impl OperatorServer {
    /// Creates a server over the operator's local modules.
    pub fn new(registry: Arc<ModuleRegistry>, health: Arc<HealthAggregator>, port: u16) -> Self {
        Self {
            state: LocalState {
                registry,
                health,
                operation_timeout: Duration::from_secs(10),
            },
            port,
        }
    }

    /// Sets the deadline applied to module operations.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.state.operation_timeout = timeout;
        self
    }

    /// Creates the router.
    pub fn router(&self) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(30)));

        Router::new()
            .route("/health", get(local_health))
            .route("/privilege/request", post(local_privilege_request))
            .route("/privilege/revoke", post(local_privilege_revoke))
            .layer(middleware)
            .with_state(self.state.clone())
    }

    /// Returns the address the server binds to.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port)
    }

    /// Runs the server with graceful shutdown.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> OperatorResult<()> {
        let addr = self.addr();
        let router = self.router();

        info!(addr = %addr, "Starting operator local server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| OperatorError::server(format!("Failed to bind {}: {}", addr, err)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|err| OperatorError::server(err.to_string()))?;

        info!("Operator local server shutdown complete");
        Ok(())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /health` — aggregate health of the operator's local modules.
async fn local_health(State(state): State<LocalState>) -> impl IntoResponse {
    let report = state.health.check_all().await;

    let status = if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(report))
}

/// Body of `POST /privilege/request`.
#[derive(Debug, Serialize, Deserialize)]
struct LocalRequestBody {
    user_id: String,
    resource_id: String,
    level: PrivilegeLevel,
    #[serde(default)]
    reason: String,
    #[serde(with = "humantime_serde")]
    duration: Duration,
}

/// `POST /privilege/request` — applies a privilege directly through the
/// local module and returns the request with its reversal metadata.
async fn local_privilege_request(
    State(state): State<LocalState>,
    Json(body): Json<LocalRequestBody>,
) -> Result<impl IntoResponse, LocalError> {
    let module = state
        .registry
        .module_for_resource(&body.resource_id)
        .ok_or_else(|| {
            LocalError::not_found(format!("no module handles resource '{}'", body.resource_id))
        })?;

    let mut request = PrivilegeRequest::new(
        body.user_id,
        body.resource_id,
        body.level,
        body.reason,
        body.duration,
    );

    with_deadline(
        state.operation_timeout,
        module.handle_privilege_request(&mut request),
    )
    .await
    .map_err(|err| LocalError::from_module(err.with_module(module.name())))?;

    request.status = RequestStatus::Approved;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Body of `POST /privilege/revoke`.
#[derive(Debug, Serialize, Deserialize)]
struct LocalRevokeBody {
    grant_id: GrantId,
    resource_id: String,
    #[serde(default)]
    metadata: Metadata,
}

/// `POST /privilege/revoke` — reverses a privilege through the local
/// module. A module-side `NotFound` reports success: the privilege is gone
/// either way.
async fn local_privilege_revoke(
    State(state): State<LocalState>,
    Json(body): Json<LocalRevokeBody>,
) -> Result<impl IntoResponse, LocalError> {
    let module = state
        .registry
        .module_for_resource(&body.resource_id)
        .ok_or_else(|| {
            LocalError::not_found(format!("no module handles resource '{}'", body.resource_id))
        })?;

    let outcome = with_deadline(
        state.operation_timeout,
        module.revoke_privilege(&body.grant_id, &body.metadata),
    )
    .await;

    match outcome {
        Ok(()) => {}
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(LocalError::from_module(err.with_module(module.name()))),
    }

    Ok(StatusCode::OK)
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Error body returned by the local endpoints.
#[derive(Debug, Serialize)]
struct LocalErrorBody {
    error: String,
}

struct LocalError {
    status: StatusCode,
    message: String,
}

impl LocalError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn from_module(err: ModuleError) -> Self {
        Self {
            status: StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for LocalError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(LocalErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================
