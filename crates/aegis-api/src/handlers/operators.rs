// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Operator liveness and server registry handlers.
//!
//! Server endpoints reach modules through the `ServerLister` capability
//! probe, so the control plane never names a concrete module type.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use aegis_core::error::ModuleError;
use aegis_core::types::{OperatorId, ServerInfo};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// =============================================================================
// Operator Registration & Heartbeats
// =============================================================================

/// Body of `POST /operators/register` and `POST /operators/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperatorBody {
    /// The operator identifier.
    pub id: String,
}

/// `POST /operators/register`
///
/// Registers an operator (idempotent). Modules exposing the
/// `OperatorRegistrar` capability are mirrored best-effort.
pub async fn register_operator(
    State(state): State<AppState>,
    Json(body): Json<OperatorBody>,
) -> ApiResult<impl IntoResponse> {
    if body.id.trim().is_empty() {
        return Err(ApiError::bad_request("operator id is required"));
    }

    let id = OperatorId::new(body.id);
    let info = state.operators.register(id.clone()).await?;

    for name in state.registry.module_names() {
        let Ok(module) = state.registry.get(&name) else {
            continue;
        };
        if let Some(registrar) = module.as_operator_registrar() {
            if let Err(err) = registrar.register_operator(&id).await {
                warn!(module = %name, operator_id = %id, error = %err,
                    "Module failed to mirror operator registration");
            }
        }
    }

    Ok((StatusCode::CREATED, Json(info)))
}

/// `POST /operators/health`
///
/// Records an operator heartbeat. Unknown operators get 404.
pub async fn operator_heartbeat(
    State(state): State<AppState>,
    Json(body): Json<OperatorBody>,
) -> ApiResult<impl IntoResponse> {
    state.operators.heartbeat(&OperatorId::new(body.id)).await?;
    Ok(StatusCode::OK)
}

/// `GET /operators`
pub async fn list_operators(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let operators = state.operators.list().await?;
    Ok(Json(operators))
}

/// Query string of `GET /operators/inactive`.
#[derive(Debug, Deserialize)]
pub struct InactiveQuery {
    /// Heartbeat timeout (humantime, e.g. `"1m"`).
    pub timeout: String,
}

/// `GET /operators/inactive?timeout=<humantime>`
///
/// Operators whose last heartbeat is older than the timeout — input for the
/// external alerting / mark-inactive workflow.
pub async fn inactive_operators(
    State(state): State<AppState>,
    Query(query): Query<InactiveQuery>,
) -> ApiResult<impl IntoResponse> {
    let timeout: Duration = humantime::parse_duration(&query.timeout)
        .map_err(|err| ApiError::bad_request(format!("invalid timeout: {}", err)))?;

    let operators = state.operators.inactive_operators(timeout).await?;
    Ok(Json(operators))
}

// =============================================================================
// Server Registry (via capability probing)
// =============================================================================

fn server_lister(
    state: &AppState,
    module: &str,
) -> ApiResult<std::sync::Arc<dyn aegis_core::module::Module>> {
    let module = state.registry.get(module)?;
    if module.as_server_lister().is_none() {
        return Err(ModuleError::not_found(format!(
            "module '{}' does not list servers",
            module.name()
        ))
        .into());
    }
    Ok(module)
}

/// `GET /servers/{module}`
///
/// Lists the servers a module knows about.
pub async fn list_servers(
    State(state): State<AppState>,
    Path(module): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let module = server_lister(&state, &module)?;
    // Probe re-checked above; unwrap-free access through the capability.
    let Some(lister) = module.as_server_lister() else {
        return Err(ModuleError::not_found("server listing capability").into());
    };

    let servers = lister.list_servers().await?;
    Ok(Json(servers))
}

/// `POST /servers/{module}/register`
pub async fn register_server(
    State(state): State<AppState>,
    Path(module): Path<String>,
    Json(server): Json<ServerInfo>,
) -> ApiResult<impl IntoResponse> {
    if server.name.trim().is_empty() {
        return Err(ApiError::bad_request("server name is required"));
    }

    let module = server_lister(&state, &module)?;
    let Some(lister) = module.as_server_lister() else {
        return Err(ModuleError::not_found("server listing capability").into());
    };

    lister.register_server(server).await?;
    Ok(StatusCode::CREATED)
}

/// Body of `POST /servers/{module}/inactive`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerNameBody {
    /// The server to mark inactive.
    pub name: String,
}

/// `POST /servers/{module}/inactive`
pub async fn mark_server_inactive(
    State(state): State<AppState>,
    Path(module): Path<String>,
    Json(body): Json<ServerNameBody>,
) -> ApiResult<impl IntoResponse> {
    let module = server_lister(&state, &module)?;
    let Some(lister) = module.as_server_lister() else {
        return Err(ModuleError::not_found("server listing capability").into());
    };

    lister.mark_server_inactive(&body.name).await?;
    Ok(StatusCode::OK)
}
