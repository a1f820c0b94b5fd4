// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Job queue handlers — the operator-facing side of the pull protocol.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use aegis_core::module::PingRequest;
use aegis_core::types::{JobId, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// =============================================================================
// Create
// =============================================================================

/// Body of `POST /jobs/ping`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PingJobBody {
    /// Server the operator should ping.
    pub server: String,
    /// Module that must execute the job; defaults to `mysql`.
    #[serde(default = "default_ping_module")]
    pub module: String,
}

fn default_ping_module() -> String {
    "mysql".to_string()
}

/// `POST /jobs/ping`
///
/// Queues a ping job for an operator to pick up.
pub async fn create_ping_job(
    State(state): State<AppState>,
    Json(body): Json<PingJobBody>,
) -> ApiResult<impl IntoResponse> {
    if body.server.trim().is_empty() {
        return Err(ApiError::bad_request("server name is required"));
    }
    if !state.registry.contains(&body.module) {
        return Err(aegis_core::error::RegistryError::not_found(&body.module).into());
    }

    let payload = serde_json::to_value(PingRequest {
        server: body.server,
    })
    .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let job = state.jobs.create(body.module, "ping", payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

// =============================================================================
// Observe
// =============================================================================

/// `GET /jobs/pending`
///
/// Pending jobs in creation order. Operators filter this list to their own
/// modules and then claim before executing.
pub async fn pending_jobs(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let jobs = state.jobs.pending().await?;
    Ok(Json(jobs))
}

/// `GET /jobs/{id}`
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let job = state.jobs.get(&JobId::new(id)).await?;
    Ok(Json(job))
}

// =============================================================================
// Claim
// =============================================================================

/// `POST /jobs/{id}/claim`
///
/// Atomically claims a pending job. Exactly one racer wins; losers get 409.
pub async fn claim_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let job = state.jobs.claim(&JobId::new(id)).await?;
    Ok(Json(job))
}

// =============================================================================
// Update
// =============================================================================

/// Body of `PUT /jobs/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateJobBody {
    /// Terminal status: `completed` or `failed`.
    pub status: String,
    /// Result text for completed jobs.
    #[serde(default)]
    pub result: String,
    /// Error text for failed jobs.
    #[serde(default)]
    pub error: String,
}

/// `PUT /jobs/{id}`
///
/// Records a job's terminal outcome. Terminal jobs reject further updates.
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateJobBody>,
) -> ApiResult<impl IntoResponse> {
    let status = match body.status.as_str() {
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        other => {
            return Err(ApiError::bad_request(format!(
                "status must be 'completed' or 'failed', got '{}'",
                other
            )))
        }
    };

    let job = state
        .jobs
        .update(&JobId::new(id), status, body.result, body.error)
        .await?;
    Ok(Json(job))
}
