// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Privilege request and grant handlers.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use aegis_core::lifecycle::NewPrivilegeRequest;
use aegis_core::types::{GrantId, PrivilegeLevel, RequestId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// =============================================================================
// Submit
// =============================================================================

/// Body of `POST /privilege/request`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitBody {
    /// The user asking for elevated access.
    pub user_id: String,
    /// The resource the access applies to.
    pub resource_id: String,
    /// Requested privilege level.
    pub level: PrivilegeLevel,
    /// Free-form justification.
    #[serde(default)]
    pub reason: String,
    /// How long the privilege should last (humantime, e.g. `"1h"`).
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

/// `POST /privilege/request`
///
/// Creates a privilege request. Policy violations come back as a `denied`
/// request stating the violated rule, not as an error.
pub async fn submit_request(
    State(state): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> ApiResult<impl IntoResponse> {
    if body.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("user_id is required"));
    }
    if body.resource_id.trim().is_empty() {
        return Err(ApiError::bad_request("resource_id is required"));
    }

    let request = state
        .service
        .submit(NewPrivilegeRequest {
            user_id: body.user_id,
            resource_id: body.resource_id,
            level: body.level,
            reason: body.reason,
            duration: body.duration,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

// =============================================================================
// Approve
// =============================================================================

/// Body of `POST /privilege/approve`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveBody {
    /// The request to approve.
    pub request_id: RequestId,
    /// Who approves it.
    pub approver: String,
}

/// `POST /privilege/approve`
///
/// Approves a pending request; on module success exactly one grant is
/// returned.
pub async fn approve_request(
    State(state): State<AppState>,
    Json(body): Json<ApproveBody>,
) -> ApiResult<impl IntoResponse> {
    if body.approver.trim().is_empty() {
        return Err(ApiError::bad_request("approver is required"));
    }

    let grant = state.service.approve(&body.request_id, &body.approver).await?;
    Ok(Json(grant))
}

// =============================================================================
// Revoke
// =============================================================================

/// Body of `POST /privilege/revoke`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RevokeBody {
    /// The grant to revoke.
    pub grant_id: GrantId,
}

/// `POST /privilege/revoke`
///
/// Revokes a grant. Revoking an already-revoked grant reports success;
/// module failures surface as 5xx and leave the grant revocable.
pub async fn revoke_grant(
    State(state): State<AppState>,
    Json(body): Json<RevokeBody>,
) -> ApiResult<impl IntoResponse> {
    let grant = state.service.revoke(&body.grant_id).await?;
    Ok(Json(grant))
}

// =============================================================================
// Queries
// =============================================================================

/// `GET /privilege/requests/pending`
pub async fn pending_requests(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let requests = state.service.pending_requests().await?;
    Ok(Json(requests))
}

/// Query string of `GET /privilege/grants`.
#[derive(Debug, Deserialize)]
pub struct GrantsQuery {
    /// User whose grants to list.
    pub user: String,
}

/// `GET /privilege/grants?user=<id>`
pub async fn active_grants(
    State(state): State<AppState>,
    Query(query): Query<GrantsQuery>,
) -> ApiResult<impl IntoResponse> {
    let grants = state.service.active_grants(&query.user).await?;
    Ok(Json(grants))
}
