// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Health handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::AppState;

// =============================================================================
// Health
// =============================================================================

/// `GET /health`
///
/// Probes every enabled module. Returns 200 with
/// `{"status": "ok", "modules": {...}}` when all are healthy, or 503 with
/// `"degraded"` and each failing module's error text verbatim.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.health.check_all().await;

    let status = if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(report))
}
