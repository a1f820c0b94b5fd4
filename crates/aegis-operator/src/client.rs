// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HTTP client for the control plane API.
//!
//! Operators have no inbound reachability; every interaction is an outbound
//! call from here — registration, heartbeats, and the poll/claim/report job
//! protocol.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use aegis_core::types::{Job, JobId, JobStatus, OperatorId, OperatorInfo};

use crate::dispatch::JobOutcome;
use crate::error::{OperatorError, OperatorResult};

// =============================================================================
// ControlPlaneClient
// =============================================================================

/// Client for the operator-facing control plane endpoints.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct OperatorBody<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct UpdateJobBody<'a> {
    status: &'a str,
    result: &'a str,
    error: &'a str,
}

impl ControlPlaneClient {
    /// Creates a client for the given base URL (e.g. `http://aegis:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            // The builder only fails on TLS backend misconfiguration.
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(base_url, http)
    }

    /// Creates a client reusing an existing `reqwest::Client`.
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =========================================================================
    // Registration & Heartbeats
    // =========================================================================

    /// Registers this operator with the control plane. Idempotent.
    pub async fn register(&self, id: &OperatorId) -> OperatorResult<OperatorInfo> {
        let response = self
            .http
            .post(self.url("/operators/register"))
            .json(&OperatorBody { id: id.as_str() })
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Sends a heartbeat for this operator.
    pub async fn heartbeat(&self, id: &OperatorId) -> OperatorResult<()> {
        let response = self
            .http
            .post(self.url("/operators/health"))
            .json(&OperatorBody { id: id.as_str() })
            .send()
            .await?;

        Self::check(response).await?;
        debug!(operator_id = %id, "Heartbeat sent");
        Ok(())
    }

    // =========================================================================
    // Job Protocol
    // =========================================================================

    /// Lists pending jobs in creation order.
    pub async fn pending_jobs(&self) -> OperatorResult<Vec<Job>> {
        let response = self.http.get(self.url("/jobs/pending")).send().await?;
        Self::decode(response).await
    }

    /// Attempts to claim a pending job.
    ///
    /// Returns `None` when another operator won the race — losing a claim is
    /// an expected outcome, not an error.
    pub async fn claim_job(&self, id: &JobId) -> OperatorResult<Option<Job>> {
        let response = self
            .http
            .post(self.url(&format!("/jobs/{}/claim", id)))
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            debug!(job_id = %id, "Lost claim race");
            return Ok(None);
        }

        Self::decode(response).await.map(Some)
    }

    /// Reports a job's terminal outcome.
    pub async fn finish_job(&self, id: &JobId, outcome: &JobOutcome) -> OperatorResult<Job> {
        let status = match outcome.status {
            JobStatus::Completed => "completed",
            _ => "failed",
        };

        let response = self
            .http
            .put(self.url(&format!("/jobs/{}", id)))
            .json(&UpdateJobBody {
                status,
                result: &outcome.result,
                error: &outcome.error,
            })
            .send()
            .await?;

        Self::decode(response).await
    }

    // =========================================================================
    // Response Handling
    // =========================================================================

    async fn check(response: reqwest::Response) -> OperatorResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.text().await {
            Ok(body) => extract_error_message(&body),
            Err(_) => status.to_string(),
        };

        Err(OperatorError::api(status.as_u16(), message))
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> OperatorResult<T> {
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|err| OperatorError::decode(err.to_string()))
    }
}

/// Pulls the human-readable message out of the API error body, falling back
/// to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

// =============================================================================
// Tests
// =============================================================================
