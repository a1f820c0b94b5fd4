// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API error type and HTTP mapping.
//!
//! Caller mistakes map to 4xx, module and infrastructure failures to 5xx,
//! always with a human-readable JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aegis_core::error::{
    AegisError, LifecycleError, ModuleError, RegistryError, StoreError,
};

// =============================================================================
// ApiError
// =============================================================================

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request body.
    #[error("Bad request: {message}")]
    BadRequest {
        /// What was wrong.
        message: String,
    },

    /// Server-side failure outside the core (bind errors, wiring mistakes).
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },

    /// Error bubbling up from the core.
    #[error(transparent)]
    Core(#[from] AegisError),
}

impl ApiError {
    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Core(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Returns a short machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Internal { .. } => "internal",
            ApiError::Core(err) => err.error_type(),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        Self::Core(err.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Core(err.into())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self::Core(err.into())
    }
}

impl From<ModuleError> for ApiError {
    fn from(err: ModuleError) -> Self {
        Self::Core(err.into())
    }
}

/// A Result type with ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Error Body
// =============================================================================

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetails,
}

/// Error details.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Short machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %body.error.message, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %body.error.message, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bad_request_maps_to_400() {
        let err = ApiError::bad_request("server name is required");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "bad_request");
    }

    #[test]
    fn test_internal_maps_to_500() {
        let err = ApiError::internal("listener gone");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal");
    }

    #[test]
    fn test_core_errors_keep_their_status() {
        let err: ApiError = StoreError::not_found("job-1").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = StoreError::conflict("job-1", "pending", "claimed").into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = ModuleError::timeout(Duration::from_secs(5)).into();
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);

        let err: ApiError = ModuleError::failed("boom").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_policy_violation_is_unprocessable() {
        let err: ApiError =
            ApiError::Core(aegis_core::error::PolicyError::ReasonRequired.into());
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
