// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the operator agent.

use thiserror::Error;

use aegis_core::error::{ModuleError, RegistryError, TaskError};

/// A Result type with OperatorError.
pub type OperatorResult<T> = Result<T, OperatorError>;

/// Errors raised by the operator agent.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// The control plane could not be reached. Retryable on the next poll.
    #[error("Control plane unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The control plane answered with an error status.
    #[error("Control plane rejected the request ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error text from the response body.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("Failed to decode control plane response: {message}")]
    Decode {
        /// Decode error text.
        message: String,
    },

    /// Module-side failure while executing a job or local request.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Local module registry misuse.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Background task scheduling failure.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// The local HTTP server failed.
    #[error("Local server error: {message}")]
    Server {
        /// Failure text.
        message: String,
    },
}

impl OperatorError {
    /// Creates an API error from a status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a local server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Returns `true` if the operation may succeed on a later poll cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            OperatorError::Transport(_) => true,
            OperatorError::Api { status, .. } => *status >= 500,
            OperatorError::Module(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Returns `true` if another operator already claimed the contested job.
    pub fn is_claim_conflict(&self) -> bool {
        matches!(self, OperatorError::Api { status: 409, .. })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_retryability() {
        assert!(OperatorError::api(503, "down").is_retryable());
        assert!(!OperatorError::api(404, "missing").is_retryable());
        assert!(!OperatorError::api(409, "claimed").is_retryable());
    }

    #[test]
    fn test_claim_conflict_detection() {
        assert!(OperatorError::api(409, "claimed").is_claim_conflict());
        assert!(!OperatorError::api(404, "missing").is_claim_conflict());
        assert!(!OperatorError::decode("bad json").is_claim_conflict());
    }

    #[test]
    fn test_module_error_passthrough() {
        let err: OperatorError = ModuleError::transient("resource down").into();
        assert!(err.is_retryable());

        let err: OperatorError = ModuleError::not_found("grant").into();
        assert!(!err.is_retryable());
    }
}
