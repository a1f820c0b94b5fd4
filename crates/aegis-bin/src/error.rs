// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the AEGIS binary.

use thiserror::Error;

/// Result type alias for aegis-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the AEGIS binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Initialization error.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Config parsing error.
    #[error("Config error: {0}")]
    Config(#[from] aegis_core::error::ConfigError),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] aegis_core::error::AegisError),

    /// API server error.
    #[error("API error: {0}")]
    Api(#[from] aegis_api::ApiError),

    /// Operator agent error.
    #[error("Operator error: {0}")]
    Operator(#[from] aegis_operator::OperatorError),
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Initialization(_) => 2,
            Self::Runtime(_) => 3,
            Self::Core(_) => 4,
            Self::Api(_) => 5,
            Self::Operator(_) => 6,
        }
    }
}

impl From<aegis_core::error::RegistryError> for BinError {
    fn from(err: aegis_core::error::RegistryError) -> Self {
        Self::Core(err.into())
    }
}

impl From<aegis_core::error::ModuleError> for BinError {
    fn from(err: aegis_core::error::ModuleError) -> Self {
        Self::Core(err.into())
    }
}

impl From<aegis_core::error::TaskError> for BinError {
    fn from(err: aegis_core::error::TaskError) -> Self {
        Self::Core(err.into())
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with its cause chain.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

// =============================================================================
// Tests
// =============================================================================
