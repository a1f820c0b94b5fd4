// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for AEGIS.
//!
//! This module defines the error type system used across the control plane
//! and operators:
//!
//! - Provides clear, descriptive error messages
//! - Distinguishes between retryable and non-retryable errors
//! - Maps errors to appropriate HTTP status codes
//! - Supports structured logging
//!
//! # Error Hierarchy
//!
//! ```text
//! AegisError (root)
//! ├── ConfigError     - Module/system configuration (fatal at startup)
//! ├── RegistryError   - Module registration and lookup (fatal at wiring)
//! ├── PolicyError     - Rule engine rejections (yield Denied, never a crash)
//! ├── ModuleError     - Privileged actions, revocations, health checks
//! ├── StoreError      - Persisted request/grant/job/operator records
//! ├── LifecycleError  - Request/grant state machine violations
//! └── TaskError       - Background task scheduling
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// =============================================================================
// AegisError - Root Error Type
// =============================================================================

/// The root error type for AEGIS.
///
/// All errors in the system convert into this type, providing a unified
/// handling interface at the outer layers (HTTP handlers, the binary).
#[derive(Debug, Error)]
pub enum AegisError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Module registry error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Policy rule violation.
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Module operation error.
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    /// Storage error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Lifecycle state machine error.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Background task error.
    #[error("Task error: {0}")]
    Task(#[from] TaskError),
}

impl AegisError {
    /// Returns `true` if this error is retryable.
    ///
    /// Retryable errors are transient conditions that may succeed on a
    /// subsequent attempt (sweep cycles retry them automatically).
    pub fn is_retryable(&self) -> bool {
        match self {
            AegisError::Module(e) => e.is_retryable(),
            AegisError::Store(e) => e.is_retryable(),
            AegisError::Lifecycle(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the error type as a string for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            AegisError::Config(_) => "config",
            AegisError::Registry(_) => "registry",
            AegisError::Policy(_) => "policy",
            AegisError::Module(_) => "module",
            AegisError::Store(_) => "store",
            AegisError::Lifecycle(_) => "lifecycle",
            AegisError::Task(_) => "task",
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// Caller mistakes map to 4xx; module and infrastructure failures to 5xx.
    pub fn status_code(&self) -> u16 {
        match self {
            AegisError::Config(_) => 400,
            AegisError::Registry(e) => e.status_code(),
            AegisError::Policy(_) => 422,
            AegisError::Module(e) => e.status_code(),
            AegisError::Store(e) => e.status_code(),
            AegisError::Lifecycle(e) => e.status_code(),
            AegisError::Task(_) => 500,
        }
    }

    /// Returns a user-friendly error message.
    ///
    /// Suitable for display to end users; avoids internal detail.
    pub fn user_message(&self) -> String {
        match self {
            AegisError::Config(e) => format!("설정 오류: {}", e),
            AegisError::Registry(e) => format!("모듈 오류: {}", e),
            AegisError::Policy(e) => format!("정책 위반: {}", e),
            AegisError::Module(e) => format!("권한 처리 오류: {}", e.user_message()),
            AegisError::Store(e) => e.user_message(),
            AegisError::Lifecycle(e) => e.user_message(),
            AegisError::Task(e) => format!("백그라운드 작업 오류: {}", e),
        }
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration-related errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// Field value failed validation.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// What was wrong.
        message: String,
    },

    /// Module settings could not be decoded.
    #[error("Invalid settings for module '{module}': {message}")]
    InvalidSettings {
        /// The module whose settings were rejected.
        module: String,
        /// What was wrong.
        message: String,
    },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config '{path}': {message}")]
    Parse {
        /// Path to the configuration file.
        path: String,
        /// Parse error text.
        message: String,
    },

    /// File I/O error.
    #[error("Failed to read config '{path}': {source}")]
    Io {
        /// Path to the file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid settings error.
    pub fn invalid_settings(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// RegistryError
// =============================================================================

/// Module registry errors. Fatal at wiring time — misconfiguration must
/// surface at startup, not at first use.
#[derive(Debug, Error, Clone)]
pub enum RegistryError {
    /// A module with the same (case-insensitive) name is already registered.
    #[error("Module '{name}' is already registered")]
    DuplicateModule {
        /// The colliding module name.
        name: String,
    },

    /// No module with the given name was ever registered.
    #[error("Module '{name}' not found")]
    ModuleNotFound {
        /// The unknown module name.
        name: String,
    },

    /// The enabled-modules list resolved to nothing.
    #[error("No modules enabled")]
    NoModulesEnabled,
}

impl RegistryError {
    /// Creates a duplicate module error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateModule { name: name.into() }
    }

    /// Creates a module not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::ModuleNotFound { name: name.into() }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RegistryError::ModuleNotFound { .. } => 404,
            _ => 500,
        }
    }
}

// =============================================================================
// PolicyError
// =============================================================================

/// Rule engine rejections.
///
/// A policy violation denies the request; it is never treated as a crash.
/// The violated rule is always named so the caller knows what to fix.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Requested duration exceeds the allowed ceiling.
    #[error("duration {requested} exceeds the maximum allowed {maximum}")]
    DurationTooLong {
        /// The requested duration, humantime-formatted.
        requested: String,
        /// The configured ceiling, humantime-formatted.
        maximum: String,
    },

    /// Requested duration is under the allowed floor.
    #[error("duration {requested} is below the minimum allowed {minimum}")]
    DurationTooShort {
        /// The requested duration, humantime-formatted.
        requested: String,
        /// The configured floor, humantime-formatted.
        minimum: String,
    },

    /// The request carried no justification.
    #[error("a reason is required for privilege requests")]
    ReasonRequired,
}

impl PolicyError {
    /// Creates a duration-too-long error.
    pub fn duration_too_long(requested: Duration, maximum: Duration) -> Self {
        Self::DurationTooLong {
            requested: humantime::format_duration(requested).to_string(),
            maximum: humantime::format_duration(maximum).to_string(),
        }
    }

    /// Creates a duration-too-short error.
    pub fn duration_too_short(requested: Duration, minimum: Duration) -> Self {
        Self::DurationTooShort {
            requested: humantime::format_duration(requested).to_string(),
            minimum: humantime::format_duration(minimum).to_string(),
        }
    }

    /// Returns the violated rule as a short identifier for logging.
    pub fn rule(&self) -> &'static str {
        match self {
            PolicyError::DurationTooLong { .. } => "max_duration",
            PolicyError::DurationTooShort { .. } => "min_duration",
            PolicyError::ReasonRequired => "reason_required",
        }
    }
}

// =============================================================================
// ModuleError
// =============================================================================

/// Errors produced by module operations (privileged actions, revocations,
/// health checks).
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The referenced grant (or other object) does not exist on the resource.
    ///
    /// Revocation callers treat this as success: the privilege is gone either
    /// way. Never retried.
    #[error("Not found: {what}")]
    NotFound {
        /// What was missing.
        what: String,
    },

    /// The resource is temporarily unreachable. Retryable.
    #[error("Transient failure: {message}")]
    Transient {
        /// Failure text.
        message: String,
        /// Underlying error, when available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation failed permanently.
    #[error("Operation failed: {message}")]
    Failed {
        /// Failure text.
        message: String,
    },

    /// The operation exceeded its deadline. Retryable.
    #[error("Operation timed out after {duration:?}")]
    Timeout {
        /// The deadline that was exceeded.
        duration: Duration,
    },

    /// The operation was cancelled before completion.
    ///
    /// Modules must fail fast on cancellation and leave no partially-applied
    /// privilege.
    #[error("Operation cancelled")]
    Cancelled,

    /// The module was used before `initialize` succeeded.
    #[error("Module '{module}' is not initialized")]
    NotInitialized {
        /// The module name.
        module: String,
    },
}

impl ModuleError {
    /// Creates a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error with a source.
    pub fn transient_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a permanent failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Creates a not-initialized error.
    pub fn not_initialized(module: impl Into<String>) -> Self {
        Self::NotInitialized { module: module.into() }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModuleError::Transient { .. } | ModuleError::Timeout { .. }
        )
    }

    /// Returns `true` if a revocation caller should treat this as success.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModuleError::NotFound { .. })
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ModuleError::NotFound { .. } => 404,
            ModuleError::Timeout { .. } => 504,
            ModuleError::Transient { .. } => 503,
            _ => 500,
        }
    }

    /// Returns the error type for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ModuleError::NotFound { .. } => "not_found",
            ModuleError::Transient { .. } => "transient",
            ModuleError::Failed { .. } => "failed",
            ModuleError::Timeout { .. } => "timeout",
            ModuleError::Cancelled => "cancelled",
            ModuleError::NotInitialized { .. } => "not_initialized",
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            ModuleError::NotFound { what } => format!("{}을(를) 찾을 수 없습니다", what),
            ModuleError::Transient { .. } => "리소스에 일시적으로 접근할 수 없습니다".to_string(),
            ModuleError::Failed { message } => format!("작업 실패: {}", message),
            ModuleError::Timeout { duration } => {
                format!("응답 시간 초과 ({:.1}초)", duration.as_secs_f64())
            }
            ModuleError::Cancelled => "작업이 취소되었습니다".to_string(),
            ModuleError::NotInitialized { module } => {
                format!("모듈이 초기화되지 않았습니다: {}", module)
            }
        }
    }

    /// Adds module context to the error message.
    pub fn with_module(self, module: &str) -> Self {
        match self {
            ModuleError::Transient { message, source } => ModuleError::Transient {
                message: format!("[{}] {}", module, message),
                source,
            },
            ModuleError::Failed { message } => ModuleError::Failed {
                message: format!("[{}] {}", module, message),
            },
            other => other,
        }
    }
}

// =============================================================================
// StoreError
// =============================================================================

/// Errors from the persisted record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given identifier exists. Never retried.
    #[error("Record not found: {id}")]
    NotFound {
        /// The missing record identifier.
        id: String,
    },

    /// A record with the given identifier already exists.
    #[error("Record already exists: {id}")]
    AlreadyExists {
        /// The duplicate record identifier.
        id: String,
    },

    /// A compare-and-set observed a different state than expected.
    ///
    /// Losers of the job claim race receive this.
    #[error("Conflict on '{id}': expected {expected}, found {actual}")]
    Conflict {
        /// The contended record identifier.
        id: String,
        /// The state the caller expected.
        expected: String,
        /// The state actually observed.
        actual: String,
    },

    /// The record is in a terminal state and must not be mutated.
    #[error("Record '{id}' is terminal ({status}) and cannot be modified")]
    Terminal {
        /// The record identifier.
        id: String,
        /// Its terminal status.
        status: String,
    },

    /// Backend failure. Retryable.
    #[error("Store backend error: {message}")]
    Backend {
        /// Failure text.
        message: String,
    },
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(id: impl fmt::Display) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Creates an already-exists error.
    pub fn already_exists(id: impl fmt::Display) -> Self {
        Self::AlreadyExists { id: id.to_string() }
    }

    /// Creates a compare-and-set conflict error.
    pub fn conflict(
        id: impl fmt::Display,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::Conflict {
            id: id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates a terminal-record error.
    pub fn terminal(id: impl fmt::Display, status: impl fmt::Display) -> Self {
        Self::Terminal {
            id: id.to_string(),
            status: status.to_string(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into() }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Backend { .. })
    }

    /// Returns `true` if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::NotFound { .. } => 404,
            StoreError::AlreadyExists { .. } | StoreError::Conflict { .. } => 409,
            StoreError::Terminal { .. } => 409,
            StoreError::Backend { .. } => 503,
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NotFound { id } => format!("레코드를 찾을 수 없습니다: {}", id),
            StoreError::AlreadyExists { id } => format!("이미 존재하는 레코드입니다: {}", id),
            StoreError::Conflict { id, .. } => format!("다른 작업과 충돌했습니다: {}", id),
            StoreError::Terminal { id, .. } => {
                format!("이미 완료된 레코드는 수정할 수 없습니다: {}", id)
            }
            StoreError::Backend { .. } => "저장소 오류가 발생했습니다".to_string(),
        }
    }
}

// =============================================================================
// LifecycleError
// =============================================================================

/// Privilege lifecycle state machine errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The request is not in the state the operation requires.
    #[error("Request '{id}' is {actual}, expected {expected}")]
    InvalidRequestState {
        /// The request identifier.
        id: String,
        /// The state required for the operation.
        expected: String,
        /// The state actually observed.
        actual: String,
    },

    /// No registered module handles the request's resource.
    #[error("No module handles resource '{resource_id}'")]
    NoModuleForResource {
        /// The unmatched resource identifier.
        resource_id: String,
    },

    /// Wrapped module error.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Wrapped store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    /// Creates an invalid-request-state error.
    pub fn invalid_request_state(
        id: impl fmt::Display,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::InvalidRequestState {
            id: id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates a no-module-for-resource error.
    pub fn no_module_for_resource(resource_id: impl Into<String>) -> Self {
        Self::NoModuleForResource {
            resource_id: resource_id.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            LifecycleError::Module(e) => e.is_retryable(),
            LifecycleError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            LifecycleError::InvalidRequestState { .. } => 409,
            LifecycleError::NoModuleForResource { .. } => 404,
            LifecycleError::Module(e) => e.status_code(),
            LifecycleError::Store(e) => e.status_code(),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            LifecycleError::InvalidRequestState { id, actual, .. } => {
                format!("요청 {}은(는) 이미 {} 상태입니다", id, actual)
            }
            LifecycleError::NoModuleForResource { resource_id } => {
                format!("리소스를 처리할 모듈이 없습니다: {}", resource_id)
            }
            LifecycleError::Module(e) => e.user_message(),
            LifecycleError::Store(e) => e.user_message(),
        }
    }
}

// =============================================================================
// TaskError
// =============================================================================

/// Background task scheduling errors.
#[derive(Debug, Error)]
pub enum TaskError {
    /// `start` was called while the task is already running.
    #[error("Task '{name}' is already running")]
    AlreadyRunning {
        /// The task name.
        name: String,
    },

    /// `stop` was called but the task was never started.
    #[error("Task '{name}' is not running")]
    NotRunning {
        /// The task name.
        name: String,
    },

    /// The task panicked or was aborted.
    #[error("Task '{name}' aborted: {message}")]
    Aborted {
        /// The task name.
        name: String,
        /// Abort detail.
        message: String,
    },
}

impl TaskError {
    /// Creates an already-running error.
    pub fn already_running(name: impl Into<String>) -> Self {
        Self::AlreadyRunning { name: name.into() }
    }

    /// Creates a not-running error.
    pub fn not_running(name: impl Into<String>) -> Self {
        Self::NotRunning { name: name.into() }
    }

    /// Creates an aborted error.
    pub fn aborted(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Aborted {
            name: name.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// A Result type with AegisError.
pub type AegisResult<T> = Result<T, AegisError>;

/// A Result type with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A Result type with RegistryError.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A Result type with ModuleError.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// A Result type with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// A Result type with LifecycleError.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

// =============================================================================
// Tests
// =============================================================================
