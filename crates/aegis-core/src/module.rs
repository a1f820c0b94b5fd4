// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Module contract for resource-specific privilege handling.
//!
//! This module defines the [`Module`] trait that all resource modules must
//! implement, giving the control plane a unified lifecycle for privileges
//! without any resource-specific knowledge.
//!
//! # Design Principles
//!
//! - **Resource Agnostic**: All modules implement the same interface
//! - **Async First**: All privileged operations are asynchronous
//! - **Thread Safe**: Modules are `Send + Sync` for concurrent calls
//! - **Capability Probing**: Optional features are separate traits that a
//!   module may additionally expose — callers never downcast to concrete
//!   module types
//!
//! # Lifecycle
//!
//! 1. Register the module in a [`ModuleRegistry`](crate::registry::ModuleRegistry)
//! 2. `validate_config()` at config-load time (standalone, side-effect free)
//! 3. `initialize()` once at startup — fatal on missing required fields
//! 4. `handle_privilege_request()` / `revoke_privilege()` during operation
//! 5. `health_check()` continuously, bounded by a caller deadline

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ModuleError};
use crate::types::{GrantId, Metadata, OperatorId, PrivilegeRequest, ServerInfo};

// =============================================================================
// Module Configuration
// =============================================================================

/// Configuration handed to a module at startup.
///
/// The `settings` payload is a free-form map whose keys vary by module kind;
/// the module itself decodes and validates it. The typed, load-time-checked
/// representation lives in `aegis-config` and is serialized into this shape
/// before wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Name of the module this configuration targets.
    pub module: String,
    /// Module-specific settings.
    pub settings: serde_json::Value,
    /// Deadline applied to individual module operations.
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub operation_timeout: Duration,
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(5)
}

impl ModuleConfig {
    /// Creates a configuration from a module name and settings value.
    pub fn new(module: impl Into<String>, settings: serde_json::Value) -> Self {
        Self {
            module: module.into(),
            settings,
            operation_timeout: default_operation_timeout(),
        }
    }
}

// =============================================================================
// Ping Request
// =============================================================================

/// Payload of an asynchronous ping job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRequest {
    /// Name of the server to ping.
    pub server: String,
}

// =============================================================================
// Module Trait
// =============================================================================

/// The contract every resource module implements.
///
/// A module owns all resource-specific logic for one resource kind (a
/// database engine, a cluster, ...). The control plane only ever speaks this
/// interface.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the control plane and operator
/// loops call them concurrently. Mutable module state belongs behind interior
/// locks.
///
/// # Cancellation
///
/// Callers bound each operation with a deadline (`tokio::time::timeout`).
/// On cancellation a module must fail fast and leave the privilege either
/// fully applied or not applied — never partial.
#[async_trait]
pub trait Module: Send + Sync {
    /// Returns the unique name of the module (matched case-insensitively).
    fn name(&self) -> &str;

    /// Returns a human-readable description of the module.
    fn describe(&self) -> &str;

    /// Validates a configuration without side effects.
    ///
    /// Usable standalone, before [`initialize`](Module::initialize) — the
    /// config loader calls this for every enabled module so that missing
    /// required fields surface at load time.
    fn validate_config(&self, config: &ModuleConfig) -> Result<(), ConfigError>;

    /// Initializes the module with its configuration.
    ///
    /// Called once at startup. Fails fatally on missing required fields
    /// (host, port, user, secret, ...).
    async fn initialize(&self, config: &ModuleConfig) -> Result<(), ModuleError>;

    /// Performs the privileged action described by `request`.
    ///
    /// On success the module MUST populate `request.metadata` with everything
    /// required to reverse the action later (generated credential name and
    /// secret, created object identifiers). That metadata is the sole record
    /// used for revocation.
    async fn handle_privilege_request(
        &self,
        request: &mut PrivilegeRequest,
    ) -> Result<(), ModuleError>;

    /// Reverses a previously applied privilege.
    ///
    /// `metadata` is the map the module wrote in
    /// [`handle_privilege_request`](Module::handle_privilege_request), read
    /// back from the originating request by the lifecycle manager.
    ///
    /// Must be idempotent: revoking an already-revoked or unknown grant
    /// returns [`ModuleError::NotFound`], which callers treat as success.
    async fn revoke_privilege(
        &self,
        grant_id: &GrantId,
        metadata: &Metadata,
    ) -> Result<(), ModuleError>;

    /// Cheap liveness probe.
    ///
    /// Bounded by a caller-supplied deadline; implementations should avoid
    /// expensive work here.
    async fn health_check(&self) -> Result<(), ModuleError>;

    // =========================================================================
    // Capability Probing
    // =========================================================================

    /// Returns the ping capability, if this module supports it.
    fn as_pinger(&self) -> Option<&dyn Pinger> {
        None
    }

    /// Returns the server listing capability, if this module supports it.
    fn as_server_lister(&self) -> Option<&dyn ServerLister> {
        None
    }

    /// Returns the operator registration capability, if supported.
    fn as_operator_registrar(&self) -> Option<&dyn OperatorRegistrar> {
        None
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Capability: respond to asynchronous ping jobs.
#[async_trait]
pub trait Pinger: Send + Sync {
    /// Pings the named server and returns its reported hostname.
    async fn ping(&self, request: &PingRequest) -> Result<String, ModuleError>;
}

/// Capability: enumerate the resource servers the module knows about.
#[async_trait]
pub trait ServerLister: Send + Sync {
    /// Lists registered servers.
    async fn list_servers(&self) -> Result<Vec<ServerInfo>, ModuleError>;

    /// Registers or refreshes a server record.
    async fn register_server(&self, server: ServerInfo) -> Result<(), ModuleError>;

    /// Marks a server inactive so it stops appearing in listings.
    async fn mark_server_inactive(&self, name: &str) -> Result<(), ModuleError>;
}

/// Capability: mirror operator registrations into the backing resource.
#[async_trait]
pub trait OperatorRegistrar: Send + Sync {
    /// Records a newly registered operator.
    async fn register_operator(&self, id: &OperatorId) -> Result<(), ModuleError>;

    /// Marks an operator inactive.
    async fn mark_operator_inactive(&self, id: &OperatorId) -> Result<(), ModuleError>;
}

// =============================================================================
// Deadline Helper
// =============================================================================

/// Runs a module operation under a deadline.
///
/// Times out with [`ModuleError::Timeout`]; the module never observes the
/// cancellation beyond its future being dropped.
pub async fn with_deadline<T, F>(deadline: Duration, op: F) -> Result<T, ModuleError>
where
    F: std::future::Future<Output = Result<T, ModuleError>>,
{
    match tokio::time::timeout(deadline, op).await {
        Ok(result) => result,
        Err(_) => Err(ModuleError::timeout(deadline)),
    }
}

// =============================================================================
// Tests
// =============================================================================
