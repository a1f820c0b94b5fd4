// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # aegis-core
//!
//! Core abstractions for the AEGIS privilege escalation control plane.
//!
//! This crate provides the foundational types and machinery shared by the
//! control plane, operators, and resource modules:
//!
//! - **Types**: `PrivilegeRequest`, `PrivilegeGrant`, `Job`, `OperatorInfo`
//! - **Error**: unified error hierarchy with retryability and HTTP mapping
//! - **Module**: the resource module contract and capability traits
//! - **Registry**: case-insensitive module registry
//! - **Policy**: pluggable rule engine evaluated before approval
//! - **Lifecycle**: the request → grant state machine with expiry sweep
//! - **Jobs**: pull-based job queue with compare-and-set claim
//! - **Health**: module health aggregation and operator liveness
//! - **Store**: CRUD + CAS persistence traits (implemented in `aegis-store`)
//! - **Task**: periodic background loops with explicit start/stop
//!
//! ## Example
//!
//! ```rust,ignore
//! use aegis_core::lifecycle::{NewPrivilegeRequest, PrivilegeService};
//! use aegis_core::policy::StandardRuleEngine;
//! use aegis_core::registry::ModuleRegistry;
//!
//! let registry = Arc::new(ModuleRegistry::new());
//! registry.register(Arc::new(MysqlModule::new()))?;
//!
//! let service = PrivilegeService::new(store, registry, Arc::new(StandardRuleEngine::default()));
//! let request = service.submit(new_request).await?;
//! let grant = service.approve(&request.id, "admin").await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod types;

// =============================================================================
// Module Contract & Registry
// =============================================================================

pub mod module;
pub mod registry;

// =============================================================================
// Control Plane Machinery
// =============================================================================

pub mod health;
pub mod jobs;
pub mod lifecycle;
pub mod policy;
pub mod store;
pub mod task;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::{
    AegisError, AegisResult, ConfigError, ConfigResult, LifecycleError, LifecycleResult,
    ModuleError, ModuleResult, PolicyError, RegistryError, RegistryResult, StoreError,
    StoreResult, TaskError,
};

pub use types::{
    GrantId, GrantStatus, Job, JobId, JobStatus, Metadata, OperatorId, OperatorInfo,
    OperatorStatus, PrivilegeGrant, PrivilegeLevel, PrivilegeRequest, RequestId, RequestStatus,
    ServerInfo,
};

pub use module::{
    with_deadline, Module, ModuleConfig, OperatorRegistrar, Pinger, PingRequest, ServerLister,
};

pub use registry::ModuleRegistry;

pub use policy::{RuleEngine, StandardRuleEngine};

pub use lifecycle::{NewPrivilegeRequest, PrivilegeService, SweepReport};

pub use jobs::JobQueue;

pub use health::{HealthAggregator, HealthReport, HealthState, OperatorTracker};

pub use store::{GrantStore, JobStore, OperatorStore, PrivilegeStore, RequestStore, StateStore};

pub use task::PeriodicTask;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
