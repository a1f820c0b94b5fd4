// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime orchestration.
//!
//! Wires configuration into running processes:
//!
//! - [`ControlPlaneRuntime`]: module registry, store, lifecycle manager,
//!   job queue, health aggregation, expiry sweep, and the API server
//! - [`OperatorRuntime`]: module registry, control plane client, poll and
//!   heartbeat loops, and the local server
//!
//! Both initialize modules strictly before serving traffic, so a
//! misconfigured module fails the process at startup instead of at first
//! use. Shutdown stops the servers first, then blocks on the background
//! tasks until their in-flight iteration finishes.

use std::sync::Arc;

use tracing::{info, warn};

use aegis_api::{ApiConfig, ApiServerBuilder};
use aegis_config::AegisConfig;
use aegis_core::module::Module;
use aegis_core::policy::StandardRuleEngine;
use aegis_core::registry::ModuleRegistry;
use aegis_core::types::OperatorId;
use aegis_core::{HealthAggregator, JobQueue, OperatorTracker, PrivilegeService};
use aegis_kubernetes::KubernetesModule;
use aegis_mysql::MysqlModule;
use aegis_operator::{ControlPlaneClient, JobDispatcher, OperatorAgent, OperatorServer};
use aegis_store::MemoryStore;

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// Module Wiring
// =============================================================================

/// Instantiates a module by its configured kind.
pub(crate) fn module_instance(name: &str) -> BinResult<Arc<dyn Module>> {
    match name.to_ascii_lowercase().as_str() {
        "mysql" => Ok(Arc::new(MysqlModule::new())),
        "kubernetes" => Ok(Arc::new(KubernetesModule::new())),
        other => Err(BinError::config(format!("unknown module kind '{}'", other))),
    }
}

/// Builds and initializes the enabled modules.
///
/// Every enabled module is registered, its settings validated, and its
/// `initialize` run to completion. Any failure aborts startup.
pub async fn build_modules(
    config: &AegisConfig,
) -> BinResult<(Arc<ModuleRegistry>, Vec<Arc<dyn Module>>)> {
    let registry = Arc::new(ModuleRegistry::new());

    let names: Vec<&str> = config
        .enabled_modules
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(BinError::config("no modules enabled"));
    }

    for name in &names {
        let module = module_instance(name)?;
        let module_config = config.module_config(name)?;

        module.validate_config(&module_config)?;
        module.initialize(&module_config).await?;
        registry.register(module)?;

        info!(module = %name, "Module initialized");
    }

    let enabled = registry.enabled_modules(&config.enabled_modules)?;
    Ok((registry, enabled))
}

// =============================================================================
// ControlPlaneRuntime
// =============================================================================

/// The control plane process.
pub struct ControlPlaneRuntime {
    config: AegisConfig,
    shutdown: ShutdownCoordinator,
    sweep_enabled: bool,
}

impl ControlPlaneRuntime {
    /// Creates a runtime from a loaded configuration.
    pub fn new(config: AegisConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
            sweep_enabled: true,
        }
    }

    /// Enables or disables the expiry sweep.
    pub fn with_sweep(mut self, enabled: bool) -> Self {
        self.sweep_enabled = enabled;
        self
    }

    /// Returns a handle for initiating shutdown externally.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Runs the control plane until shutdown is signaled.
    pub async fn run(self) -> BinResult<()> {
        info!("Starting AEGIS control plane v{}", aegis_core::VERSION);

        let (registry, enabled) = build_modules(&self.config).await?;

        let store = Arc::new(MemoryStore::new());
        let policy = &self.config.control_plane.policy;
        let rules = StandardRuleEngine::new(policy.min_duration, policy.max_duration);

        let service = Arc::new(PrivilegeService::new(
            store.clone(),
            registry.clone(),
            Arc::new(rules),
        ));
        let jobs = Arc::new(JobQueue::new(store.clone()));
        let health = Arc::new(
            HealthAggregator::new(enabled)
                .with_check_timeout(self.config.control_plane.health_check_timeout),
        );
        let operators = Arc::new(OperatorTracker::new(store));

        let sweep = if self.sweep_enabled {
            Some(service.spawn_sweep(self.config.control_plane.sweep_interval))
        } else {
            warn!("Expiry sweep disabled; grants will only be revoked explicitly");
            None
        };

        let server = ApiServerBuilder::new()
            .config(ApiConfig {
                bind_address: self.config.control_plane.bind_address.clone(),
                port: self.config.control_plane.port,
                request_timeout: self.config.control_plane.request_timeout,
            })
            .registry(registry)
            .service(service)
            .jobs(jobs)
            .health(health)
            .operators(operators)
            .build()?;

        let signals = self.shutdown.clone();
        tokio::spawn(async move { signals.listen_for_signals().await });

        info!(addr = %server.addr(), "AEGIS control plane is ready");
        let result = server.run_with_shutdown(self.shutdown.signalled()).await;

        // The server has stopped accepting work; now drain the sweep so no
        // in-flight revocation is abandoned.
        if let Some(sweep) = sweep {
            sweep.stop().await?;
        }

        info!("AEGIS control plane shutdown complete");
        result.map_err(Into::into)
    }
}

// =============================================================================
// OperatorRuntime
// =============================================================================

/// An operator agent process.
pub struct OperatorRuntime {
    config: AegisConfig,
    shutdown: ShutdownCoordinator,
}

impl OperatorRuntime {
    /// Creates a runtime from a loaded configuration.
    pub fn new(config: AegisConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns a handle for initiating shutdown externally.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Runs the operator until shutdown is signaled.
    pub async fn run(self) -> BinResult<()> {
        let operator_id = OperatorId::new(self.config.operator.effective_id());
        info!(
            operator_id = %operator_id,
            control_plane = %self.config.operator.control_plane_url,
            "Starting AEGIS operator v{}",
            aegis_core::VERSION
        );

        let (registry, enabled) = build_modules(&self.config).await?;

        let client = ControlPlaneClient::new(&self.config.operator.control_plane_url);
        let agent = Arc::new(OperatorAgent::new(
            operator_id,
            client,
            JobDispatcher::new(registry.clone()),
        ));

        // A cold control plane is not fatal; the first successful heartbeat
        // re-registers through the upsert path.
        if let Err(err) = agent.register().await {
            warn!(error = %err, "Registration failed; continuing and retrying via heartbeat");
        }

        let poll = agent.spawn_poll(self.config.operator.poll_interval);
        let heartbeat = agent.spawn_heartbeat(self.config.operator.heartbeat_interval);

        let health = Arc::new(HealthAggregator::new(enabled));
        let server = OperatorServer::new(registry, health, self.config.operator.port);

        let signals = self.shutdown.clone();
        tokio::spawn(async move { signals.listen_for_signals().await });

        info!(addr = %server.addr(), "AEGIS operator is ready");
        let result = server.run_with_shutdown(self.shutdown.signalled()).await;

        // Stop scheduling new cycles, then wait for any in-flight job or
        // heartbeat to finish.
        poll.stop().await?;
        heartbeat.stop().await?;

        info!("AEGIS operator shutdown complete");
        result.map_err(Into::into)
    }
}

// =============================================================================
// Tests
// =============================================================================
