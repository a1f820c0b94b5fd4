// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mock module implementations.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use aegis_core::error::{ConfigError, ModuleError};
use aegis_core::module::{Module, ModuleConfig, PingRequest, Pinger};
use aegis_core::types::{GrantId, Metadata, PrivilegeRequest};

// =============================================================================
// MockModule
// =============================================================================

/// A configurable in-memory module.
///
/// Failure modes are toggled at runtime so a single instance can drive a
/// scenario through healthy and degraded phases. Grants record a `username`
/// in the request metadata, which revocation requires — mirroring the real
/// modules' reversal contract.
pub struct MockModule {
    name: String,
    fail_grants: AtomicBool,
    fail_revokes: AtomicBool,
    fail_health: AtomicBool,
    grant_calls: AtomicUsize,
    revoke_calls: AtomicUsize,
    hostname: String,
}

impl MockModule {
    /// Creates a healthy mock named `mysql`.
    pub fn new() -> Arc<Self> {
        Self::named("mysql")
    }

    /// Creates a healthy mock with the given name.
    pub fn named(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            fail_grants: AtomicBool::new(false),
            fail_revokes: AtomicBool::new(false),
            fail_health: AtomicBool::new(false),
            grant_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            hostname: "myhost.local".to_string(),
        })
    }

    /// Makes privilege grants fail transiently.
    pub fn set_fail_grants(&self, fail: bool) {
        self.fail_grants.store(fail, Ordering::SeqCst);
    }

    /// Makes revocations fail transiently.
    pub fn set_fail_revokes(&self, fail: bool) {
        self.fail_revokes.store(fail, Ordering::SeqCst);
    }

    /// Makes health checks fail.
    pub fn set_fail_health(&self, fail: bool) {
        self.fail_health.store(fail, Ordering::SeqCst);
    }

    /// Number of grant attempts observed.
    pub fn grant_calls(&self) -> usize {
        self.grant_calls.load(Ordering::SeqCst)
    }

    /// Number of revoke attempts observed.
    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Module for MockModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> &str {
        "configurable mock module"
    }

    fn validate_config(&self, _config: &ModuleConfig) -> Result<(), ConfigError> {
        Ok(())
    }

    async fn initialize(&self, _config: &ModuleConfig) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn handle_privilege_request(
        &self,
        request: &mut PrivilegeRequest,
    ) -> Result<(), ModuleError> {
        self.grant_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_grants.load(Ordering::SeqCst) {
            return Err(ModuleError::transient("resource unreachable"));
        }

        request.metadata.insert(
            "username".to_string(),
            serde_json::Value::String(format!("aegis_{}", request.user_id)),
        );
        Ok(())
    }

    async fn revoke_privilege(
        &self,
        grant_id: &GrantId,
        metadata: &Metadata,
    ) -> Result<(), ModuleError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_revokes.load(Ordering::SeqCst) {
            return Err(ModuleError::transient("resource unreachable"));
        }
        if !metadata.contains_key("username") {
            return Err(ModuleError::not_found(format!("grant {}", grant_id)));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ModuleError> {
        if self.fail_health.load(Ordering::SeqCst) {
            Err(ModuleError::transient("connection refused"))
        } else {
            Ok(())
        }
    }

    fn as_pinger(&self) -> Option<&dyn Pinger> {
        Some(self)
    }
}

#[async_trait]
impl Pinger for MockModule {
    async fn ping(&self, _request: &PingRequest) -> Result<String, ModuleError> {
        if self.fail_health.load(Ordering::SeqCst) {
            return Err(ModuleError::transient("connection refused"));
        }
        Ok(self.hostname.clone())
    }
}
