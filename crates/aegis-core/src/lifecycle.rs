// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Privilege lifecycle management.
//!
//! This module turns requests into grants and tracks them to expiry:
//!
//! ```text
//! Pending ──policy ok, module ok──▶ Approved ──▶ Grant{Active}
//!    │                                               │
//!    ├─policy violation──▶ Denied                    ├─expiry──▶ Expired ─┐
//!    └─module failure────▶ Failed                    └─revoke──▶ Revoked ◀┘
//! ```
//!
//! Invariants upheld here:
//!
//! - A grant is created only after the target module reported success, and
//!   exactly once per approved request.
//! - Revocation is idempotent: a module-side `NotFound` counts as success.
//! - The sweep never revokes a grant before its expiry, and keeps retrying
//!   expired grants across cycles until revocation succeeds.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{LifecycleError, LifecycleResult, StoreError};
use crate::module::{with_deadline, Module};
use crate::policy::RuleEngine;
use crate::registry::ModuleRegistry;
use crate::store::PrivilegeStore;
use crate::task::PeriodicTask;
use crate::types::{
    GrantId, GrantStatus, Metadata, PrivilegeGrant, PrivilegeLevel, PrivilegeRequest, RequestId,
    RequestStatus,
};

// =============================================================================
// NewPrivilegeRequest
// =============================================================================

/// Caller-supplied fields for a new privilege request.
#[derive(Debug, Clone)]
pub struct NewPrivilegeRequest {
    /// The user asking for elevated access.
    pub user_id: String,
    /// The resource the access applies to.
    pub resource_id: String,
    /// Requested privilege level.
    pub level: PrivilegeLevel,
    /// Free-form justification.
    pub reason: String,
    /// How long the privilege should last.
    pub duration: Duration,
}

// =============================================================================
// SweepReport
// =============================================================================

/// Outcome of one sweep cycle.
///
/// Failures are aggregated per grant and never abort the batch; they are
/// retried on the next cycle.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Grants examined this cycle.
    pub examined: usize,
    /// Grants successfully revoked.
    pub revoked: usize,
    /// Grants whose revocation failed, with the error text.
    pub failed: Vec<(GrantId, String)>,
}

// =============================================================================
// PrivilegeService
// =============================================================================

/// The privilege lifecycle manager.
///
/// Owns the request/grant state machine. All request mutations go through
/// this service; callers only ever create requests and observe them.
pub struct PrivilegeService {
    store: Arc<dyn PrivilegeStore>,
    registry: Arc<ModuleRegistry>,
    rules: Arc<dyn RuleEngine>,
    operation_timeout: Duration,
}

impl PrivilegeService {
    /// Creates a new lifecycle manager.
    pub fn new(
        store: Arc<dyn PrivilegeStore>,
        registry: Arc<ModuleRegistry>,
        rules: Arc<dyn RuleEngine>,
    ) -> Self {
        Self {
            store,
            registry,
            rules,
            operation_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the deadline applied to individual module operations.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    // =========================================================================
    // Submit
    // =========================================================================

    /// Submits a new privilege request.
    ///
    /// The rule engine is evaluated before any side effect. On violation the
    /// request is stored as `Denied` with the violated rule recorded, and is
    /// returned to the caller — a policy rejection is an answer, not an
    /// error.
    pub async fn submit(&self, new: NewPrivilegeRequest) -> LifecycleResult<PrivilegeRequest> {
        let mut request = PrivilegeRequest::new(
            new.user_id,
            new.resource_id,
            new.level,
            new.reason,
            new.duration,
        );

        match self.rules.evaluate(&request) {
            Ok(()) => {
                info!(
                    request_id = %request.id,
                    user_id = %request.user_id,
                    resource_id = %request.resource_id,
                    level = %request.level,
                    "Privilege request submitted"
                );
            }
            Err(policy) => {
                warn!(
                    request_id = %request.id,
                    rule = policy.rule(),
                    "Privilege request denied by policy"
                );
                request.status = RequestStatus::Denied;
                request.status_reason = Some(policy.to_string());
            }
        }

        self.store.insert_request(request.clone()).await?;
        Ok(request)
    }

    // =========================================================================
    // Approve
    // =========================================================================

    /// Approves a pending request and applies the privilege.
    ///
    /// Invokes the target module; on success the request becomes `Approved`
    /// and exactly one grant is created with
    /// `expires_at = granted_at + duration`. On module failure the request
    /// becomes `Failed` and **no** grant is created — a privilege is never
    /// left half-applied.
    pub async fn approve(
        &self,
        request_id: &RequestId,
        approver: &str,
    ) -> LifecycleResult<PrivilegeGrant> {
        let mut request = self.store.get_request(request_id).await?;

        if request.status != RequestStatus::Pending {
            return Err(LifecycleError::invalid_request_state(
                request_id,
                RequestStatus::Pending,
                request.status,
            ));
        }

        let module = self.module_for(&request.resource_id)?;

        let outcome = with_deadline(
            self.operation_timeout,
            module.handle_privilege_request(&mut request),
        )
        .await;

        if let Err(err) = outcome {
            let err = err.with_module(module.name());
            warn!(
                request_id = %request.id,
                module = module.name(),
                error = %err,
                "Module failed to apply privilege"
            );

            request.status = RequestStatus::Failed;
            request.status_reason = Some(err.to_string());
            self.store.update_request(request).await?;

            return Err(err.into());
        }

        let granted_at = Utc::now();
        let grant = PrivilegeGrant {
            id: GrantId::generate(),
            request_id: request.id.clone(),
            user_id: request.user_id.clone(),
            resource_id: request.resource_id.clone(),
            level: request.level,
            granted_at,
            expires_at: expiry_of(granted_at, request.duration),
            granted_by: approver.to_string(),
            status: GrantStatus::Active,
        };

        request.status = RequestStatus::Approved;
        request.approved_by = Some(approver.to_string());
        request.approved_at = Some(granted_at);

        self.store.insert_grant(grant.clone()).await?;
        self.store.update_request(request).await?;

        info!(
            request_id = %grant.request_id,
            grant_id = %grant.id,
            module = module.name(),
            expires_at = %grant.expires_at,
            "Privilege granted"
        );

        Ok(grant)
    }

    // =========================================================================
    // Revoke
    // =========================================================================

    /// Revokes a grant.
    ///
    /// Reads the reversal metadata back from the originating request and
    /// hands it to the module. A module-side `NotFound` — the privilege is
    /// already gone — counts as success. Any other module error leaves the
    /// grant in place and is surfaced as retryable.
    ///
    /// Revoking an already-revoked grant reports success.
    pub async fn revoke(&self, grant_id: &GrantId) -> LifecycleResult<PrivilegeGrant> {
        let mut grant = self.store.get_grant(grant_id).await?;

        if grant.status == GrantStatus::Revoked {
            debug!(grant_id = %grant_id, "Grant already revoked");
            return Ok(grant);
        }

        let module = self.module_for(&grant.resource_id)?;
        let metadata = self.reversal_metadata(&grant).await;

        let outcome = with_deadline(
            self.operation_timeout,
            module.revoke_privilege(grant_id, &metadata),
        )
        .await;

        match outcome {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!(grant_id = %grant_id, "Module reports grant already gone");
            }
            Err(err) => {
                let err = err.with_module(module.name());
                warn!(grant_id = %grant_id, error = %err, "Revocation failed");
                return Err(err.into());
            }
        }

        grant.status = GrantStatus::Revoked;
        self.store.update_grant(grant.clone()).await?;

        info!(grant_id = %grant_id, user_id = %grant.user_id, "Privilege revoked");
        Ok(grant)
    }

    // =========================================================================
    // Sweep
    // =========================================================================

    /// Runs one sweep cycle over grants due for revocation.
    ///
    /// Grants are never touched before their expiry. Each expired grant is
    /// first marked `Expired` (so partial progress is observable), then
    /// revoked; failures are collected and retried on the next cycle.
    pub async fn sweep_expired_once(&self) -> LifecycleResult<SweepReport> {
        let now = Utc::now();
        let due = self.store.grants_due_for_revocation(now).await?;

        let mut report = SweepReport {
            examined: due.len(),
            ..SweepReport::default()
        };

        for mut grant in due {
            if grant.status == GrantStatus::Active {
                grant.status = GrantStatus::Expired;
                if let Err(err) = self.store.update_grant(grant.clone()).await {
                    warn!(grant_id = %grant.id, error = %err, "Failed to mark grant expired");
                    report.failed.push((grant.id.clone(), err.to_string()));
                    continue;
                }
            }

            match self.revoke(&grant.id).await {
                Ok(_) => report.revoked += 1,
                Err(err) => {
                    warn!(
                        grant_id = %grant.id,
                        error = %err,
                        retryable = err.is_retryable(),
                        "Sweep failed to revoke grant; will retry next cycle"
                    );
                    report.failed.push((grant.id.clone(), err.to_string()));
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                revoked = report.revoked,
                failed = report.failed.len(),
                "Sweep cycle complete"
            );
        }

        Ok(report)
    }

    /// Starts the periodic sweep as a background task.
    ///
    /// The returned task owns the schedule; call
    /// [`PeriodicTask::stop`] to halt it (blocking until any in-flight
    /// cycle finishes).
    pub fn spawn_sweep(self: &Arc<Self>, interval: Duration) -> PeriodicTask {
        let task = PeriodicTask::new("grant-sweep", interval);
        let service = Arc::clone(self);

        // Start cannot fail on a freshly created task.
        let _ = task.start(move || {
            let service = Arc::clone(&service);
            async move {
                if let Err(err) = service.sweep_expired_once().await {
                    warn!(error = %err, "Sweep cycle errored");
                }
            }
        });

        task
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fetches a request by id.
    pub async fn get_request(&self, id: &RequestId) -> LifecycleResult<PrivilegeRequest> {
        Ok(self.store.get_request(id).await?)
    }

    /// Fetches a grant by id.
    pub async fn get_grant(&self, id: &GrantId) -> LifecycleResult<PrivilegeGrant> {
        Ok(self.store.get_grant(id).await?)
    }

    /// Lists requests still awaiting approval.
    pub async fn pending_requests(&self) -> LifecycleResult<Vec<PrivilegeRequest>> {
        Ok(self.store.pending_requests().await?)
    }

    /// Lists non-revoked grants held by a user.
    pub async fn active_grants(&self, user_id: &str) -> LifecycleResult<Vec<PrivilegeGrant>> {
        Ok(self.store.active_grants_for_user(user_id).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn module_for(&self, resource_id: &str) -> LifecycleResult<Arc<dyn Module>> {
        self.registry
            .module_for_resource(resource_id)
            .ok_or_else(|| LifecycleError::no_module_for_resource(resource_id))
    }

    /// Reads the module-written reversal metadata back from the originating
    /// request. A missing request yields empty metadata; the module then
    /// reports `NotFound`, which revocation treats as success.
    async fn reversal_metadata(&self, grant: &PrivilegeGrant) -> Metadata {
        match self.store.get_request(&grant.request_id).await {
            Ok(request) => request.metadata,
            Err(StoreError::NotFound { .. }) => {
                warn!(
                    grant_id = %grant.id,
                    request_id = %grant.request_id,
                    "Originating request missing; revoking with empty metadata"
                );
                Metadata::new()
            }
            Err(err) => {
                warn!(grant_id = %grant.id, error = %err, "Failed to load reversal metadata");
                Metadata::new()
            }
        }
    }
}

/// Computes `granted_at + duration`, clamping durations past the timestamp
/// range to the far future.
fn expiry_of(granted_at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|lifetime| granted_at.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// =============================================================================
// Tests
// =============================================================================
