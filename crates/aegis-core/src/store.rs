// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Persisted record store interfaces.
//!
//! The control plane keeps request, grant, job, and operator records behind
//! these traits. The core only needs CRUD, a compare-and-set primitive on job
//! status, and range queries by status/expiry — the storage engine's
//! internals are a separate concern (see `aegis-store` for the in-memory
//! implementation).
//!
//! # Concurrency
//!
//! Implementations must linearize mutations per record: there must be no
//! lost update between "observe pending" and "mark claimed/terminal". The
//! job claim step specifically requires the compare-and-set in
//! [`JobStore::compare_and_set_job_status`]; FIFO read order is advisory
//! fairness only and never a substitute for it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::types::{
    GrantId, Job, JobId, JobStatus, OperatorId, OperatorInfo, PrivilegeGrant, PrivilegeRequest,
    RequestId,
};

// =============================================================================
// RequestStore
// =============================================================================

/// Persistence for privilege requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Inserts a new request. Fails with `AlreadyExists` on duplicate ids.
    async fn insert_request(&self, request: PrivilegeRequest) -> StoreResult<()>;

    /// Fetches a request by id. Fails with `NotFound`.
    async fn get_request(&self, id: &RequestId) -> StoreResult<PrivilegeRequest>;

    /// Replaces an existing request record. Fails with `NotFound`.
    async fn update_request(&self, request: PrivilegeRequest) -> StoreResult<()>;

    /// Lists requests still awaiting approval, in creation order.
    async fn pending_requests(&self) -> StoreResult<Vec<PrivilegeRequest>>;
}

// =============================================================================
// GrantStore
// =============================================================================

/// Persistence for privilege grants.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Inserts a new grant. Fails with `AlreadyExists` on duplicate ids.
    async fn insert_grant(&self, grant: PrivilegeGrant) -> StoreResult<()>;

    /// Fetches a grant by id. Fails with `NotFound`.
    async fn get_grant(&self, id: &GrantId) -> StoreResult<PrivilegeGrant>;

    /// Replaces an existing grant record. Fails with `NotFound`.
    async fn update_grant(&self, grant: PrivilegeGrant) -> StoreResult<()>;

    /// Lists non-revoked grants held by a user.
    async fn active_grants_for_user(&self, user_id: &str) -> StoreResult<Vec<PrivilegeGrant>>;

    /// Range query: grants that still need revocation and whose expiry is at
    /// or before `now`. Feeds the sweep.
    async fn grants_due_for_revocation(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<PrivilegeGrant>>;
}

// =============================================================================
// JobStore
// =============================================================================

/// Persistence for asynchronous jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new job. Fails with `AlreadyExists` on duplicate ids.
    async fn insert_job(&self, job: Job) -> StoreResult<()>;

    /// Fetches a job by id. Fails with `NotFound`.
    async fn get_job(&self, id: &JobId) -> StoreResult<Job>;

    /// Lists pending jobs in creation order.
    async fn pending_jobs(&self) -> StoreResult<Vec<Job>>;

    /// Atomically transitions a job's status from `from` to `to`.
    ///
    /// This is the claim primitive: exactly one caller racing
    /// `pending → claimed` wins; losers receive `Conflict` with the observed
    /// status.
    async fn compare_and_set_job_status(
        &self,
        id: &JobId,
        from: JobStatus,
        to: JobStatus,
    ) -> StoreResult<()>;

    /// Records a job's terminal outcome.
    ///
    /// Fails with `Terminal` if the job already reached a terminal status —
    /// a terminal result/error, once set, is immutable.
    async fn finish_job(
        &self,
        id: &JobId,
        status: JobStatus,
        result: String,
        error: String,
    ) -> StoreResult<Job>;
}

// =============================================================================
// OperatorStore
// =============================================================================

/// Persistence for operator liveness records.
#[async_trait]
pub trait OperatorStore: Send + Sync {
    /// Registers an operator, or re-activates and refreshes an existing one.
    async fn upsert_operator(&self, info: OperatorInfo) -> StoreResult<()>;

    /// Fetches an operator record. Fails with `NotFound`.
    async fn get_operator(&self, id: &OperatorId) -> StoreResult<OperatorInfo>;

    /// Records a heartbeat. Fails with `NotFound` for unknown operators.
    async fn record_heartbeat(&self, id: &OperatorId, at: DateTime<Utc>) -> StoreResult<()>;

    /// Lists all operators, most recently registered first.
    async fn list_operators(&self) -> StoreResult<Vec<OperatorInfo>>;

    /// Range query: active operators whose last heartbeat is before `cutoff`.
    async fn operators_silent_since(&self, cutoff: DateTime<Utc>)
        -> StoreResult<Vec<OperatorInfo>>;

    /// Marks an operator inactive. Fails with `NotFound`.
    async fn mark_operator_inactive(&self, id: &OperatorId) -> StoreResult<()>;
}

// =============================================================================
// Combined Store
// =============================================================================

/// Convenience supertrait for backends implementing every table.
pub trait StateStore: RequestStore + GrantStore + JobStore + OperatorStore {}

impl<T> StateStore for T where T: RequestStore + GrantStore + JobStore + OperatorStore {}

/// Convenience supertrait for the privilege lifecycle (requests + grants).
pub trait PrivilegeStore: RequestStore + GrantStore {}

impl<T> PrivilegeStore for T where T: RequestStore + GrantStore {}
