// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory record store.
//!
//! A thread-safe implementation of every `aegis-core` store trait, intended
//! for development, testing, and single-node deployments.
//!
//! # Design
//!
//! - **Per-table locking**: each table sits behind its own
//!   `parking_lot::RwLock`; mutations on a record are linearized by the
//!   table lock, which is sufficient at this scale.
//! - **Compare-and-set**: the job claim transition re-checks the observed
//!   status under the write lock, so exactly one racer wins.
//! - **FIFO listings**: insertion order is kept in a side vector so pending
//!   jobs and requests list in creation order.
//! - **O(1) statistics**: counters use atomics, never table scans.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aegis_core::error::{StoreError, StoreResult};
use aegis_core::store::{GrantStore, JobStore, OperatorStore, RequestStore};
use aegis_core::types::{
    GrantId, Job, JobId, JobStatus, OperatorId, OperatorInfo, OperatorStatus, PrivilegeGrant,
    PrivilegeRequest, RequestId, RequestStatus,
};

// =============================================================================
// Store Statistics
// =============================================================================

/// Snapshot of store counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Requests ever inserted.
    pub requests_inserted: u64,
    /// Grants ever inserted.
    pub grants_inserted: u64,
    /// Jobs ever inserted.
    pub jobs_inserted: u64,
    /// Successful job claims.
    pub jobs_claimed: u64,
    /// Claim attempts lost to a concurrent claimer.
    pub claim_conflicts: u64,
}

#[derive(Debug, Default)]
struct StatsInner {
    requests_inserted: AtomicU64,
    grants_inserted: AtomicU64,
    jobs_inserted: AtomicU64,
    jobs_claimed: AtomicU64,
    claim_conflicts: AtomicU64,
}

impl StatsInner {
    fn snapshot(&self) -> StoreStats {
        StoreStats {
            requests_inserted: self.requests_inserted.load(Ordering::Relaxed),
            grants_inserted: self.grants_inserted.load(Ordering::Relaxed),
            jobs_inserted: self.jobs_inserted.load(Ordering::Relaxed),
            jobs_claimed: self.jobs_claimed.load(Ordering::Relaxed),
            claim_conflicts: self.claim_conflicts.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Tables
// =============================================================================

/// A table keeping both a map and insertion order.
#[derive(Debug)]
struct Table<K, V> {
    order: Vec<K>,
    rows: HashMap<K, V>,
}

impl<K: std::hash::Hash + Eq + Clone, V> Table<K, V> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            rows: HashMap::new(),
        }
    }

    fn insert_new(&mut self, key: K, value: V) -> bool {
        if self.rows.contains_key(&key) {
            return false;
        }
        self.order.push(key.clone());
        self.rows.insert(key, value);
        true
    }

    fn in_order(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter_map(|key| self.rows.get(key))
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// The in-memory store backing requests, grants, jobs, and operators.
#[derive(Debug)]
pub struct MemoryStore {
    requests: RwLock<Table<RequestId, PrivilegeRequest>>,
    grants: RwLock<Table<GrantId, PrivilegeGrant>>,
    jobs: RwLock<Table<JobId, Job>>,
    operators: RwLock<Table<OperatorId, OperatorInfo>>,
    stats: StatsInner,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(Table::new()),
            grants: RwLock::new(Table::new()),
            jobs: RwLock::new(Table::new()),
            operators: RwLock::new(Table::new()),
            stats: StatsInner::default(),
        }
    }

    /// Returns a snapshot of the store counters.
    pub fn stats(&self) -> StoreStats {
        self.stats.snapshot()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RequestStore
// =============================================================================

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert_request(&self, request: PrivilegeRequest) -> StoreResult<()> {
        let id = request.id.clone();
        if !self.requests.write().insert_new(id.clone(), request) {
            return Err(StoreError::already_exists(id));
        }
        self.stats.requests_inserted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn get_request(&self, id: &RequestId) -> StoreResult<PrivilegeRequest> {
        self.requests
            .read()
            .rows
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn update_request(&self, request: PrivilegeRequest) -> StoreResult<()> {
        let mut table = self.requests.write();
        match table.rows.get_mut(&request.id) {
            Some(row) => {
                *row = request;
                Ok(())
            }
            None => Err(StoreError::not_found(&request.id)),
        }
    }

    async fn pending_requests(&self) -> StoreResult<Vec<PrivilegeRequest>> {
        Ok(self
            .requests
            .read()
            .in_order()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect())
    }
}

// =============================================================================
// GrantStore
// =============================================================================

#[async_trait]
impl GrantStore for MemoryStore {
    async fn insert_grant(&self, grant: PrivilegeGrant) -> StoreResult<()> {
        let id = grant.id.clone();
        if !self.grants.write().insert_new(id.clone(), grant) {
            return Err(StoreError::already_exists(id));
        }
        self.stats.grants_inserted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn get_grant(&self, id: &GrantId) -> StoreResult<PrivilegeGrant> {
        self.grants
            .read()
            .rows
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn update_grant(&self, grant: PrivilegeGrant) -> StoreResult<()> {
        let mut table = self.grants.write();
        match table.rows.get_mut(&grant.id) {
            Some(row) => {
                *row = grant;
                Ok(())
            }
            None => Err(StoreError::not_found(&grant.id)),
        }
    }

    async fn active_grants_for_user(&self, user_id: &str) -> StoreResult<Vec<PrivilegeGrant>> {
        Ok(self
            .grants
            .read()
            .in_order()
            .filter(|g| g.user_id == user_id && g.status.needs_revocation())
            .cloned()
            .collect())
    }

    async fn grants_due_for_revocation(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<PrivilegeGrant>> {
        Ok(self
            .grants
            .read()
            .in_order()
            .filter(|g| g.status.needs_revocation() && g.expires_at <= now)
            .cloned()
            .collect())
    }
}

// =============================================================================
// JobStore
// =============================================================================

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(&self, job: Job) -> StoreResult<()> {
        let id = job.id.clone();
        if !self.jobs.write().insert_new(id.clone(), job) {
            return Err(StoreError::already_exists(id));
        }
        self.stats.jobs_inserted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> StoreResult<Job> {
        self.jobs
            .read()
            .rows
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn pending_jobs(&self) -> StoreResult<Vec<Job>> {
        Ok(self
            .jobs
            .read()
            .in_order()
            .filter(|j| j.status == JobStatus::Pending)
            .cloned()
            .collect())
    }

    async fn compare_and_set_job_status(
        &self,
        id: &JobId,
        from: JobStatus,
        to: JobStatus,
    ) -> StoreResult<()> {
        // The observed status is re-checked under the write lock; losers of
        // the claim race see the winner's status.
        let mut table = self.jobs.write();
        let job = table.rows.get_mut(id).ok_or_else(|| StoreError::not_found(id))?;

        if job.status != from {
            self.stats.claim_conflicts.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::conflict(id, from, job.status));
        }

        job.status = to;
        if to == JobStatus::Claimed {
            self.stats.jobs_claimed.fetch_add(1, Ordering::Relaxed);
        }

        debug!(job_id = %id, from = %from, to = %to, "Job status transition");
        Ok(())
    }

    async fn finish_job(
        &self,
        id: &JobId,
        status: JobStatus,
        result: String,
        error: String,
    ) -> StoreResult<Job> {
        let mut table = self.jobs.write();
        let job = table.rows.get_mut(id).ok_or_else(|| StoreError::not_found(id))?;

        if job.status.is_terminal() {
            return Err(StoreError::terminal(id, job.status));
        }

        job.status = status;
        job.result = result;
        job.error = error;
        Ok(job.clone())
    }
}

// =============================================================================
// OperatorStore
// =============================================================================

#[async_trait]
impl OperatorStore for MemoryStore {
    async fn upsert_operator(&self, info: OperatorInfo) -> StoreResult<()> {
        let mut table = self.operators.write();
        if let Some(row) = table.rows.get_mut(&info.id) {
            *row = info;
        } else {
            table.insert_new(info.id.clone(), info);
        }
        Ok(())
    }

    async fn get_operator(&self, id: &OperatorId) -> StoreResult<OperatorInfo> {
        self.operators
            .read()
            .rows
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn record_heartbeat(&self, id: &OperatorId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut table = self.operators.write();
        let info = table.rows.get_mut(id).ok_or_else(|| StoreError::not_found(id))?;
        info.last_seen = at;
        info.status = OperatorStatus::Active;
        Ok(())
    }

    async fn list_operators(&self) -> StoreResult<Vec<OperatorInfo>> {
        let table = self.operators.read();
        let mut operators: Vec<OperatorInfo> = table.in_order().cloned().collect();
        operators.reverse();
        Ok(operators)
    }

    async fn operators_silent_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<OperatorInfo>> {
        Ok(self
            .operators
            .read()
            .in_order()
            .filter(|o| o.status == OperatorStatus::Active && o.last_seen < cutoff)
            .cloned()
            .collect())
    }

    async fn mark_operator_inactive(&self, id: &OperatorId) -> StoreResult<()> {
        let mut table = self.operators.write();
        let info = table.rows.get_mut(id).ok_or_else(|| StoreError::not_found(id))?;
        info.status = OperatorStatus::Inactive;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::types::PrivilegeLevel;
    use std::sync::Arc;
    use std::time::Duration;

    fn sample_job(id: &str) -> Job {
        Job {
            id: JobId::new(id),
            module: "mysql".to_string(),
            job_type: "ping".to_string(),
            request: serde_json::json!({"server": "local"}),
            status: JobStatus::Pending,
            result: String::new(),
            error: String::new(),
            created_at: Utc::now(),
        }
    }

    fn sample_grant(id: &str, expires_in: chrono::Duration) -> PrivilegeGrant {
        let now = Utc::now();
        PrivilegeGrant {
            id: GrantId::new(id),
            request_id: RequestId::new(format!("req-{}", id)),
            user_id: "u1".to_string(),
            resource_id: "mysql-1".to_string(),
            level: PrivilegeLevel::Read,
            granted_at: now,
            expires_at: now + expires_in,
            granted_by: "admin".to_string(),
            status: aegis_core::types::GrantStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_request_crud() {
        let store = MemoryStore::new();
        let request = PrivilegeRequest::new(
            "u1",
            "mysql-1",
            PrivilegeLevel::Read,
            "debug",
            Duration::from_secs(3600),
        );
        let id = request.id.clone();

        store.insert_request(request.clone()).await.unwrap();
        assert!(matches!(
            store.insert_request(request).await,
            Err(StoreError::AlreadyExists { .. })
        ));

        let mut fetched = store.get_request(&id).await.unwrap();
        fetched.status = RequestStatus::Approved;
        store.update_request(fetched).await.unwrap();

        assert!(store.pending_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grants_due_for_revocation_respects_expiry() {
        let store = MemoryStore::new();
        store
            .insert_grant(sample_grant("g-live", chrono::Duration::hours(1)))
            .await
            .unwrap();
        store
            .insert_grant(sample_grant("g-dead", chrono::Duration::minutes(-5)))
            .await
            .unwrap();

        let due = store.grants_due_for_revocation(Utc::now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id.as_str(), "g-dead");
    }

    #[tokio::test]
    async fn test_pending_jobs_fifo() {
        let store = MemoryStore::new();
        store.insert_job(sample_job("job-0000000001")).await.unwrap();
        store.insert_job(sample_job("job-0000000002")).await.unwrap();
        store.insert_job(sample_job("job-0000000003")).await.unwrap();

        store
            .compare_and_set_job_status(
                &JobId::new("job-0000000002"),
                JobStatus::Pending,
                JobStatus::Claimed,
            )
            .await
            .unwrap();

        let pending = store.pending_jobs().await.unwrap();
        let ids: Vec<&str> = pending.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["job-0000000001", "job-0000000003"]);
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let store = Arc::new(MemoryStore::new());
        store.insert_job(sample_job("job-contested")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .compare_and_set_job_status(
                        &JobId::new("job-contested"),
                        JobStatus::Pending,
                        JobStatus::Claimed,
                    )
                    .await
                    .is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.stats().jobs_claimed, 1);
        assert_eq!(store.stats().claim_conflicts, 7);
    }

    #[tokio::test]
    async fn test_finish_job_rejects_double_terminal() {
        let store = MemoryStore::new();
        store.insert_job(sample_job("job-1")).await.unwrap();

        let id = JobId::new("job-1");
        store
            .finish_job(&id, JobStatus::Completed, "ok".to_string(), String::new())
            .await
            .unwrap();

        let err = store
            .finish_job(&id, JobStatus::Failed, String::new(), "late".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Terminal { .. }));

        // The terminal result survived untouched.
        let job = store.get_job(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, "ok");
    }

    #[tokio::test]
    async fn test_operator_listing_is_most_recent_first() {
        let store = MemoryStore::new();
        store
            .upsert_operator(OperatorInfo::registered_now(OperatorId::new("op-old")))
            .await
            .unwrap();
        store
            .upsert_operator(OperatorInfo::registered_now(OperatorId::new("op-new")))
            .await
            .unwrap();

        let operators = store.list_operators().await.unwrap();
        assert_eq!(operators[0].id.as_str(), "op-new");
        assert_eq!(operators[1].id.as_str(), "op-old");
    }
}
