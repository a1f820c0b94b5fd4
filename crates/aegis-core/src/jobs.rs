// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Asynchronous job queue.
//!
//! Operators run in separate, possibly unreachable processes; the queue
//! decouples them from the control plane with a pull model — operators poll
//! for pending work, claim it, execute, and report back.
//!
//! # Claim Exclusivity
//!
//! A plain list-then-update protocol lets two operators act on the same job.
//! [`JobQueue::claim`] therefore compare-and-sets `pending → claimed` before
//! any dispatch; exactly one racer wins, the rest observe a conflict. FIFO
//! listing order is advisory fairness only — exclusivity comes from the CAS,
//! never from read order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;
use crate::types::{Job, JobId, JobStatus};

// =============================================================================
// JobQueue
// =============================================================================

/// The control-plane side of the job protocol.
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    sequence: AtomicU64,
}

impl JobQueue {
    /// Creates a queue over the given store.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates a new pending job.
    ///
    /// Job ids are unique and monotonic within a queue instance, so pending
    /// listings sort by creation. The store rejects duplicates outright.
    pub async fn create(
        &self,
        module: impl Into<String>,
        job_type: impl Into<String>,
        request: serde_json::Value,
    ) -> StoreResult<Job> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let job = Job {
            id: JobId::new(format!("job-{:010}", seq)),
            module: module.into(),
            job_type: job_type.into(),
            request,
            status: JobStatus::Pending,
            result: String::new(),
            error: String::new(),
            created_at: Utc::now(),
        };

        self.store.insert_job(job.clone()).await?;

        info!(
            job_id = %job.id,
            module = %job.module,
            job_type = %job.job_type,
            "Job created"
        );

        Ok(job)
    }

    /// Fetches a job by id.
    pub async fn get(&self, id: &JobId) -> StoreResult<Job> {
        self.store.get_job(id).await
    }

    /// Lists pending jobs in creation order.
    pub async fn pending(&self) -> StoreResult<Vec<Job>> {
        self.store.pending_jobs().await
    }

    /// Atomically claims a pending job.
    ///
    /// # Errors
    ///
    /// - `NotFound` for unknown ids
    /// - `Conflict` when another operator already claimed the job
    pub async fn claim(&self, id: &JobId) -> StoreResult<Job> {
        self.store
            .compare_and_set_job_status(id, JobStatus::Pending, JobStatus::Claimed)
            .await?;

        debug!(job_id = %id, "Job claimed");
        self.store.get_job(id).await
    }

    /// Records a job's terminal outcome.
    ///
    /// Only `completed` and `failed` are valid targets; once a job is
    /// terminal, further updates are rejected.
    ///
    /// # Errors
    ///
    /// - `NotFound` for unknown ids
    /// - `Conflict` when `status` is not terminal
    /// - `Terminal` when the job already finished
    pub async fn update(
        &self,
        id: &JobId,
        status: JobStatus,
        result: String,
        error: String,
    ) -> StoreResult<Job> {
        if !status.is_terminal() {
            return Err(StoreError::conflict(id, "completed or failed", status));
        }

        let job = self.store.finish_job(id, status, result, error).await?;

        info!(job_id = %id, status = %job.status, "Job finished");
        Ok(job)
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
