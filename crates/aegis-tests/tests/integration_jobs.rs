// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Job queue integration tests.
//!
//! Exercises the create/claim/update protocol on the shared store, with a
//! focus on the races the compare-and-set claim must win.

use std::sync::Arc;

use aegis_core::error::StoreError;
use aegis_core::types::JobStatus;
use aegis_tests::common::{init_test_logging, ControlPlane};

fn control_plane() -> ControlPlane {
    init_test_logging();
    let (plane, _module) = ControlPlane::with_mock();
    plane
}

#[tokio::test]
async fn test_create_update_get_scenario() {
    let plane = control_plane();

    let job = plane
        .jobs
        .create("mysql", "ping", serde_json::json!({"server": "local"}))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    plane
        .jobs
        .update(
            &job.id,
            JobStatus::Completed,
            "myhost.local".to_string(),
            String::new(),
        )
        .await
        .unwrap();

    let fetched = plane.jobs.get(&job.id).await.unwrap();
    assert_eq!(fetched.status, JobStatus::Completed);
    assert_eq!(fetched.result, "myhost.local");
    assert!(fetched.error.is_empty());
}

#[tokio::test]
async fn test_pending_listing_is_fifo_and_excludes_claimed() {
    let plane = control_plane();

    let first = plane.jobs.create("mysql", "ping", serde_json::json!({})).await.unwrap();
    let second = plane.jobs.create("mysql", "ping", serde_json::json!({})).await.unwrap();
    let third = plane.jobs.create("mysql", "ping", serde_json::json!({})).await.unwrap();

    plane.jobs.claim(&second.id).await.unwrap();

    let pending = plane.jobs.pending().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, first.id);
    assert_eq!(pending[1].id, third.id);
}

#[tokio::test]
async fn test_concurrent_claims_have_exactly_one_winner() {
    let plane = control_plane();
    let job = plane.jobs.create("mysql", "ping", serde_json::json!({})).await.unwrap();

    let jobs = plane.jobs.clone();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let jobs = Arc::clone(&jobs);
        let id = job.id.clone();
        handles.push(tokio::spawn(async move { jobs.claim(&id).await }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(StoreError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected claim error: {}", other),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(
        plane.jobs.get(&job.id).await.unwrap().status,
        JobStatus::Claimed
    );
}

#[tokio::test]
async fn test_racing_terminal_updates_leave_one_terminal_state() {
    let plane = control_plane();
    let job = plane.jobs.create("mysql", "ping", serde_json::json!({})).await.unwrap();
    plane.jobs.claim(&job.id).await.unwrap();

    // Two workers race contradictory outcomes onto the same job.
    let jobs_a = plane.jobs.clone();
    let jobs_b = plane.jobs.clone();
    let id_a = job.id.clone();
    let id_b = job.id.clone();

    let complete = tokio::spawn(async move {
        jobs_a
            .update(&id_a, JobStatus::Completed, "done".to_string(), String::new())
            .await
    });
    let fail = tokio::spawn(async move {
        jobs_b
            .update(&id_b, JobStatus::Failed, String::new(), "boom".to_string())
            .await
    });

    let outcomes = [complete.await.unwrap(), fail.await.unwrap()];
    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, 1, "exactly one terminal write must win");

    // The stored record matches the winner, not a blend of both.
    let stored = plane.jobs.get(&job.id).await.unwrap();
    match stored.status {
        JobStatus::Completed => {
            assert_eq!(stored.result, "done");
            assert!(stored.error.is_empty());
        }
        JobStatus::Failed => {
            assert_eq!(stored.error, "boom");
            assert!(stored.result.is_empty());
        }
        other => panic!("job left non-terminal: {}", other),
    }
}

#[tokio::test]
async fn test_terminal_jobs_reject_further_mutation() {
    let plane = control_plane();
    let job = plane.jobs.create("mysql", "ping", serde_json::json!({})).await.unwrap();

    plane
        .jobs
        .update(&job.id, JobStatus::Failed, String::new(), "boom".to_string())
        .await
        .unwrap();

    let err = plane
        .jobs
        .update(&job.id, JobStatus::Completed, "late".to_string(), String::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Terminal { .. }));

    let err = plane.jobs.claim(&job.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let stored = plane.jobs.get(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error, "boom");
}

#[tokio::test]
async fn test_unknown_job_ids_are_not_found() {
    let plane = control_plane();
    let ghost = aegis_core::types::JobId::new("job-ghost");

    assert!(plane.jobs.get(&ghost).await.unwrap_err().is_not_found());
    assert!(plane.jobs.claim(&ghost).await.unwrap_err().is_not_found());
    assert!(plane
        .jobs
        .update(&ghost, JobStatus::Completed, String::new(), String::new())
        .await
        .unwrap_err()
        .is_not_found());
}
