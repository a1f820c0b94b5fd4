// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Lifecycle integration tests.
//!
//! Drives the request → grant state machine end to end, with the real MySQL
//! module where the scenario calls for one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use aegis_core::error::LifecycleError;
use aegis_core::module::Module;
use aegis_core::store::GrantStore;
use aegis_core::types::{GrantStatus, PrivilegeLevel, RequestStatus};
use aegis_mysql::{InMemoryChannel, MysqlModule};
use aegis_tests::common::{init_test_logging, ControlPlane};
use aegis_tests::prelude::*;

fn mysql_control_plane() -> (ControlPlane, Arc<InMemoryChannel>) {
    init_test_logging();

    let channel = Arc::new(InMemoryChannel::new("db-1.internal"));
    let module = Arc::new(MysqlModule::with_channel(channel.clone()));
    let plane = ControlPlane::with_modules(vec![module as Arc<dyn Module>]);
    (plane, channel)
}

async fn initialize_mysql(plane: &ControlPlane) {
    let module = plane.registry.get("mysql").unwrap();
    module
        .initialize(&aegis_core::module::ModuleConfig::new(
            "mysql",
            serde_json::json!({
                "host": "db.internal",
                "port": 3306,
                "user": "aegis",
                "password": "secret",
            }),
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_submit_approve_creates_exactly_one_grant() {
    let (plane, channel) = mysql_control_plane();
    initialize_mysql(&plane).await;

    let request = plane.service.submit(valid_request("u1", "mysql-1")).await.unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    let grant = plane.service.approve(&request.id, "admin").await.unwrap();
    assert_eq!(grant.status, GrantStatus::Active);
    assert_eq!(grant.level, PrivilegeLevel::Read);
    assert_eq!(grant.granted_by, "admin");
    assert_eq!(grant.expires_at, grant.granted_at + chrono::Duration::hours(1));

    // The module actually ran: a user was created and granted SELECT.
    let executed = channel.executed();
    assert!(executed.iter().any(|s| s.starts_with("CREATE USER")));
    assert!(executed.iter().any(|s| s.contains("GRANT SELECT")));

    // Exactly one grant, and the request carries the reversal metadata.
    let stored = plane.service.get_request(&request.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Approved);
    assert!(stored.metadata.contains_key("username"));
    assert_eq!(
        plane.service.active_grants("u1").await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_out_of_bounds_durations_are_denied_without_side_effect() {
    let (plane, channel) = mysql_control_plane();
    initialize_mysql(&plane).await;

    for duration in [Duration::from_secs(60), Duration::from_secs(48 * 3600)] {
        let request = plane
            .service
            .submit(request_with_duration(duration))
            .await
            .unwrap();

        assert_eq!(request.status, RequestStatus::Denied);
        assert!(request.status_reason.is_some());

        // Terminal: approval is rejected, and the module never ran.
        let err = plane.service.approve(&request.id, "admin").await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidRequestState { .. }));
    }

    assert!(channel.executed().is_empty());
    assert!(plane.service.active_grants("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_reason_is_denied_naming_the_rule() {
    let (plane, _channel) = mysql_control_plane();
    initialize_mysql(&plane).await;

    let request = plane
        .service
        .submit(aegis_core::lifecycle::NewPrivilegeRequest {
            reason: "  ".to_string(),
            ..valid_request("u1", "mysql-1")
        })
        .await
        .unwrap();

    assert_eq!(request.status, RequestStatus::Denied);
    assert!(request.status_reason.unwrap().contains("reason"));
}

#[tokio::test]
async fn test_module_failure_leaves_no_half_applied_privilege() {
    let (plane, module) = ControlPlane::with_mock();
    module.set_fail_grants(true);

    let request = plane.service.submit(valid_request("u1", "mysql-1")).await.unwrap();
    let err = plane.service.approve(&request.id, "admin").await.unwrap_err();
    assert!(err.is_retryable());

    let stored = plane.service.get_request(&request.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Failed);
    assert!(plane.service.active_grants("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_revoke_is_idempotent_through_the_service() {
    let (plane, module) = ControlPlane::with_mock();

    let request = plane.service.submit(valid_request("u1", "mysql-1")).await.unwrap();
    let grant = plane.service.approve(&request.id, "admin").await.unwrap();

    let first = plane.service.revoke(&grant.id).await.unwrap();
    assert_eq!(first.status, GrantStatus::Revoked);
    let calls = module.revoke_calls();

    // Second revoke reports success without calling the module again.
    let second = plane.service.revoke(&grant.id).await.unwrap();
    assert_eq!(second.status, GrantStatus::Revoked);
    assert_eq!(module.revoke_calls(), calls);
}

#[tokio::test]
async fn test_sweep_revokes_only_expired_grants_and_retries_failures() {
    let (plane, module) = ControlPlane::with_mock();

    let fresh = plane.service.submit(valid_request("u1", "mysql-1")).await.unwrap();
    let fresh_grant = plane.service.approve(&fresh.id, "admin").await.unwrap();

    let doomed = plane.service.submit(valid_request("u2", "mysql-1")).await.unwrap();
    let doomed_grant = plane.service.approve(&doomed.id, "admin").await.unwrap();

    // Age one grant past expiry.
    let mut expired = plane.store.get_grant(&doomed_grant.id).await.unwrap();
    expired.expires_at = Utc::now() - chrono::Duration::minutes(1);
    plane.store.update_grant(expired).await.unwrap();

    // First cycle: revocation fails transiently, the grant is marked
    // expired and stays due.
    module.set_fail_revokes(true);
    let report = plane.service.sweep_expired_once().await.unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.revoked, 0);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(
        plane.store.get_grant(&doomed_grant.id).await.unwrap().status,
        GrantStatus::Expired
    );

    // Next cycle succeeds; the unexpired grant is never touched.
    module.set_fail_revokes(false);
    let report = plane.service.sweep_expired_once().await.unwrap();
    assert_eq!(report.revoked, 1);
    assert_eq!(
        plane.store.get_grant(&doomed_grant.id).await.unwrap().status,
        GrantStatus::Revoked
    );
    assert_eq!(
        plane.store.get_grant(&fresh_grant.id).await.unwrap().status,
        GrantStatus::Active
    );
}

#[tokio::test]
async fn test_periodic_sweep_task_revokes_expired_grant() {
    let (plane, _module) = ControlPlane::with_mock();

    let request = plane.service.submit(valid_request("u1", "mysql-1")).await.unwrap();
    let grant = plane.service.approve(&request.id, "admin").await.unwrap();

    let mut expired = plane.store.get_grant(&grant.id).await.unwrap();
    expired.expires_at = Utc::now() - chrono::Duration::minutes(1);
    plane.store.update_grant(expired).await.unwrap();

    let sweep = plane.service.spawn_sweep(Duration::from_millis(20));

    // The first iteration runs immediately; give it a moment.
    tokio::time::sleep(Duration::from_millis(100)).await;
    sweep.stop().await.unwrap();

    assert_eq!(
        plane.store.get_grant(&grant.id).await.unwrap().status,
        GrantStatus::Revoked
    );
}
