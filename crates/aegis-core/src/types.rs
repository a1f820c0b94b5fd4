// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for AEGIS.
//!
//! This module provides the resource-agnostic records that flow through the
//! control plane: privilege requests, grants, asynchronous jobs, and operator
//! liveness records.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $prefix:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from an existing string.
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a fresh random identifier.
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, uuid::Uuid::new_v4().simple()))
            }

            /// Returns the identifier as a string slice.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the inner string.
            #[inline]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// A unique identifier for a privilege escalation request.
    RequestId,
    "req"
);

string_id!(
    /// A unique identifier for an active privilege grant.
    GrantId,
    "grant"
);

string_id!(
    /// A unique identifier for an asynchronous job.
    JobId,
    "job"
);

string_id!(
    /// A unique identifier for a distributed operator process.
    OperatorId,
    "op"
);

// =============================================================================
// Privilege Level
// =============================================================================

/// The level of privilege requested against a resource.
///
/// Levels are ordered: `Read < Write < Admin < Root`. Modules map each level
/// to whatever their resource understands (SQL privileges, RBAC roles, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeLevel {
    /// Read-only access.
    Read,
    /// Read and write access.
    Write,
    /// Administrative access.
    Admin,
    /// Unrestricted access.
    Root,
}

impl PrivilegeLevel {
    /// Returns the wire representation of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivilegeLevel::Read => "read",
            PrivilegeLevel::Write => "write",
            PrivilegeLevel::Admin => "admin",
            PrivilegeLevel::Root => "root",
        }
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PrivilegeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(PrivilegeLevel::Read),
            "write" => Ok(PrivilegeLevel::Write),
            "admin" => Ok(PrivilegeLevel::Admin),
            "root" => Ok(PrivilegeLevel::Root),
            other => Err(format!("unknown privilege level: {}", other)),
        }
    }
}

// =============================================================================
// Statuses
// =============================================================================

/// Lifecycle status of a privilege request.
///
/// `Pending` is the only non-terminal state. Once a request reaches
/// `Approved`, `Denied`, or `Failed` it is never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for approval.
    Pending,
    /// Approved; exactly one grant exists for this request.
    Approved,
    /// Rejected by policy; no side effect was performed.
    Denied,
    /// The module failed while applying the privilege; no grant exists.
    Failed,
}

impl RequestStatus {
    /// Returns `true` if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
            RequestStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of a privilege grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    /// The privilege is currently applied.
    Active,
    /// The grant passed its expiry but has not been revoked yet. The sweep
    /// keeps retrying revocation until it succeeds.
    Expired,
    /// The privilege has been reversed on the resource.
    Revoked,
}

impl GrantStatus {
    /// Returns `true` if the grant still needs revocation.
    pub fn needs_revocation(&self) -> bool {
        matches!(self, GrantStatus::Active | GrantStatus::Expired)
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GrantStatus::Active => "active",
            GrantStatus::Expired => "expired",
            GrantStatus::Revoked => "revoked",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of an asynchronous job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, waiting for an operator to claim it.
    Pending,
    /// Claimed by exactly one operator via compare-and-set.
    Claimed,
    /// Finished successfully; `result` is populated.
    Completed,
    /// Finished with an error; `error` is populated.
    Failed,
}

impl JobStatus {
    /// Returns `true` if the status is terminal.
    ///
    /// A terminal job must never be mutated again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Claimed => "claimed",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Liveness status of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorStatus {
    /// Heartbeats arriving within the liveness window.
    Active,
    /// Marked inactive after the heartbeat timeout elapsed.
    Inactive,
}

// =============================================================================
// Metadata
// =============================================================================

/// Opaque module-owned metadata attached to a privilege request.
///
/// A module handling a request must record everything required to reverse the
/// action later (generated credential names, secrets, created object
/// identifiers). This map is the sole record used for revocation.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Privilege Request
// =============================================================================

/// A request for temporary privilege escalation against a named resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegeRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// The user asking for elevated access.
    pub user_id: String,
    /// The resource the access applies to (e.g. `mysql-prod-1`).
    pub resource_id: String,
    /// Requested privilege level.
    pub level: PrivilegeLevel,
    /// Free-form justification. Required by policy.
    pub reason: String,
    /// When the request was created.
    pub requested_at: DateTime<Utc>,
    /// How long the privilege should last once granted.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// Who approved the request, once approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// When the request was approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Why the request was denied or failed, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    /// Module-owned reversal metadata. See [`Metadata`].
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl PrivilegeRequest {
    /// Creates a new pending request with a generated identifier.
    pub fn new(
        user_id: impl Into<String>,
        resource_id: impl Into<String>,
        level: PrivilegeLevel,
        reason: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            user_id: user_id.into(),
            resource_id: resource_id.into(),
            level,
            reason: reason.into(),
            requested_at: Utc::now(),
            duration,
            status: RequestStatus::Pending,
            approved_by: None,
            approved_at: None,
            status_reason: None,
            metadata: Metadata::new(),
        }
    }
}

// =============================================================================
// Privilege Grant
// =============================================================================

/// An active, time-bounded privilege that was approved and applied.
///
/// Created exactly once per approved request, and only after the target
/// module reported success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegeGrant {
    /// Unique grant identifier.
    pub id: GrantId,
    /// The request this grant originated from.
    pub request_id: RequestId,
    /// The user holding the privilege.
    pub user_id: String,
    /// The resource the privilege applies to.
    pub resource_id: String,
    /// Granted privilege level.
    pub level: PrivilegeLevel,
    /// When the privilege was applied.
    pub granted_at: DateTime<Utc>,
    /// When the privilege expires (`granted_at + duration`).
    pub expires_at: DateTime<Utc>,
    /// Who approved the originating request.
    pub granted_by: String,
    /// Current lifecycle status.
    pub status: GrantStatus,
}

impl PrivilegeGrant {
    /// Returns `true` if the grant is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// =============================================================================
// Job
// =============================================================================

/// A unit of asynchronous work dispatched to operators via polling.
///
/// The control plane creates jobs; exactly one operator claims and completes
/// each job. Once a job reaches a terminal status its result and error are
/// immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique, immutable job identifier. Monotonic per queue instance.
    pub id: JobId,
    /// Name of the module that must execute the job.
    pub module: String,
    /// Job type, dispatched to a type-specific handler (e.g. `ping`).
    #[serde(rename = "type")]
    pub job_type: String,
    /// Opaque request payload, interpreted by the handler.
    pub request: serde_json::Value,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Result text for completed jobs.
    #[serde(default)]
    pub result: String,
    /// Error text for failed jobs.
    #[serde(default)]
    pub error: String,
    /// When the job was created. Pending jobs are listed in this order.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Operator Info
// =============================================================================

/// A liveness record for a distributed operator process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorInfo {
    /// Unique operator identifier.
    pub id: OperatorId,
    /// Current liveness status.
    pub status: OperatorStatus,
    /// Last heartbeat received from the operator.
    pub last_seen: DateTime<Utc>,
    /// When the operator first registered.
    pub registered_at: DateTime<Utc>,
}

impl OperatorInfo {
    /// Creates an active record for a newly registered operator.
    pub fn registered_now(id: OperatorId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: OperatorStatus::Active,
            last_seen: now,
            registered_at: now,
        }
    }
}

// =============================================================================
// Server Info
// =============================================================================

/// Information about a resource server known to a module.
///
/// Returned by modules implementing the `ServerLister` capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name, unique within the module.
    pub name: String,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Administrative user the module connects as.
    pub user: String,
    /// Default database / namespace, when applicable.
    #[serde(default)]
    pub database: String,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_level_roundtrip() {
        for level in [
            PrivilegeLevel::Read,
            PrivilegeLevel::Write,
            PrivilegeLevel::Admin,
            PrivilegeLevel::Root,
        ] {
            let parsed: PrivilegeLevel = level.as_str().parse().unwrap();
            assert_eq!(parsed, level);
        }
        assert!("superuser".parse::<PrivilegeLevel>().is_err());
    }

    #[test]
    fn test_privilege_level_ordering() {
        assert!(PrivilegeLevel::Read < PrivilegeLevel::Write);
        assert!(PrivilegeLevel::Write < PrivilegeLevel::Admin);
        assert!(PrivilegeLevel::Admin < PrivilegeLevel::Root);
    }

    #[test]
    fn test_request_status_terminal() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Denied.is_terminal());
        assert!(RequestStatus::Failed.is_terminal());
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Claimed.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_grant_status_needs_revocation() {
        assert!(GrantStatus::Active.needs_revocation());
        assert!(GrantStatus::Expired.needs_revocation());
        assert!(!GrantStatus::Revoked.needs_revocation());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req-"));
    }

    #[test]
    fn test_request_serde_duration() {
        let request = PrivilegeRequest::new(
            "u1",
            "mysql-1",
            PrivilegeLevel::Read,
            "debug",
            Duration::from_secs(3600),
        );

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"duration\":\"1h\""));

        let back: PrivilegeRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.duration, Duration::from_secs(3600));
        assert_eq!(back.status, RequestStatus::Pending);
    }

    #[test]
    fn test_grant_expiry_check() {
        let now = Utc::now();
        let grant = PrivilegeGrant {
            id: GrantId::generate(),
            request_id: RequestId::generate(),
            user_id: "u1".to_string(),
            resource_id: "mysql-1".to_string(),
            level: PrivilegeLevel::Read,
            granted_at: now,
            expires_at: now + chrono::Duration::hours(1),
            granted_by: "admin".to_string(),
            status: GrantStatus::Active,
        };

        assert!(!grant.is_expired_at(now));
        assert!(grant.is_expired_at(now + chrono::Duration::hours(2)));
    }
}
