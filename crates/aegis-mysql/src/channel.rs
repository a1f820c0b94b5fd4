// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Administrative channel abstraction.
//!
//! The module composes grant and revoke statements; this trait carries them
//! to the database server. Keeping the transport behind a trait isolates the
//! wire mechanics (a deployment concern) from the privilege protocol, and
//! gives tests a recording implementation with fault injection.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use aegis_core::error::ModuleError;

// =============================================================================
// AdminChannel Trait
// =============================================================================

/// Transport for administrative statements against a MySQL server.
///
/// Implementations must be `Send + Sync`; the module issues statements from
/// concurrent tasks.
#[async_trait]
pub trait AdminChannel: Send + Sync + std::fmt::Debug {
    /// Executes a statement with no result set.
    async fn execute(&self, statement: &str) -> Result<(), ModuleError>;

    /// Runs a query returning a single scalar value.
    async fn query_scalar(&self, query: &str) -> Result<String, ModuleError>;

    /// Cheap server liveness check.
    async fn check(&self) -> Result<(), ModuleError>;
}

// =============================================================================
// InMemoryChannel
// =============================================================================

/// An in-process channel that records statements instead of sending them.
///
/// Used by tests and single-node development runs. Supports fault injection:
/// the channel can be made unreachable, or made to fail after the first N
/// statements (for rollback tests).
#[derive(Debug)]
pub struct InMemoryChannel {
    hostname: String,
    executed: Mutex<Vec<String>>,
    unreachable: AtomicBool,
    /// Statements remaining before injected failures; negative = unlimited.
    budget: AtomicI64,
}

impl InMemoryChannel {
    /// Creates a channel reporting the given hostname.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            executed: Mutex::new(Vec::new()),
            unreachable: AtomicBool::new(false),
            budget: AtomicI64::new(-1),
        }
    }

    /// Returns every statement executed so far.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    /// Makes the channel unreachable (all operations fail transiently).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Fails every statement after the first `n` succeed.
    pub fn fail_after(&self, n: i64) {
        self.budget.store(n, Ordering::SeqCst);
    }

    fn gate(&self) -> Result<(), ModuleError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ModuleError::transient("mysql server unreachable"));
        }
        Ok(())
    }

    fn spend_budget(&self) -> Result<(), ModuleError> {
        let remaining = self.budget.load(Ordering::SeqCst);
        if remaining < 0 {
            return Ok(());
        }
        if remaining == 0 {
            return Err(ModuleError::transient("mysql server dropped the connection"));
        }
        self.budget.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::new("mysql.local")
    }
}

#[async_trait]
impl AdminChannel for InMemoryChannel {
    async fn execute(&self, statement: &str) -> Result<(), ModuleError> {
        self.gate()?;
        self.spend_budget()?;
        self.executed.lock().push(statement.to_string());
        Ok(())
    }

    async fn query_scalar(&self, query: &str) -> Result<String, ModuleError> {
        self.gate()?;
        if query.contains("@@hostname") {
            return Ok(self.hostname.clone());
        }
        Err(ModuleError::failed(format!("unsupported query: {}", query)))
    }

    async fn check(&self) -> Result<(), ModuleError> {
        self.gate()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_statements_in_order() {
        let channel = InMemoryChannel::default();
        channel.execute("CREATE USER 'a'").await.unwrap();
        channel.execute("GRANT SELECT").await.unwrap();

        assert_eq!(channel.executed(), vec!["CREATE USER 'a'", "GRANT SELECT"]);
    }

    #[tokio::test]
    async fn test_unreachable_fails_transiently() {
        let channel = InMemoryChannel::default();
        channel.set_unreachable(true);

        let err = channel.execute("SELECT 1").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(channel.check().await.is_err());

        channel.set_unreachable(false);
        assert!(channel.check().await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_after_budget() {
        let channel = InMemoryChannel::default();
        channel.fail_after(1);

        channel.execute("first").await.unwrap();
        assert!(channel.execute("second").await.is_err());
        assert_eq!(channel.executed(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_hostname_query() {
        let channel = InMemoryChannel::new("db-7.internal");
        let hostname = channel.query_scalar("SELECT @@hostname").await.unwrap();
        assert_eq!(hostname, "db-7.internal");
    }
}
