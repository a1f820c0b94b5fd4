// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Health aggregation and operator liveness tracking.
//!
//! The aggregator probes every enabled module under a bounded timeout and
//! merges the results: the aggregate is `ok` only if all modules report
//! healthy, else `degraded`, with each failing module's error text surfaced
//! verbatim. One failing module never aborts the batch.
//!
//! Operator liveness is tracked through heartbeat timestamps; operators that
//! fall silent past a timeout are reported for the external alerting /
//! mark-inactive workflow.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::module::{with_deadline, Module};
use crate::store::OperatorStore;
use crate::types::{OperatorId, OperatorInfo};

// =============================================================================
// Health Report
// =============================================================================

/// Aggregate health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Every module reported healthy.
    Ok,
    /// At least one module reported an error.
    Degraded,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Ok => write!(f, "ok"),
            HealthState::Degraded => write!(f, "degraded"),
        }
    }
}

/// Merged health of all enabled modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Aggregate state.
    pub status: HealthState,
    /// Per-module status: `"healthy"`, or the module's error text verbatim.
    pub modules: BTreeMap<String, String>,
}

impl HealthReport {
    /// Returns `true` if every module is healthy.
    pub fn is_ok(&self) -> bool {
        self.status == HealthState::Ok
    }
}

// =============================================================================
// HealthAggregator
// =============================================================================

/// Probes enabled modules and merges their health.
pub struct HealthAggregator {
    modules: Vec<Arc<dyn Module>>,
    check_timeout: Duration,
}

impl HealthAggregator {
    /// Creates an aggregator over the enabled modules.
    pub fn new(modules: Vec<Arc<dyn Module>>) -> Self {
        Self {
            modules,
            check_timeout: Duration::from_secs(3),
        }
    }

    /// Sets the per-module probe deadline.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Probes every module and merges the results.
    ///
    /// Each probe is bounded by the configured deadline; a timed-out or
    /// failing module degrades the aggregate but never aborts the rest of
    /// the batch.
    pub async fn check_all(&self) -> HealthReport {
        let mut modules = BTreeMap::new();
        let mut status = HealthState::Ok;

        for module in &self.modules {
            let name = module.name().to_string();

            match with_deadline(self.check_timeout, module.health_check()).await {
                Ok(()) => {
                    debug!(module = %name, "Health check passed");
                    modules.insert(name, "healthy".to_string());
                }
                Err(err) => {
                    warn!(module = %name, error = %err, "Health check failed");
                    status = HealthState::Degraded;
                    modules.insert(name, err.to_string());
                }
            }
        }

        HealthReport { status, modules }
    }
}

// =============================================================================
// OperatorTracker
// =============================================================================

/// Tracks operator liveness via heartbeat timestamps.
pub struct OperatorTracker {
    store: Arc<dyn OperatorStore>,
}

impl OperatorTracker {
    /// Creates a tracker over the given store.
    pub fn new(store: Arc<dyn OperatorStore>) -> Self {
        Self { store }
    }

    /// Registers an operator, or re-activates an existing record.
    pub async fn register(&self, id: OperatorId) -> StoreResult<OperatorInfo> {
        let info = match self.store.get_operator(&id).await {
            Ok(mut existing) => {
                existing.status = crate::types::OperatorStatus::Active;
                existing.last_seen = Utc::now();
                existing
            }
            Err(err) if err.is_not_found() => OperatorInfo::registered_now(id),
            Err(err) => return Err(err),
        };

        self.store.upsert_operator(info.clone()).await?;
        debug!(operator_id = %info.id, "Operator registered");
        Ok(info)
    }

    /// Records a heartbeat for an operator.
    ///
    /// # Errors
    ///
    /// `NotFound` for operators that never registered.
    pub async fn heartbeat(&self, id: &OperatorId) -> StoreResult<()> {
        self.store.record_heartbeat(id, Utc::now()).await
    }

    /// Lists all known operators.
    pub async fn list(&self) -> StoreResult<Vec<OperatorInfo>> {
        self.store.list_operators().await
    }

    /// Returns active operators whose last heartbeat is older than `timeout`.
    ///
    /// Feeds the external alerting / mark-inactive workflow.
    pub async fn inactive_operators(&self, timeout: Duration) -> StoreResult<Vec<OperatorInfo>> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::hours(1));
        self.store.operators_silent_since(cutoff).await
    }

    /// Marks an operator inactive.
    pub async fn mark_inactive(&self, id: &OperatorId) -> StoreResult<()> {
        warn!(operator_id = %id, "Marking operator inactive");
        self.store.mark_operator_inactive(id).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ModuleError};
    use crate::module::ModuleConfig;
    use crate::types::{GrantId, Metadata, PrivilegeRequest};
    use async_trait::async_trait;

    struct ProbeModule {
        name: &'static str,
        error: Option<&'static str>,
        delay: Option<Duration>,
    }

    impl ProbeModule {
        fn healthy(name: &'static str) -> Arc<dyn Module> {
            Arc::new(Self {
                name,
                error: None,
                delay: None,
            })
        }

        fn failing(name: &'static str, error: &'static str) -> Arc<dyn Module> {
            Arc::new(Self {
                name,
                error: Some(error),
                delay: None,
            })
        }

        fn slow(name: &'static str, delay: Duration) -> Arc<dyn Module> {
            Arc::new(Self {
                name,
                error: None,
                delay: Some(delay),
            })
        }
    }

    #[async_trait]
    impl Module for ProbeModule {
        fn name(&self) -> &str {
            self.name
        }

        fn describe(&self) -> &str {
            "probe module"
        }

        fn validate_config(&self, _config: &ModuleConfig) -> Result<(), ConfigError> {
            Ok(())
        }

        async fn initialize(&self, _config: &ModuleConfig) -> Result<(), ModuleError> {
            Ok(())
        }

        async fn handle_privilege_request(
            &self,
            _request: &mut PrivilegeRequest,
        ) -> Result<(), ModuleError> {
            Ok(())
        }

        async fn revoke_privilege(
            &self,
            _grant_id: &GrantId,
            _metadata: &Metadata,
        ) -> Result<(), ModuleError> {
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ModuleError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.error {
                Some(message) => Err(ModuleError::transient(message)),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_all_healthy_is_ok() {
        let aggregator =
            HealthAggregator::new(vec![ProbeModule::healthy("mysql"), ProbeModule::healthy("kubernetes")]);

        let report = aggregator.check_all().await;
        assert!(report.is_ok());
        assert_eq!(report.modules["mysql"], "healthy");
        assert_eq!(report.modules["kubernetes"], "healthy");
    }

    #[tokio::test]
    async fn test_one_failure_degrades_without_aborting() {
        let aggregator = HealthAggregator::new(vec![
            ProbeModule::healthy("mysql"),
            ProbeModule::failing("kubernetes", "api server unreachable"),
        ]);

        let report = aggregator.check_all().await;
        assert_eq!(report.status, HealthState::Degraded);
        // Error text surfaces verbatim; the healthy module still reports.
        assert!(report.modules["kubernetes"].contains("api server unreachable"));
        assert_eq!(report.modules["mysql"], "healthy");
    }

    #[tokio::test]
    async fn test_slow_probe_times_out() {
        let aggregator = HealthAggregator::new(vec![ProbeModule::slow(
            "mysql",
            Duration::from_secs(30),
        )])
        .with_check_timeout(Duration::from_millis(20));

        let report = aggregator.check_all().await;
        assert_eq!(report.status, HealthState::Degraded);
        assert!(report.modules["mysql"].contains("timed out"));
    }

    mod tracker {
        use super::*;
        use crate::error::{StoreError, StoreResult};
        use chrono::{DateTime, Utc};
        use parking_lot::Mutex;
        use std::collections::HashMap;

        #[derive(Default)]
        struct TestOperatorStore {
            operators: Mutex<HashMap<OperatorId, OperatorInfo>>,
        }

        #[async_trait]
        impl OperatorStore for TestOperatorStore {
            async fn upsert_operator(&self, info: OperatorInfo) -> StoreResult<()> {
                self.operators.lock().insert(info.id.clone(), info);
                Ok(())
            }

            async fn get_operator(&self, id: &OperatorId) -> StoreResult<OperatorInfo> {
                self.operators
                    .lock()
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(id))
            }

            async fn record_heartbeat(
                &self,
                id: &OperatorId,
                at: DateTime<Utc>,
            ) -> StoreResult<()> {
                let mut guard = self.operators.lock();
                let info = guard.get_mut(id).ok_or_else(|| StoreError::not_found(id))?;
                info.last_seen = at;
                info.status = crate::types::OperatorStatus::Active;
                Ok(())
            }

            async fn list_operators(&self) -> StoreResult<Vec<OperatorInfo>> {
                Ok(self.operators.lock().values().cloned().collect())
            }

            async fn operators_silent_since(
                &self,
                cutoff: DateTime<Utc>,
            ) -> StoreResult<Vec<OperatorInfo>> {
                Ok(self
                    .operators
                    .lock()
                    .values()
                    .filter(|o| {
                        o.status == crate::types::OperatorStatus::Active && o.last_seen < cutoff
                    })
                    .cloned()
                    .collect())
            }

            async fn mark_operator_inactive(&self, id: &OperatorId) -> StoreResult<()> {
                let mut guard = self.operators.lock();
                let info = guard.get_mut(id).ok_or_else(|| StoreError::not_found(id))?;
                info.status = crate::types::OperatorStatus::Inactive;
                Ok(())
            }
        }

        #[tokio::test]
        async fn test_register_and_heartbeat() {
            let tracker = OperatorTracker::new(Arc::new(TestOperatorStore::default()));
            let id = OperatorId::new("op-1");

            tracker.register(id.clone()).await.unwrap();
            tracker.heartbeat(&id).await.unwrap();

            assert!(tracker
                .inactive_operators(Duration::from_secs(60))
                .await
                .unwrap()
                .is_empty());
        }

        #[tokio::test]
        async fn test_heartbeat_for_unknown_operator() {
            let tracker = OperatorTracker::new(Arc::new(TestOperatorStore::default()));
            let err = tracker.heartbeat(&OperatorId::new("ghost")).await.unwrap_err();
            assert!(err.is_not_found());
        }

        #[tokio::test]
        async fn test_silent_operator_is_reported_and_marked() {
            let store = Arc::new(TestOperatorStore::default());
            let tracker = OperatorTracker::new(store.clone());
            let id = OperatorId::new("op-1");

            tracker.register(id.clone()).await.unwrap();

            // Age the heartbeat past the timeout.
            {
                let mut guard = store.operators.lock();
                guard.get_mut(&id).unwrap().last_seen = Utc::now() - chrono::Duration::minutes(10);
            }

            let silent = tracker.inactive_operators(Duration::from_secs(60)).await.unwrap();
            assert_eq!(silent.len(), 1);
            assert_eq!(silent[0].id, id);

            tracker.mark_inactive(&id).await.unwrap();
            assert!(tracker
                .inactive_operators(Duration::from_secs(60))
                .await
                .unwrap()
                .is_empty());
        }
    }
}
