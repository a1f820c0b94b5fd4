// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The operator poll loop.
//!
//! Each cycle: list pending jobs, keep the ones a locally registered module
//! can execute, claim each via the control plane's compare-and-set endpoint,
//! dispatch the claims won, and report outcomes back. Claim exclusivity
//! comes from the CAS — losing a race just skips the job. Nothing in the
//! cycle is allowed to crash the loop; failures are logged and retried on
//! later cycles.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use aegis_core::task::PeriodicTask;
use aegis_core::types::{JobId, OperatorId};

use crate::client::ControlPlaneClient;
use crate::dispatch::JobDispatcher;
use crate::error::OperatorResult;

// =============================================================================
// PollReport
// =============================================================================

/// Outcome of one poll cycle.
#[derive(Debug, Default)]
pub struct PollReport {
    /// Pending jobs listed by the control plane.
    pub listed: usize,
    /// Jobs matching a locally registered module.
    pub matched: usize,
    /// Claims won and dispatched.
    pub executed: usize,
    /// Jobs whose claim was lost to another operator.
    pub lost_claims: usize,
    /// Jobs whose execution or report failed, with the error text.
    pub failed: Vec<(JobId, String)>,
}

// =============================================================================
// OperatorAgent
// =============================================================================

/// A distributed agent executing control-plane jobs for its local modules.
pub struct OperatorAgent {
    id: OperatorId,
    client: ControlPlaneClient,
    dispatcher: JobDispatcher,
}

impl OperatorAgent {
    /// Creates an agent.
    pub fn new(id: OperatorId, client: ControlPlaneClient, dispatcher: JobDispatcher) -> Self {
        Self {
            id,
            client,
            dispatcher,
        }
    }

    /// Returns the operator identifier.
    pub fn id(&self) -> &OperatorId {
        &self.id
    }

    /// Registers this operator with the control plane.
    pub async fn register(&self) -> OperatorResult<()> {
        let info = self.client.register(&self.id).await?;
        info!(operator_id = %info.id, "Operator registered with control plane");
        Ok(())
    }

    /// Sends one heartbeat.
    pub async fn heartbeat(&self) -> OperatorResult<()> {
        self.client.heartbeat(&self.id).await
    }

    /// Runs one poll cycle.
    ///
    /// A transport failure listing jobs aborts only this cycle; per-job
    /// failures are recorded and never stop the remaining jobs.
    pub async fn poll_once(&self) -> OperatorResult<PollReport> {
        let pending = self.client.pending_jobs().await?;

        let mut report = PollReport {
            listed: pending.len(),
            ..PollReport::default()
        };

        for job in pending {
            if !self.dispatcher.handles(&job) {
                continue;
            }
            report.matched += 1;

            let claimed = match self.client.claim_job(&job.id).await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    report.lost_claims += 1;
                    continue;
                }
                Err(err) => {
                    warn!(job_id = %job.id, error = %err, "Claim attempt failed");
                    report.failed.push((job.id.clone(), err.to_string()));
                    continue;
                }
            };

            let outcome = self.dispatcher.dispatch(&claimed).await;
            debug!(
                job_id = %claimed.id,
                status = %outcome.status,
                "Job executed"
            );

            match self.client.finish_job(&claimed.id, &outcome).await {
                Ok(_) => report.executed += 1,
                Err(err) => {
                    warn!(job_id = %claimed.id, error = %err, "Failed to report job outcome");
                    report.failed.push((claimed.id.clone(), err.to_string()));
                }
            }
        }

        if report.matched > 0 {
            info!(
                listed = report.listed,
                matched = report.matched,
                executed = report.executed,
                lost_claims = report.lost_claims,
                failed = report.failed.len(),
                "Poll cycle complete"
            );
        }

        Ok(report)
    }

    /// Starts the periodic poll loop as a background task.
    pub fn spawn_poll(self: &Arc<Self>, interval: Duration) -> PeriodicTask {
        let task = PeriodicTask::new("job-poll", interval);
        let agent = Arc::clone(self);

        // Start cannot fail on a freshly created task.
        let _ = task.start(move || {
            let agent = Arc::clone(&agent);
            async move {
                if let Err(err) = agent.poll_once().await {
                    warn!(error = %err, retryable = err.is_retryable(), "Poll cycle errored");
                }
            }
        });

        task
    }

    /// Starts the periodic heartbeat as a background task.
    pub fn spawn_heartbeat(self: &Arc<Self>, interval: Duration) -> PeriodicTask {
        let task = PeriodicTask::new("heartbeat", interval);
        let agent = Arc::clone(self);

        let _ = task.start(move || {
            let agent = Arc::clone(&agent);
            async move {
                if let Err(err) = agent.heartbeat().await {
                    warn!(error = %err, "Heartbeat failed");
                }
            }
        });

        task
    }
}

impl std::fmt::Debug for OperatorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorAgent")
            .field("id", &self.id)
            .field("control_plane", &self.client.base_url())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use aegis_api::AppState;
    use aegis_core::error::{ConfigError, ModuleError};
    use aegis_core::module::{Module, ModuleConfig, PingRequest, Pinger};
    use aegis_core::policy::StandardRuleEngine;
    use aegis_core::registry::ModuleRegistry;
    use aegis_core::types::{GrantId, Metadata, PrivilegeRequest};
    use aegis_core::{HealthAggregator, JobQueue, OperatorTracker, PrivilegeService};
    use aegis_store::MemoryStore;

    struct PingableModule;

    #[async_trait]
    impl Module for PingableModule {
        fn name(&self) -> &str {
            "mysql"
        }

        fn describe(&self) -> &str {
            "pingable test module"
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
            Ok(())
        }

        fn as_pinger(&self) -> Option<&dyn Pinger> {
            Some(self)
        }
    }

    #[async_trait]
    impl Pinger for PingableModule {
        async fn ping(&self, _request: &PingRequest) -> Result<String, ModuleError> {
            Ok("myhost.local".to_string())
        }
    }

    struct TestControlPlane {
        url: String,
        jobs: Arc<JobQueue>,
        _server: tokio::task::JoinHandle<()>,
    }

    async fn spawn_control_plane() -> TestControlPlane {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(ModuleRegistry::new());
        let module = Arc::new(PingableModule);
        registry.register(module.clone()).unwrap();

        let jobs = Arc::new(JobQueue::new(store.clone()));
        let service = Arc::new(PrivilegeService::new(
            store.clone(),
            registry.clone(),
            Arc::new(StandardRuleEngine::default()),
        ));

        let state = AppState::builder()
            .registry(registry)
            .service(service)
            .jobs(jobs.clone())
            .health(Arc::new(HealthAggregator::new(vec![module])))
            .operators(Arc::new(OperatorTracker::new(store)))
            .build()
            .unwrap();

        let router = aegis_api::ApiServer::new(state).router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestControlPlane {
            url: format!("http://{}", addr),
            jobs,
            _server: server,
        }
    }

    fn local_agent(control_plane_url: &str) -> OperatorAgent {
        let registry = Arc::new(ModuleRegistry::new());
        registry.register(Arc::new(PingableModule)).unwrap();

        OperatorAgent::new(
            OperatorId::new("op-1"),
            ControlPlaneClient::new(control_plane_url),
            JobDispatcher::new(registry),
        )
    }

    #[tokio::test]
    async fn test_poll_executes_ping_job_end_to_end() {
        let plane = spawn_control_plane().await;
        let agent = local_agent(&plane.url);

        agent.register().await.unwrap();
        agent.heartbeat().await.unwrap();

        let job = plane
            .jobs
            .create("mysql", "ping", serde_json::json!({"server": "local"}))
            .await
            .unwrap();

        let report = agent.poll_once().await.unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.executed, 1);
        assert!(report.failed.is_empty());

        let finished = plane.jobs.get(&job.id).await.unwrap();
        assert_eq!(finished.status, aegis_core::types::JobStatus::Completed);
        assert_eq!(finished.result, "myhost.local");
    }

    #[tokio::test]
    async fn test_lost_claim_is_skipped_not_failed() {
        let plane = spawn_control_plane().await;
        let agent = local_agent(&plane.url);

        let job = plane
            .jobs
            .create("mysql", "ping", serde_json::json!({"server": "local"}))
            .await
            .unwrap();

        // Another operator wins the claim between listing and claiming.
        plane.jobs.claim(&job.id).await.unwrap();

        // The job no longer lists as pending, so the cycle sees nothing.
        let report = agent.poll_once().await.unwrap();
        assert_eq!(report.matched, 0);
        assert_eq!(report.executed, 0);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_module_jobs_are_left_pending() {
        let plane = spawn_control_plane().await;
        let agent = local_agent(&plane.url);

        plane
            .jobs
            .create("kubernetes", "ping", serde_json::json!({"server": "k8s-1"}))
            .await
            .unwrap();

        let report = agent.poll_once().await.unwrap();
        assert_eq!(report.listed, 1);
        assert_eq!(report.matched, 0);

        assert_eq!(plane.jobs.pending().await.unwrap().len(), 1);
    }
}
