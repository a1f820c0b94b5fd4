// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Kubernetes RBAC privilege module.
//!
//! Grants temporary cluster access by creating a namespaced role (aggregating
//! one of the built-in cluster roles) and a binding for the requesting user.
//! Both object names are recorded in the request metadata for revocation.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use aegis_core::error::{ConfigError, ModuleError};
use aegis_core::module::{Module, ModuleConfig};
use aegis_core::types::{GrantId, Metadata, PrivilegeLevel, PrivilegeRequest};

use crate::rbac::{BindingSpec, InMemoryApplier, RbacApplier, RoleSpec};
use crate::settings::KubernetesSettings;

// =============================================================================
// KubernetesModule
// =============================================================================

/// The Kubernetes resource module.
pub struct KubernetesModule {
    state: RwLock<Option<State>>,
    injected_applier: RwLock<Option<Arc<dyn RbacApplier>>>,
}

struct State {
    settings: KubernetesSettings,
    applier: Arc<dyn RbacApplier>,
}

impl KubernetesModule {
    /// Creates an uninitialized module. The applier is built at
    /// [`initialize`](Module::initialize) time.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
            injected_applier: RwLock::new(None),
        }
    }

    /// Creates a module using the given applier instead of building one.
    pub fn with_applier(applier: Arc<dyn RbacApplier>) -> Self {
        let module = Self::new();
        *module.injected_applier.write() = Some(applier);
        module
    }

    fn state(&self) -> Result<(KubernetesSettings, Arc<dyn RbacApplier>), ModuleError> {
        self.state
            .read()
            .as_ref()
            .map(|state| (state.settings.clone(), state.applier.clone()))
            .ok_or_else(|| ModuleError::not_initialized("kubernetes"))
    }

    /// Maps a privilege level to the built-in cluster role it aggregates.
    fn base_role_for(level: PrivilegeLevel) -> &'static str {
        match level {
            PrivilegeLevel::Read => "view",
            PrivilegeLevel::Write => "edit",
            PrivilegeLevel::Admin => "admin",
            PrivilegeLevel::Root => "cluster-admin",
        }
    }
}

impl Default for KubernetesModule {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KubernetesModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubernetesModule")
            .field("initialized", &self.state.read().is_some())
            .finish()
    }
}

// =============================================================================
// Module Implementation
// =============================================================================

#[async_trait]
impl Module for KubernetesModule {
    fn name(&self) -> &str {
        "kubernetes"
    }

    fn describe(&self) -> &str {
        "Manages temporary Kubernetes RBAC privileges"
    }

    fn validate_config(&self, config: &ModuleConfig) -> Result<(), ConfigError> {
        KubernetesSettings::from_config(config).map(|_| ())
    }

    async fn initialize(&self, config: &ModuleConfig) -> Result<(), ModuleError> {
        let settings = KubernetesSettings::from_config(config)
            .map_err(|err| ModuleError::failed(err.to_string()))?;

        let applier: Arc<dyn RbacApplier> = match self.injected_applier.read().clone() {
            Some(applier) => applier,
            None => Arc::new(InMemoryApplier::new()),
        };

        // Verify the API server answers before accepting traffic.
        applier.check().await?;

        info!(
            namespace = %settings.namespace,
            role_prefix = %settings.role_prefix,
            max_roles = settings.max_roles,
            "Kubernetes module initialized"
        );

        *self.state.write() = Some(State { settings, applier });
        Ok(())
    }

    async fn handle_privilege_request(
        &self,
        request: &mut PrivilegeRequest,
    ) -> Result<(), ModuleError> {
        let (settings, applier) = self.state()?;

        if applier.role_count() >= settings.max_roles as usize {
            return Err(ModuleError::failed(format!(
                "role ceiling reached ({} roles)",
                settings.max_roles
            )));
        }

        let base_role = Self::base_role_for(request.level);
        let role_name = format!(
            "{}-{}-{}",
            settings.role_prefix,
            request.user_id,
            request.id.as_str()
        );
        let binding_name = format!("{}-binding", role_name);

        let role = RoleSpec {
            name: role_name.clone(),
            namespace: settings.namespace.clone(),
            base_role: base_role.to_string(),
        };
        applier
            .create_role(&role)
            .await
            .map_err(|err| err.with_module("kubernetes"))?;

        let binding = BindingSpec {
            name: binding_name.clone(),
            namespace: settings.namespace.clone(),
            role_name: role_name.clone(),
            subject: request.user_id.clone(),
        };

        if let Err(err) = applier.create_binding(&binding).await {
            // Applied fully or not at all: remove the role we just created.
            if let Err(cleanup) = applier.delete_role(&settings.namespace, &role_name).await {
                warn!(role = %role_name, error = %cleanup, "Rollback of orphaned role failed");
            }
            return Err(err.with_module("kubernetes"));
        }

        request.metadata.insert(
            "role_name".to_string(),
            serde_json::Value::String(role_name.clone()),
        );
        request.metadata.insert(
            "binding_name".to_string(),
            serde_json::Value::String(binding_name),
        );
        request.metadata.insert(
            "namespace".to_string(),
            serde_json::Value::String(settings.namespace.clone()),
        );
        request.metadata.insert(
            "base_role".to_string(),
            serde_json::Value::String(base_role.to_string()),
        );

        info!(
            request_id = %request.id,
            role = %role_name,
            base_role,
            "Kubernetes privileges granted"
        );

        Ok(())
    }

    async fn revoke_privilege(
        &self,
        grant_id: &GrantId,
        metadata: &Metadata,
    ) -> Result<(), ModuleError> {
        let (settings, applier) = self.state()?;

        let role_name = metadata
            .get("role_name")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                ModuleError::not_found(format!("reversal metadata for grant {}", grant_id))
            })?;
        let binding_name = metadata
            .get("binding_name")
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-binding", role_name));
        let namespace = metadata
            .get("namespace")
            .and_then(|value| value.as_str())
            .unwrap_or(&settings.namespace);

        // Objects already gone count as revoked; anything else aborts so the
        // sweep retries.
        match applier.delete_binding(namespace, &binding_name).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.with_module("kubernetes")),
        }

        match applier.delete_role(namespace, role_name).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.with_module("kubernetes")),
        }

        info!(grant_id = %grant_id, role = %role_name, "Kubernetes privileges revoked");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ModuleError> {
        let (_, applier) = self.state()?;
        applier
            .check()
            .await
            .map_err(|err| err.with_module("kubernetes"))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> ModuleConfig {
        ModuleConfig::new(
            "kubernetes",
            serde_json::json!({
                "kubeconfig": "/etc/aegis/kubeconfig",
                "namespace": "staging",
                "role_prefix": "aegis",
                "max_roles": 2,
            }),
        )
    }

    async fn initialized_module() -> (KubernetesModule, Arc<InMemoryApplier>) {
        let applier = Arc::new(InMemoryApplier::new());
        let module = KubernetesModule::with_applier(applier.clone());
        module.initialize(&test_config()).await.unwrap();
        (module, applier)
    }

    fn write_request() -> PrivilegeRequest {
        PrivilegeRequest::new(
            "u1",
            "kubernetes-staging",
            PrivilegeLevel::Write,
            "deploy fix",
            Duration::from_secs(1800),
        )
    }

    #[tokio::test]
    async fn test_grant_creates_role_and_binding() {
        let (module, applier) = initialized_module().await;
        let mut request = write_request();

        module.handle_privilege_request(&mut request).await.unwrap();

        let roles = applier.roles();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].base_role, "edit");
        assert!(roles[0].name.starts_with("aegis-u1-"));

        let bindings = applier.bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].subject, "u1");

        assert!(request.metadata.contains_key("role_name"));
        assert!(request.metadata.contains_key("binding_name"));
        assert_eq!(
            request.metadata["namespace"],
            serde_json::Value::String("staging".to_string())
        );
    }

    #[tokio::test]
    async fn test_failed_binding_rolls_back_role() {
        let (module, applier) = initialized_module().await;
        applier.fail_bindings(true);

        let mut request = write_request();
        let err = module.handle_privilege_request(&mut request).await.unwrap_err();
        assert!(!err.is_retryable());

        // No orphaned role survives a failed binding.
        assert_eq!(applier.role_count(), 0);
        assert!(request.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_role_ceiling_is_enforced() {
        let (module, _applier) = initialized_module().await;

        for _ in 0..2 {
            let mut request = write_request();
            module.handle_privilege_request(&mut request).await.unwrap();
        }

        let mut request = write_request();
        let err = module.handle_privilege_request(&mut request).await.unwrap_err();
        assert!(err.to_string().contains("role ceiling"));
    }

    #[tokio::test]
    async fn test_revoke_deletes_both_objects_idempotently() {
        let (module, applier) = initialized_module().await;
        let mut request = write_request();
        module.handle_privilege_request(&mut request).await.unwrap();

        let grant_id = GrantId::new("grant-1");
        module
            .revoke_privilege(&grant_id, &request.metadata)
            .await
            .unwrap();
        assert_eq!(applier.role_count(), 0);
        assert!(applier.bindings().is_empty());

        // Objects already gone: revoking again still succeeds.
        module
            .revoke_privilege(&grant_id, &request.metadata)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_revoke_without_metadata_is_not_found() {
        let (module, _applier) = initialized_module().await;

        let err = module
            .revoke_privilege(&GrantId::new("grant-x"), &Metadata::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_health_reflects_api_server() {
        let (module, applier) = initialized_module().await;
        assert!(module.health_check().await.is_ok());

        applier.set_unreachable(true);
        let err = module.health_check().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_root_level_uses_cluster_admin() {
        let (module, applier) = initialized_module().await;
        let mut request = write_request();
        request.level = PrivilegeLevel::Root;

        module.handle_privilege_request(&mut request).await.unwrap();
        assert_eq!(applier.roles()[0].base_role, "cluster-admin");
    }
}
