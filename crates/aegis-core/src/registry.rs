// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Module registry.
//!
//! Holds modules by case-insensitive name and resolves the enabled subset
//! from configuration. The registry is always constructed explicitly and
//! passed to the components that need lookup — there is no global instance.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{RegistryError, RegistryResult};
use crate::module::Module;

// =============================================================================
// ModuleRegistry
// =============================================================================

/// A registry of resource modules keyed by lower-cased name.
///
/// The registry owns no state beyond the name → module mapping. Lookup is
/// lock-free via `DashMap`, making it safe to share across the HTTP handlers,
/// the lifecycle manager, and operator loops.
pub struct ModuleRegistry {
    modules: DashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            modules: DashMap::new(),
        }
    }

    /// Registers a module.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateModule`] if a module with the same
    /// case-insensitive name is already registered.
    pub fn register(&self, module: Arc<dyn Module>) -> RegistryResult<()> {
        let name = module.name().to_ascii_lowercase();

        match self.modules.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::duplicate(name)),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(module);
                tracing::debug!(module = %name, "Registered module");
                Ok(())
            }
        }
    }

    /// Retrieves a module by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ModuleNotFound`] for unknown names.
    pub fn get(&self, name: &str) -> RegistryResult<Arc<dyn Module>> {
        self.modules
            .get(&name.to_ascii_lowercase())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::not_found(name))
    }

    /// Returns `true` if a module with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(&name.to_ascii_lowercase())
    }

    /// Resolves the enabled subset from a comma-separated list.
    ///
    /// Names are whitespace-trimmed and resolved in caller order; empty
    /// segments are skipped.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NoModulesEnabled`] if the list resolves to nothing
    /// - [`RegistryError::ModuleNotFound`] if any named module was never
    ///   registered — misconfiguration surfaces at startup, not at first use
    pub fn enabled_modules(&self, csv: &str) -> RegistryResult<Vec<Arc<dyn Module>>> {
        let mut enabled = Vec::new();

        for name in csv.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            enabled.push(self.get(name)?);
        }

        if enabled.is_empty() {
            return Err(RegistryError::NoModulesEnabled);
        }

        Ok(enabled)
    }

    /// Resolves the module responsible for a resource identifier.
    ///
    /// A resource either names a module exactly (`mysql`) or carries the
    /// module name as a dashed prefix (`mysql-prod-1`). The longest matching
    /// registered name wins.
    pub fn module_for_resource(&self, resource_id: &str) -> Option<Arc<dyn Module>> {
        let resource = resource_id.to_ascii_lowercase();

        if let Some(entry) = self.modules.get(&resource) {
            return Some(entry.value().clone());
        }

        let mut best: Option<(usize, Arc<dyn Module>)> = None;
        for entry in self.modules.iter() {
            let name = entry.key();
            if resource.starts_with(&format!("{}-", name)) {
                let longer = best.as_ref().map(|(len, _)| name.len() > *len).unwrap_or(true);
                if longer {
                    best = Some((name.len(), entry.value().clone()));
                }
            }
        }

        best.map(|(_, module)| module)
    }

    /// Returns the names of all registered modules, sorted.
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.module_names())
            .finish()
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

    struct NamedModule {
        name: String,
    }

    impl NamedModule {
        fn new(name: &str) -> Arc<dyn Module> {
            Arc::new(Self {
                name: name.to_string(),
            })
        }
    }

    #[async_trait]
    impl Module for NamedModule {
        fn name(&self) -> &str {
            &self.name
        }

        fn describe(&self) -> &str {
            "test module"
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
    }

    #[test]
    fn test_register_and_get() {
        let registry = ModuleRegistry::new();
        registry.register(NamedModule::new("mysql")).unwrap();

        assert!(registry.get("mysql").is_ok());
        assert!(registry.get("MySQL").is_ok());
        assert!(registry.get("oracle").is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_is_case_insensitive() {
        let registry = ModuleRegistry::new();
        registry.register(NamedModule::new("MySQL")).unwrap();

        let err = registry.register(NamedModule::new("mysql")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateModule { .. }));
    }

    #[test]
    fn test_enabled_modules_preserves_order_and_trims() {
        let registry = ModuleRegistry::new();
        registry.register(NamedModule::new("mysql")).unwrap();
        registry.register(NamedModule::new("kubernetes")).unwrap();

        let enabled = registry.enabled_modules(" kubernetes , mysql ,").unwrap();
        assert_eq!(enabled.len(), 2);
        assert_eq!(enabled[0].name(), "kubernetes");
        assert_eq!(enabled[1].name(), "mysql");
    }

    #[test]
    fn test_enabled_modules_fails_on_unknown_name() {
        let registry = ModuleRegistry::new();
        registry.register(NamedModule::new("mysql")).unwrap();

        let err = registry.enabled_modules("mysql,oracle").unwrap_err();
        assert!(matches!(err, RegistryError::ModuleNotFound { .. }));
    }

    #[test]
    fn test_enabled_modules_rejects_empty_list() {
        let registry = ModuleRegistry::new();
        assert!(matches!(
            registry.enabled_modules(" , "),
            Err(RegistryError::NoModulesEnabled)
        ));
    }

    #[test]
    fn test_module_for_resource() {
        let registry = ModuleRegistry::new();
        registry.register(NamedModule::new("mysql")).unwrap();
        registry.register(NamedModule::new("kubernetes")).unwrap();

        assert_eq!(
            registry.module_for_resource("mysql-prod-1").unwrap().name(),
            "mysql"
        );
        assert_eq!(registry.module_for_resource("mysql").unwrap().name(), "mysql");
        assert!(registry.module_for_resource("postgres-1").is_none());
    }
}
