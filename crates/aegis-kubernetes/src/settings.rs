// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Kubernetes module settings.

use serde::{Deserialize, Serialize};

use aegis_core::error::ConfigError;
use aegis_core::module::ModuleConfig;

// =============================================================================
// KubernetesSettings
// =============================================================================

/// Cluster access settings for the Kubernetes module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KubernetesSettings {
    /// Path to the kubeconfig file.
    #[serde(default)]
    pub kubeconfig: String,
    /// Kubeconfig context to use; empty selects the current context.
    #[serde(default)]
    pub context: String,
    /// Namespace temporary roles are created in.
    #[serde(default)]
    pub namespace: String,
    /// Prefix applied to generated role and binding names.
    #[serde(default)]
    pub role_prefix: String,
    /// Ceiling on concurrently existing generated roles.
    #[serde(default = "default_max_roles")]
    pub max_roles: u32,
}

fn default_max_roles() -> u32 {
    64
}

impl KubernetesSettings {
    /// Decodes and validates settings from a module configuration.
    pub fn from_config(config: &ModuleConfig) -> Result<Self, ConfigError> {
        let settings: KubernetesSettings = serde_json::from_value(config.settings.clone())
            .map_err(|err| ConfigError::invalid_settings(&config.module, err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates required fields and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kubeconfig.is_empty() {
            return Err(ConfigError::missing_field("kubeconfig"));
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::missing_field("namespace"));
        }
        if self.role_prefix.is_empty() {
            return Err(ConfigError::missing_field("role_prefix"));
        }
        if self.max_roles == 0 {
            return Err(ConfigError::validation("max_roles", "must be positive"));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_and_validates() {
        let config = ModuleConfig::new(
            "kubernetes",
            serde_json::json!({
                "kubeconfig": "/etc/aegis/kubeconfig",
                "namespace": "staging",
                "role_prefix": "aegis",
            }),
        );

        let settings = KubernetesSettings::from_config(&config).unwrap();
        assert_eq!(settings.namespace, "staging");
        assert_eq!(settings.max_roles, 64);
        assert!(settings.context.is_empty());
    }

    #[test]
    fn test_missing_required_fields() {
        let config = ModuleConfig::new(
            "kubernetes",
            serde_json::json!({"kubeconfig": "/etc/aegis/kubeconfig"}),
        );

        let err = KubernetesSettings::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "namespace"));
    }

    #[test]
    fn test_zero_max_roles_rejected() {
        let config = ModuleConfig::new(
            "kubernetes",
            serde_json::json!({
                "kubeconfig": "/etc/aegis/kubeconfig",
                "namespace": "staging",
                "role_prefix": "aegis",
                "max_roles": 0,
            }),
        );

        let err = KubernetesSettings::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }
}
