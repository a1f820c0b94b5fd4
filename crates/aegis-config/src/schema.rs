// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema.
//!
//! Module settings are a tagged union — one variant per known module kind,
//! selected by the `module` key at load time — so required fields are
//! checked before any module's `initialize` runs, not by runtime map
//! probing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use aegis_core::error::ConfigError;
use aegis_core::module::ModuleConfig;
use aegis_kubernetes::KubernetesSettings;
use aegis_mysql::MysqlSettings;

// =============================================================================
// AegisConfig
// =============================================================================

/// Root configuration shared by the control plane and operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AegisConfig {
    /// Control plane settings.
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,
    /// Operator settings.
    #[serde(default)]
    pub operator: OperatorConfig,
    /// Comma-separated list of enabled modules, in activation order.
    #[serde(default)]
    pub enabled_modules: String,
    /// Per-module settings, one entry per module kind.
    #[serde(default)]
    pub modules: Vec<ModuleSettings>,
}

impl Default for AegisConfig {
    fn default() -> Self {
        Self {
            control_plane: ControlPlaneConfig::default(),
            operator: OperatorConfig::default(),
            enabled_modules: String::new(),
            modules: Vec::new(),
        }
    }
}

impl AegisConfig {
    /// Returns the configuration entry for a module, by name.
    pub fn module_settings(&self, name: &str) -> Option<&ModuleSettings> {
        self.modules
            .iter()
            .find(|entry| entry.module_name().eq_ignore_ascii_case(name))
    }

    /// Builds the [`ModuleConfig`] handed to a module at initialization.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingField`] when no settings entry exists for the
    /// module.
    pub fn module_config(&self, name: &str) -> Result<ModuleConfig, ConfigError> {
        let entry = self
            .module_settings(name)
            .ok_or_else(|| ConfigError::missing_field(format!("modules.{}", name)))?;
        Ok(entry.to_module_config())
    }

    /// Validates the whole configuration.
    ///
    /// Checks structural consistency here; each module's own settings were
    /// already type-checked by the tagged-union decode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control_plane.policy.min_duration > self.control_plane.policy.max_duration {
            return Err(ConfigError::validation(
                "control_plane.policy",
                "min_duration exceeds max_duration",
            ));
        }

        for name in self
            .enabled_modules
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            if self.module_settings(name).is_none() {
                return Err(ConfigError::missing_field(format!("modules.{}", name)));
            }
        }

        for entry in &self.modules {
            entry.validate()?;
        }

        Ok(())
    }
}

// =============================================================================
// ControlPlaneConfig
// =============================================================================

/// Control plane settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlPlaneConfig {
    /// Address the API binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port the API listens on.
    #[serde(default = "default_control_plane_port")]
    pub port: u16,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Per-module health probe deadline.
    #[serde(default = "default_health_timeout", with = "humantime_serde")]
    pub health_check_timeout: Duration,
    /// Interval between expiry sweep cycles.
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Policy bounds enforced by the rule engine.
    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_control_plane_port() -> u16 {
    8080
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_health_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(30)
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_control_plane_port(),
            request_timeout: default_request_timeout(),
            health_check_timeout: default_health_timeout(),
            sweep_interval: default_sweep_interval(),
            policy: PolicyConfig::default(),
        }
    }
}

/// Rule engine bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Floor on requested durations.
    #[serde(default = "default_min_duration", with = "humantime_serde")]
    pub min_duration: Duration,
    /// Ceiling on requested durations.
    #[serde(default = "default_max_duration", with = "humantime_serde")]
    pub max_duration: Duration,
}

fn default_min_duration() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_duration() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_duration: default_min_duration(),
            max_duration: default_max_duration(),
        }
    }
}

// =============================================================================
// OperatorConfig
// =============================================================================

/// Operator agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    /// Operator identifier; generated when left empty.
    #[serde(default)]
    pub id: String,
    /// Base URL of the control plane API.
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,
    /// Port of the operator's local health/privilege server.
    #[serde(default = "default_operator_port")]
    pub port: u16,
    /// Interval between job poll cycles.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Interval between heartbeats.
    #[serde(default = "default_heartbeat_interval", with = "humantime_serde")]
    pub heartbeat_interval: Duration,
}

fn default_control_plane_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_operator_port() -> u16 {
    8081
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(15)
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            control_plane_url: default_control_plane_url(),
            port: default_operator_port(),
            poll_interval: default_poll_interval(),
            heartbeat_interval: default_heartbeat_interval(),
        }
    }
}

impl OperatorConfig {
    /// Returns the configured operator id, generating one when empty.
    pub fn effective_id(&self) -> String {
        if self.id.is_empty() {
            format!("operator-{}", uuid::Uuid::new_v4().simple())
        } else {
            self.id.clone()
        }
    }
}

// =============================================================================
// ModuleSettings (tagged union)
// =============================================================================

/// Settings for one module, selected by the `module` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "module", rename_all = "lowercase")]
pub enum ModuleSettings {
    /// MySQL module settings.
    Mysql(MysqlSettings),
    /// Kubernetes module settings.
    Kubernetes(KubernetesSettings),
}

impl ModuleSettings {
    /// Returns the module name this entry configures.
    pub fn module_name(&self) -> &'static str {
        match self {
            ModuleSettings::Mysql(_) => "mysql",
            ModuleSettings::Kubernetes(_) => "kubernetes",
        }
    }

    /// Validates the entry's fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ModuleSettings::Mysql(settings) => settings.validate(),
            ModuleSettings::Kubernetes(settings) => settings.validate(),
        }
    }

    /// Converts the typed settings into the wire [`ModuleConfig`].
    pub fn to_module_config(&self) -> ModuleConfig {
        let settings = match self {
            ModuleSettings::Mysql(settings) => serde_json::to_value(settings),
            ModuleSettings::Kubernetes(settings) => serde_json::to_value(settings),
        }
        // Settings structs serialize infallibly (no non-string keys).
        .unwrap_or(serde_json::Value::Null);

        ModuleConfig::new(self.module_name(), settings)
    }
}

// =============================================================================
// Tests
// =============================================================================
