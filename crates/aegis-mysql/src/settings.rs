// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! MySQL module settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use aegis_core::error::ConfigError;
use aegis_core::module::ModuleConfig;

// =============================================================================
// MysqlSettings
// =============================================================================

/// Connection settings for the MySQL module.
///
/// `host`, `port`, `user`, and `password` are required; the rest carry
/// defaults. Timeouts accept humantime strings (`"5s"`, `"10m"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MysqlSettings {
    /// Database host.
    #[serde(default)]
    pub host: String,
    /// Database port.
    #[serde(default)]
    pub port: u16,
    /// Administrative user the module connects as.
    #[serde(default)]
    pub user: String,
    /// Password for the administrative user.
    #[serde(default)]
    pub password: String,
    /// Connection pool ceiling.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connect deadline.
    #[serde(default = "default_connection_timeout", with = "humantime_serde")]
    pub connection_timeout: Duration,
    /// Idle connection lifetime.
    #[serde(default = "default_idle_timeout", with = "humantime_serde")]
    pub idle_timeout: Duration,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(600)
}

impl MysqlSettings {
    /// Decodes and validates settings from a module configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidSettings`] when the payload does not decode
    /// - [`ConfigError::MissingField`] for absent required fields
    /// - [`ConfigError::Validation`] for out-of-range values
    pub fn from_config(config: &ModuleConfig) -> Result<Self, ConfigError> {
        let settings: MysqlSettings = serde_json::from_value(config.settings.clone())
            .map_err(|err| ConfigError::invalid_settings(&config.module, err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates required fields and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::missing_field("host"));
        }
        if self.port == 0 {
            return Err(ConfigError::missing_field("port"));
        }
        if self.user.is_empty() {
            return Err(ConfigError::missing_field("user"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::missing_field("password"));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "max_connections",
                "must be positive",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
