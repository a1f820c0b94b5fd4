// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! Loads the YAML configuration file, applies environment overrides, and
//! validates the result before anything else starts.

use std::path::Path;

use tracing::{debug, info};

use aegis_core::error::ConfigError;

use crate::schema::AegisConfig;

// =============================================================================
// Loading
// =============================================================================

/// Loads, overrides, and validates a configuration file.
///
/// # Environment Overrides
///
/// - `AEGIS_ENABLED_MODULES` — replaces `enabled_modules`
/// - `AEGIS_CONTROL_PLANE_PORT` — replaces `control_plane.port`
/// - `AEGIS_CONTROL_PLANE_URL` — replaces `operator.control_plane_url`
/// - `AEGIS_OPERATOR_ID` — replaces `operator.id`
pub fn load_config(path: impl AsRef<Path>) -> Result<AegisConfig, ConfigError> {
    let path = path.as_ref();

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut config: AegisConfig = serde_yaml::from_str(&raw)
        .map_err(|err| ConfigError::parse(path.display().to_string(), err.to_string()))?;

    apply_env_overrides(&mut config)?;
    config.validate()?;

    info!(
        path = %path.display(),
        enabled_modules = %config.enabled_modules,
        "Configuration loaded"
    );

    Ok(config)
}

/// Applies environment variable overrides to a loaded configuration.
pub fn apply_env_overrides(config: &mut AegisConfig) -> Result<(), ConfigError> {
    if let Ok(modules) = std::env::var("AEGIS_ENABLED_MODULES") {
        debug!(modules = %modules, "Overriding enabled modules from environment");
        config.enabled_modules = modules;
    }

    if let Ok(port) = std::env::var("AEGIS_CONTROL_PLANE_PORT") {
        config.control_plane.port = port.parse().map_err(|_| {
            ConfigError::validation("AEGIS_CONTROL_PLANE_PORT", "must be a port number")
        })?;
    }

    if let Ok(url) = std::env::var("AEGIS_CONTROL_PLANE_URL") {
        config.operator.control_plane_url = url;
    }

    if let Ok(id) = std::env::var("AEGIS_OPERATOR_ID") {
        config.operator.id = id;
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
