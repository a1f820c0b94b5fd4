// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # aegis-config
//!
//! Configuration schema and loader for AEGIS.
//!
//! Module settings are modelled as a tagged union — one variant per known
//! module kind — so required fields are checked when the file is loaded,
//! before any module initializes.

#![deny(unsafe_code)]

pub mod loader;
pub mod schema;

pub use loader::{apply_env_overrides, load_config};
pub use schema::{
    AegisConfig, ControlPlaneConfig, ModuleSettings, OperatorConfig, PolicyConfig,
};
