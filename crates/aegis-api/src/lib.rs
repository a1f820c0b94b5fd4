// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # aegis-api
//!
//! Control plane HTTP API for AEGIS.
//!
//! This crate exposes the privilege lifecycle, the operator-facing job
//! queue, module health, and operator liveness over REST. Handlers only
//! speak the `aegis-core` interfaces; resource-specific behavior stays in
//! the modules.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorBody};
pub use server::{ApiServer, ApiServerBuilder};
pub use state::{AppState, AppStateBuilder};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
