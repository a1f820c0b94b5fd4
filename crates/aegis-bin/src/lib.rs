// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # aegis-bin
//!
//! CLI binary for the AEGIS privilege escalation system.
//!
//! One binary runs both halves of the system:
//!
//! - `aegis server` — the control plane: HTTP API, privilege lifecycle,
//!   expiry sweep
//! - `aegis operator` — a distributed agent: job poll loop, heartbeats,
//!   local health/privilege server
//! - `aegis validate` — configuration validation without starting anything
//! - `aegis version` — version information
//!
//! ## Usage
//!
//! ```bash
//! # Start the control plane (default command)
//! aegis
//!
//! # Start with a custom config
//! aegis server -c /etc/aegis/config.yaml
//!
//! # Start an operator pointed at a remote control plane
//! aegis operator --control-plane-url http://aegis.internal:8080
//!
//! # Validate configuration
//! aegis validate --show-config
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{ControlPlaneRuntime, OperatorRuntime};
pub use shutdown::ShutdownCoordinator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
