// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # aegis-operator
//!
//! Distributed execution agent for AEGIS.
//!
//! Operators run in separate processes with no inbound reachability from the
//! control plane, so all interaction is outbound:
//!
//! - **Client**: HTTP client for registration, heartbeats, and the job
//!   protocol
//! - **Poll**: the poll → claim → dispatch → report loop
//! - **Dispatch**: routes claimed jobs by type to handlers backed by the
//!   locally registered modules
//! - **Server**: local HTTP server exposing module health and direct
//!   privilege apply/revoke
//!
//! The poll, heartbeat, and server loops run on independent timers and share
//! nothing mutable beyond `Arc`ed module instances.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod dispatch;
pub mod error;
pub mod poll;
pub mod server;

pub use client::ControlPlaneClient;
pub use dispatch::{JobDispatcher, JobHandler, JobOutcome, PingHandler};
pub use error::{OperatorError, OperatorResult};
pub use poll::{OperatorAgent, PollReport};
pub use server::OperatorServer;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
