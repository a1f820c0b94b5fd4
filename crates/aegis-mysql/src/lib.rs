// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # aegis-mysql
//!
//! MySQL resource module for AEGIS.
//!
//! Implements the `aegis-core` module contract for MySQL databases:
//! temporary users are created with the requested privileges and dropped at
//! revocation. Statement transport sits behind the [`AdminChannel`] trait so
//! the wire mechanics stay a deployment concern; the in-memory channel backs
//! tests and single-node runs.

#![deny(unsafe_code)]

pub mod channel;
pub mod module;
pub mod settings;

pub use channel::{AdminChannel, InMemoryChannel};
pub use module::MysqlModule;
pub use settings::MysqlSettings;
