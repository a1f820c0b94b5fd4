// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # aegis-store
//!
//! In-memory implementation of the AEGIS persistence traits.
//!
//! The control plane only requires CRUD, a compare-and-set primitive on job
//! status, and range queries by status/expiry; [`MemoryStore`] provides all
//! of that behind `parking_lot` locks with O(1) atomic counters for
//! statistics. Durable backends implement the same `aegis-core` store traits.

#![deny(unsafe_code)]

pub mod memory;

pub use memory::{MemoryStore, StoreStats};
