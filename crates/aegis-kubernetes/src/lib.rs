// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # aegis-kubernetes
//!
//! Kubernetes resource module for AEGIS.
//!
//! Implements the `aegis-core` module contract for cluster RBAC: temporary
//! namespaced roles (aggregating the built-in view/edit/admin roles) are
//! created with a binding for the requesting user and deleted at revocation.
//! Object application sits behind the [`RbacApplier`] trait; the in-memory
//! applier backs tests and single-node runs.

#![deny(unsafe_code)]

pub mod module;
pub mod rbac;
pub mod settings;

pub use module::KubernetesModule;
pub use rbac::{BindingSpec, InMemoryApplier, RbacApplier, RoleSpec};
pub use settings::KubernetesSettings;
