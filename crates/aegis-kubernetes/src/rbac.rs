// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! RBAC object application layer.
//!
//! The module composes role and binding objects; this trait applies them to
//! the cluster. The seam keeps the API-server mechanics a deployment concern
//! and gives tests a recording implementation with fault injection.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use aegis_core::error::ModuleError;

// =============================================================================
// RBAC Objects
// =============================================================================

/// A namespaced role to be created on the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role name.
    pub name: String,
    /// Namespace the role lives in.
    pub namespace: String,
    /// The built-in cluster role it aggregates (view, edit, admin, ...).
    pub base_role: String,
}

/// A binding tying a role to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSpec {
    /// Binding name.
    pub name: String,
    /// Namespace the binding lives in.
    pub namespace: String,
    /// The role being bound.
    pub role_name: String,
    /// The user the role is bound to.
    pub subject: String,
}

// =============================================================================
// RbacApplier Trait
// =============================================================================

/// Applies RBAC objects to a cluster.
#[async_trait]
pub trait RbacApplier: Send + Sync + std::fmt::Debug {
    /// Creates a role.
    async fn create_role(&self, role: &RoleSpec) -> Result<(), ModuleError>;

    /// Creates a role binding.
    async fn create_binding(&self, binding: &BindingSpec) -> Result<(), ModuleError>;

    /// Deletes a role. Returns `NotFound` if it does not exist.
    async fn delete_role(&self, namespace: &str, name: &str) -> Result<(), ModuleError>;

    /// Deletes a binding. Returns `NotFound` if it does not exist.
    async fn delete_binding(&self, namespace: &str, name: &str) -> Result<(), ModuleError>;

    /// Cheap API server liveness check.
    async fn check(&self) -> Result<(), ModuleError>;

    /// Number of currently existing roles created through this applier.
    fn role_count(&self) -> usize;
}

// =============================================================================
// InMemoryApplier
// =============================================================================

/// An in-process applier that records objects instead of calling a cluster.
///
/// Backs tests and single-node development runs.
#[derive(Debug, Default)]
pub struct InMemoryApplier {
    roles: Mutex<BTreeMap<String, RoleSpec>>,
    bindings: Mutex<BTreeMap<String, BindingSpec>>,
    unreachable: AtomicBool,
    fail_bindings: AtomicBool,
}

impl InMemoryApplier {
    /// Creates an empty applier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the cluster unreachable (all operations fail transiently).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Makes binding creation fail (for rollback tests).
    pub fn fail_bindings(&self, fail: bool) {
        self.fail_bindings.store(fail, Ordering::SeqCst);
    }

    /// Returns the currently existing roles.
    pub fn roles(&self) -> Vec<RoleSpec> {
        self.roles.lock().values().cloned().collect()
    }

    /// Returns the currently existing bindings.
    pub fn bindings(&self) -> Vec<BindingSpec> {
        self.bindings.lock().values().cloned().collect()
    }

    fn gate(&self) -> Result<(), ModuleError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ModuleError::transient("kubernetes api server unreachable"));
        }
        Ok(())
    }

    fn key(namespace: &str, name: &str) -> String {
        format!("{}/{}", namespace, name)
    }
}

#[async_trait]
impl RbacApplier for InMemoryApplier {
    async fn create_role(&self, role: &RoleSpec) -> Result<(), ModuleError> {
        self.gate()?;
        self.roles
            .lock()
            .insert(Self::key(&role.namespace, &role.name), role.clone());
        Ok(())
    }

    async fn create_binding(&self, binding: &BindingSpec) -> Result<(), ModuleError> {
        self.gate()?;
        if self.fail_bindings.load(Ordering::SeqCst) {
            return Err(ModuleError::failed("binding admission rejected"));
        }
        self.bindings
            .lock()
            .insert(Self::key(&binding.namespace, &binding.name), binding.clone());
        Ok(())
    }

    async fn delete_role(&self, namespace: &str, name: &str) -> Result<(), ModuleError> {
        self.gate()?;
        self.roles
            .lock()
            .remove(&Self::key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| ModuleError::not_found(format!("role {}/{}", namespace, name)))
    }

    async fn delete_binding(&self, namespace: &str, name: &str) -> Result<(), ModuleError> {
        self.gate()?;
        self.bindings
            .lock()
            .remove(&Self::key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| ModuleError::not_found(format!("binding {}/{}", namespace, name)))
    }

    async fn check(&self) -> Result<(), ModuleError> {
        self.gate()
    }

    fn role_count(&self) -> usize {
        self.roles.lock().len()
    }
}

// =============================================================================
// Tests
// =============================================================================
