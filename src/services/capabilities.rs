//! Capability checks
//!
//! The admin backend enforces access control. The console only asks whether
//! an action should be offered, so it can refuse early with
//! [`ConsoleError::Forbidden`] instead of sending a request that will fail.

use std::collections::HashSet;

use crate::models::{Action, Permission, Resource, Role, SystemRole, VersionedKind};
use crate::utils::{ConsoleError, ConsoleResult};

/// Answers whether the current operator may perform an action
pub trait Capabilities: Send + Sync {
    fn allows(&self, resource: Resource, action: Action) -> bool;

    /// Fail with `Forbidden` unless `action` is allowed
    fn require(&self, resource: Resource, action: Action) -> ConsoleResult<()> {
        if self.allows(resource, action) {
            Ok(())
        } else {
            Err(ConsoleError::forbidden(format!(
                "{} on {} is not permitted",
                action.as_str(),
                resource.as_str()
            )))
        }
    }
}

/// Grants everything; for tooling that runs with an admin token
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Capabilities for AllowAll {
    fn allows(&self, _resource: Resource, _action: Action) -> bool {
        true
    }
}

/// Effective permissions resolved from the operator's roles
#[derive(Debug, Clone, Default)]
pub struct RoleCapabilities {
    permissions: HashSet<Permission>,
}

impl RoleCapabilities {
    pub fn from_roles(roles: &[Role]) -> Self {
        let permissions = roles
            .iter()
            .flat_map(|role| role.permissions.iter().copied())
            .collect();
        Self { permissions }
    }

    /// Capabilities of one built-in role
    pub fn system(role: SystemRole) -> Self {
        Self::from_roles(&[role.to_role()])
    }
}

impl Capabilities for RoleCapabilities {
    fn allows(&self, resource: Resource, action: Action) -> bool {
        self.permissions.iter().any(|p| p.grants(resource, action))
    }
}

/// Resource guarding a versioned entity kind
pub fn resource_for(kind: VersionedKind) -> Resource {
    match kind {
        VersionedKind::ApiAssignment => Resource::ApiAssignments,
        VersionedKind::MacroDef => Resource::MacroDefs,
    }
}
