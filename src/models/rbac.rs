//! Role-Based Access Control (RBAC) models
//!
//! Roles and groups are defined by the admin backend. The console only reads
//! them to decide which actions to offer; enforcement stays server-side.

use serde::{Deserialize, Serialize};

/// A role held by an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier
    pub id: String,

    /// Role name (e.g., "admin", "developer", "viewer")
    pub name: String,

    /// Description of the role
    #[serde(default)]
    pub description: Option<String>,

    /// Whether this is a built-in system role
    #[serde(default)]
    pub is_system: bool,

    /// Permissions assigned to this role
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// A permission granted to a role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// Resource this permission applies to
    pub resource: Resource,

    /// Action allowed on the resource
    pub action: Action,
}

impl Permission {
    pub fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }

    /// Whether this permission grants `action` on `resource`
    pub fn grants(&self, resource: Resource, action: Action) -> bool {
        self.resource == resource && (self.action == action || self.action == Action::Admin)
    }
}

/// Resources managed through the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// API assignments and their versions
    ApiAssignments,
    /// Macro definitions and their versions
    MacroDefs,
    /// App clients and their secrets
    Clients,
    /// Access groups
    Groups,
    /// Roles
    Roles,
    /// Modules
    Modules,
    /// Datasources
    Datasources,
}

impl Resource {
    /// Get all available resources
    pub fn all() -> Vec<Resource> {
        vec![
            Resource::ApiAssignments,
            Resource::MacroDefs,
            Resource::Clients,
            Resource::Groups,
            Resource::Roles,
            Resource::Modules,
            Resource::Datasources,
        ]
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::ApiAssignments => "api_assignments",
            Resource::MacroDefs => "macro_defs",
            Resource::Clients => "clients",
            Resource::Groups => "groups",
            Resource::Roles => "roles",
            Resource::Modules => "modules",
            Resource::Datasources => "datasources",
        }
    }
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read/view resource
    Read,
    /// Create new resource
    Create,
    /// Update existing resource (includes versioning)
    Update,
    /// Delete resource
    Delete,
    /// Publish or unpublish a version
    Publish,
    /// Run debug requests
    Execute,
    /// Full admin access
    Admin,
}

impl Action {
    /// Get all available actions
    pub fn all() -> Vec<Action> {
        vec![
            Action::Read,
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::Publish,
            Action::Execute,
            Action::Admin,
        ]
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Publish => "publish",
            Action::Execute => "execute",
            Action::Admin => "admin",
        }
    }
}

/// Access group bundling API assignments for clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub api_assignment_ids: Vec<String>,
}

/// Built-in system roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRole {
    Admin,
    Developer,
    Viewer,
}

impl SystemRole {
    /// Get the role name
    pub fn name(&self) -> &'static str {
        match self {
            SystemRole::Admin => "admin",
            SystemRole::Developer => "developer",
            SystemRole::Viewer => "viewer",
        }
    }

    /// Get all system roles
    pub fn all() -> Vec<SystemRole> {
        vec![SystemRole::Admin, SystemRole::Developer, SystemRole::Viewer]
    }

    /// Create the Role struct for this system role
    pub fn to_role(&self) -> Role {
        Role {
            id: format!("system:{}", self.name()),
            name: self.name().to_string(),
            description: None,
            is_system: true,
            permissions: self.default_permissions(),
        }
    }

    /// Get default permissions for this role
    pub fn default_permissions(&self) -> Vec<Permission> {
        match self {
            SystemRole::Admin => Resource::all()
                .into_iter()
                .map(|resource| Permission::new(resource, Action::Admin))
                .collect(),
            SystemRole::Developer => {
                let mut perms: Vec<Permission> = Resource::all()
                    .into_iter()
                    .map(|resource| Permission::new(resource, Action::Read))
                    .collect();
                for resource in [Resource::ApiAssignments, Resource::MacroDefs] {
                    perms.push(Permission::new(resource, Action::Create));
                    perms.push(Permission::new(resource, Action::Update));
                    perms.push(Permission::new(resource, Action::Execute));
                }
                perms
            }
            SystemRole::Viewer => Resource::all()
                .into_iter()
                .map(|resource| Permission::new(resource, Action::Read))
                .collect(),
        }
    }
}
