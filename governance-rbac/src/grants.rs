//! # Grants
//!
//! The effective access of one subject: the permissions reachable through
//! its roles and the role names themselves. Built once per subject, then
//! queried in constant time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::permissions::{PermissionKey, PermissionSet};

/// Effective permissions and roles of a profile or user.
///
/// # Example
///
/// ```
/// use governance_rbac::{Grants, PermissionKey};
///
/// let mut grants = Grants::new();
/// grants.add_role("Viewer");
/// grants.add_permission(PermissionKey::new("dashboard", "read"));
///
/// assert!(grants.has_role("Viewer"));
/// assert!(grants.has_permission("dashboard", "read"));
/// assert!(!grants.has_permission("dashboard", "write"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants {
    /// Union of permissions over all roles
    pub permissions: PermissionSet,
    /// Names of the roles held
    pub roles: HashSet<String>,
}

impl Grants {
    /// Create empty grants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a held role.
    pub fn add_role(&mut self, name: impl Into<String>) {
        self.roles.insert(name.into());
    }

    /// Record a reachable permission.
    pub fn add_permission(&mut self, key: PermissionKey) {
        self.permissions.add(key);
    }

    /// Check whether `action` on `resource` is granted.
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        self.permissions.has(resource, action)
    }

    /// Check whether a role with this name is held.
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains(name)
    }

    /// Whether nothing is granted.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }
}
