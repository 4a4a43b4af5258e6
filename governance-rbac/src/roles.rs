//! # Roles
//!
//! Named bundles of permissions and the join rows that attach roles to
//! permissions, profiles and users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A role in the catalog.
///
/// Role names are globally unique. System roles cannot be deleted.
///
/// # Example
///
/// ```
/// use governance_rbac::{NewRole, Role};
///
/// let role = Role::new(NewRole::new("Viewer"));
/// assert_eq!(role.name, "Viewer");
/// assert!(!role.is_system);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role ID
    pub id: Uuid,
    /// Globally unique name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// System-managed roles cannot be deleted
    pub is_system: bool,
    /// When the role was created
    pub created_at: DateTime<Utc>,
    /// When the role was last updated
    pub updated_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Creates a new role.
    pub fn new(input: NewRole) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            is_system: input.is_system,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Merge a patch into this role.
    pub fn apply(&mut self, patch: RolePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(is_system) = patch.is_system {
            self.is_system = is_system;
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Input for creating a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    /// Globally unique name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Mark as a system role
    #[serde(default)]
    pub is_system: bool,
}

impl NewRole {
    /// Input for a non-system role.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_system: false,
        }
    }

    /// Mark as a system role.
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update for a role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolePatch {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<Option<String>>,
    /// New system flag
    #[serde(default)]
    pub is_system: Option<bool>,
}

/// Role listing entry with aggregate counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSummary {
    /// The role
    pub role: Role,
    /// Number of permissions attached
    pub permission_count: usize,
    /// Number of profiles holding the role
    pub profile_count: usize,
    /// Number of users holding the role directly
    pub user_count: usize,
}

/// Join row: role grants permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    /// Role ID
    pub role_id: Uuid,
    /// Permission ID
    pub permission_id: Uuid,
    /// When the grant was made
    pub assigned_at: DateTime<Utc>,
}

impl RolePermission {
    /// Creates a new grant row.
    pub fn new(role_id: Uuid, permission_id: Uuid) -> Self {
        Self {
            role_id,
            permission_id,
            assigned_at: Utc::now(),
        }
    }
}

/// Join row: profile holds role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRole {
    /// Profile ID
    pub profile_id: Uuid,
    /// Role ID
    pub role_id: Uuid,
    /// Who made the assignment
    pub assigned_by: Option<Uuid>,
    /// When the assignment was made
    pub assigned_at: DateTime<Utc>,
}

impl ProfileRole {
    /// Creates a new assignment row.
    pub fn new(profile_id: Uuid, role_id: Uuid, assigned_by: Option<Uuid>) -> Self {
        Self {
            profile_id,
            role_id,
            assigned_by,
            assigned_at: Utc::now(),
        }
    }
}

/// Join row: user holds role directly, outside any profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    /// User ID
    pub user_id: Uuid,
    /// Role ID
    pub role_id: Uuid,
    /// When the assignment was made
    pub assigned_at: DateTime<Utc>,
}

impl UserRole {
    /// Creates a new assignment row.
    pub fn new(user_id: Uuid, role_id: Uuid) -> Self {
        Self {
            user_id,
            role_id,
            assigned_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_creation() {
        let role = Role::new(NewRole::new("Admin").system().with_description("Full access"));
        assert!(role.is_system);
        assert_eq!(role.description.as_deref(), Some("Full access"));
        assert!(role.updated_at.is_none());
    }

    #[test]
    fn test_role_patch() {
        let mut role = Role::new(NewRole::new("Moderator"));
        role.apply(RolePatch {
            name: Some("Reviewer".to_string()),
            description: Some(None),
            ..RolePatch::default()
        });
        assert_eq!(role.name, "Reviewer");
        assert!(role.description.is_none());
        assert!(!role.is_system);
        assert!(role.updated_at.is_some());
    }

    #[test]
    fn test_join_rows() {
        let role_id = Uuid::now_v7();
        let profile_id = Uuid::now_v7();
        let actor = Uuid::now_v7();

        let row = ProfileRole::new(profile_id, role_id, Some(actor));
        assert_eq!(row.assigned_by, Some(actor));

        let grant = RolePermission::new(role_id, Uuid::now_v7());
        assert_eq!(grant.role_id, role_id);
    }
}
