//! # Governance RBAC (Role-Based Access Control)
//!
//! This crate provides the role and permission catalog types for the
//! governance engine.
//!
//! ## Overview
//!
//! The governance-rbac crate handles:
//! - **Permissions**: Catalog entries granting one action on one resource
//! - **Roles**: Named bundles of permissions, some protected as system roles
//! - **Join rows**: Role→Permission, Profile→Role and User→Role links
//! - **Permission Sets**: Deduplicated `resource:action` sets with O(1) checks
//! - **Grants**: Effective permissions plus role names for one subject
//!
//! ## Architecture
//!
//! ```text
//! Profile ─→ ProfileRole ─→ Role ─→ RolePermission ─→ Permission
//! User    ─→ UserRole    ─┘
//!
//! Permission key = resource:action
//!   "dashboard:read"
//!   "users:create"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use governance_rbac::{PermissionKey, PermissionSet};
//!
//! let mut set = PermissionSet::new();
//! set.add(PermissionKey::new("dashboard", "read"));
//! assert!(set.has("dashboard", "read"));
//! assert_eq!(set.to_strings(), vec!["dashboard:read"]);
//! ```

pub mod grants;
pub mod permissions;
pub mod roles;

// Re-export main types for convenience
pub use grants::Grants;
pub use permissions::{NewPermission, Permission, PermissionKey, PermissionPatch, PermissionSet};
pub use roles::{NewRole, ProfileRole, Role, RolePatch, RolePermission, RoleSummary, UserRole};
