//! # Permissions
//!
//! Catalog permissions and permission sets for the RBAC system.
//! A permission grants one action on one resource, written `resource:action`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// The `(resource, action)` identity of a permission.
///
/// # Example
///
/// ```
/// use governance_rbac::PermissionKey;
///
/// let key = PermissionKey::new("dashboard", "read");
/// assert_eq!(key.to_string(), "dashboard:read");
/// assert_eq!(PermissionKey::parse("dashboard:read"), Some(key));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionKey {
    /// Resource the permission applies to (e.g. "users")
    pub resource: String,
    /// Action allowed on the resource (e.g. "read")
    pub action: String,
}

impl PermissionKey {
    /// Create a key from resource and action.
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Parse from `resource:action`.
    ///
    /// # Returns
    ///
    /// `None` when either side is empty or the separator is missing
    pub fn parse(s: &str) -> Option<Self> {
        let (resource, action) = s.split_once(':')?;
        if resource.is_empty() || action.is_empty() {
            return None;
        }
        Some(Self::new(resource, action))
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

/// A permission in the catalog.
///
/// `(resource, action)` is unique across the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    /// Unique permission ID
    pub id: Uuid,
    /// Human-readable name (e.g. "View Dashboard")
    pub name: String,
    /// Resource the permission applies to
    pub resource: String,
    /// Action allowed on the resource
    pub action: String,
    /// Optional description
    pub description: Option<String>,
    /// When the permission was created
    pub created_at: DateTime<Utc>,
    /// When the permission was last updated
    pub updated_at: Option<DateTime<Utc>>,
}

impl Permission {
    /// Creates a new catalog permission.
    pub fn new(input: NewPermission) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            resource: input.resource,
            action: input.action,
            description: input.description,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// The `(resource, action)` identity of this permission.
    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(self.resource.clone(), self.action.clone())
    }

    /// Check whether this permission grants `action` on `resource`.
    pub fn grants(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.action == action
    }

    /// Merge a patch into this permission.
    pub fn apply(&mut self, patch: PermissionPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(resource) = patch.resource {
            self.resource = resource;
        }
        if let Some(action) = patch.action {
            self.action = action;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Input for creating a permission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPermission {
    /// Human-readable name
    pub name: String,
    /// Resource
    pub resource: String,
    /// Action
    pub action: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPermission {
    /// Input for `resource:action` with the given display name.
    pub fn new(name: impl Into<String>, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource: resource.into(),
            action: action.into(),
            description: None,
        }
    }
}

/// Partial update for a permission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionPatch {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New resource
    #[serde(default)]
    pub resource: Option<String>,
    /// New action
    #[serde(default)]
    pub action: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<Option<String>>,
}

/// A set of granted permissions.
///
/// Uses internal string representation so membership checks are a single
/// hash lookup.
///
/// # Example
///
/// ```
/// use governance_rbac::{PermissionKey, PermissionSet};
///
/// let mut set = PermissionSet::new();
/// set.add(PermissionKey::new("dashboard", "read"));
/// set.add(PermissionKey::new("users", "create"));
///
/// assert!(set.has("dashboard", "read"));
/// assert!(!set.has("dashboard", "write"));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    /// The permissions in this set, as `resource:action` strings.
    permissions: HashSet<String>,
}

impl PermissionSet {
    /// Create a new empty permission set.
    pub fn new() -> Self {
        Self {
            permissions: HashSet::new(),
        }
    }

    /// Add a permission to the set.
    pub fn add(&mut self, key: PermissionKey) {
        self.permissions.insert(key.to_string());
    }

    /// Add multiple permissions to the set.
    pub fn add_all<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = PermissionKey>,
    {
        for key in keys {
            self.add(key);
        }
    }

    /// Check whether `action` on `resource` is granted.
    pub fn has(&self, resource: &str, action: &str) -> bool {
        self.permissions.contains(&format!("{}:{}", resource, action))
    }

    /// Check whether a key is granted.
    pub fn contains(&self, key: &PermissionKey) -> bool {
        self.permissions.contains(&key.to_string())
    }

    /// Get all permissions as sorted `resource:action` strings.
    ///
    /// This is the form the presentation layer gates menus with.
    pub fn to_strings(&self) -> Vec<String> {
        let mut strings: Vec<String> = self.permissions.iter().cloned().collect();
        strings.sort();
        strings
    }

    /// Get the count of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl FromIterator<PermissionKey> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionKey>>(iter: T) -> Self {
        let mut set = PermissionSet::new();
        set.add_all(iter);
        set
    }
}
