//! User profiles
//!
//! A profile is a named context a user acts as. Roles are attached to
//! profiles, so switching the default profile changes which permissions
//! apply to the user's subsequent requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileKind {
    /// The user acting as themselves
    #[default]
    Personal,
    /// The user acting through one of their memberships
    Organizational,
    /// The user acting for an outside party
    External,
}

impl ProfileKind {
    /// Get string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "PERSONAL",
            Self::Organizational => "ORGANIZATIONAL",
            Self::External => "EXTERNAL",
        }
    }

    /// Parse kind from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PERSONAL" => Some(Self::Personal),
            "ORGANIZATIONAL" => Some(Self::Organizational),
            "EXTERNAL" => Some(Self::External),
            _ => None,
        }
    }

    /// Whether a profile of this kind is bound to a membership.
    pub fn requires_membership(&self) -> bool {
        matches!(self, Self::Organizational)
    }
}

/// A named context owned by one user.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use governance_org::{Profile, ProfileKind};
///
/// let user_id = Uuid::now_v7();
/// let profile = Profile::new(user_id, "Personal", ProfileKind::Personal, user_id);
/// assert!(profile.is_live());
/// assert!(!profile.is_default);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique profile ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Display name
    pub name: String,

    /// Avatar URL
    pub avatar: Option<String>,

    /// Kind of profile
    pub kind: ProfileKind,

    /// Whether the user currently acts as this profile
    pub is_default: bool,

    /// Whether the profile can be switched into
    pub active: bool,

    /// Membership the profile acts through (organizational profiles)
    pub membership_id: Option<Uuid>,

    /// When the profile was created
    pub created_at: DateTime<Utc>,

    /// Who created the profile
    pub created_by: Uuid,

    /// When the profile was last updated
    pub updated_at: Option<DateTime<Utc>>,

    /// Who last updated the profile
    pub updated_by: Option<Uuid>,

    /// Tombstone timestamp
    pub deleted_at: Option<DateTime<Utc>>,

    /// Who deleted the profile
    pub deleted_by: Option<Uuid>,
}

impl Profile {
    /// Creates a new active, non-default profile.
    pub fn new(user_id: Uuid, name: impl Into<String>, kind: ProfileKind, created_by: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            name: name.into(),
            avatar: None,
            kind,
            is_default: false,
            active: true,
            membership_id: None,
            created_at: Utc::now(),
            created_by,
            updated_at: None,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
        }
    }

    /// Whether the profile is neither deactivated nor deleted.
    pub fn is_live(&self) -> bool {
        self.active && self.deleted_at.is_none()
    }

    /// Stamp the update audit fields.
    pub fn touch(&mut self, updated_by: Uuid) {
        self.updated_at = Some(Utc::now());
        self.updated_by = Some(updated_by);
    }

    /// Soft-delete the profile.
    pub fn mark_deleted(&mut self, deleted_by: Uuid) {
        self.active = false;
        self.is_default = false;
        self.deleted_at = Some(Utc::now());
        self.deleted_by = Some(deleted_by);
    }
}

/// Input for creating a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    /// Owning user
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// Kind of profile
    #[serde(default)]
    pub kind: ProfileKind,
    /// Organization the profile acts in (organizational profiles)
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    /// Make this the user's default profile
    #[serde(default)]
    pub is_default: bool,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
}

impl NewProfile {
    /// Input for a profile of the given kind.
    pub fn new(user_id: Uuid, name: impl Into<String>, kind: ProfileKind) -> Self {
        Self {
            user_id,
            name: name.into(),
            kind,
            organization_id: None,
            is_default: false,
            avatar: None,
        }
    }

    /// Bind the profile to an organization.
    pub fn in_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Request the default flag.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Partial update for a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    /// New display name
    #[serde(default)]
    pub name: Option<String>,
    /// New avatar
    #[serde(default)]
    pub avatar: Option<Option<String>>,
    /// New default flag
    #[serde(default)]
    pub is_default: Option<bool>,
    /// New active flag
    #[serde(default)]
    pub active: Option<bool>,
}
