//! Organization domain models
//!
//! This module provides the Organization entity, the unit of the governance
//! hierarchy. Organizations link to an optional parent and are never removed
//! physically: deletion stamps a tombstone that read paths filter out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationStatus {
    /// Operating unit
    #[default]
    Active,
    /// Temporarily not operating
    Inactive,
    /// Formally dissolved
    Dissolved,
}

impl OrganizationStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Dissolved => "DISSOLVED",
        }
    }

    /// Parse status from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "INACTIVE" => Some(Self::Inactive),
            "DISSOLVED" => Some(Self::Dissolved),
            _ => None,
        }
    }
}

/// Kind of organization.
///
/// Structural units form the formal hierarchy; working groups are ad-hoc
/// bodies that may still hang under a structural parent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationKind {
    /// Formal hierarchical unit (ministry, directorate, division, ...)
    #[default]
    Structural,
    /// Non-hierarchical working group
    WorkingGroup,
}

impl OrganizationKind {
    /// Get string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structural => "STRUCTURAL",
            Self::WorkingGroup => "WORKING_GROUP",
        }
    }

    /// Parse kind from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "STRUCTURAL" => Some(Self::Structural),
            "WORKING_GROUP" | "WORKINGGROUP" => Some(Self::WorkingGroup),
            _ => None,
        }
    }
}

/// An organization is a node in the governance hierarchy.
///
/// # Architecture
///
/// ```text
/// Organization
///   ├─ Parent (optional, self-referential)
///   ├─ Members (via Membership)
///   └─ Leadership history (via LeadershipRecord)
/// ```
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use governance_org::{NewOrganization, Organization, OrganizationStatus};
///
/// let actor = Uuid::now_v7();
/// let org = Organization::new(NewOrganization::named("Ministry"), actor);
/// assert_eq!(org.name, "Ministry");
/// assert_eq!(org.status, OrganizationStatus::Active);
/// assert!(!org.is_deleted());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Short form of the name
    pub abbreviation: Option<String>,

    /// Lifecycle status
    pub status: OrganizationStatus,

    /// Structural unit or working group
    pub kind: OrganizationKind,

    /// Echelon level; `None` means top of hierarchy. Informational only.
    pub echelon: Option<u8>,

    /// Whether the unit manages its own budget
    pub has_budget: bool,

    /// Parent organization, `None` for roots
    pub parent_id: Option<Uuid>,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// Who created the organization
    pub created_by: Uuid,

    /// When the organization was last updated
    pub updated_at: Option<DateTime<Utc>>,

    /// Who last updated the organization
    pub updated_by: Option<Uuid>,

    /// Tombstone timestamp
    pub deleted_at: Option<DateTime<Utc>>,

    /// Who deleted the organization
    pub deleted_by: Option<Uuid>,
}

impl Organization {
    /// Creates a new organization from validated input.
    ///
    /// Status and kind fall back to `Active` and `Structural` when the
    /// input leaves them unset.
    pub fn new(input: NewOrganization, created_by: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            abbreviation: input.abbreviation,
            status: input.status.unwrap_or_default(),
            kind: input.kind.unwrap_or_default(),
            echelon: input.echelon,
            has_budget: input.has_budget,
            parent_id: input.parent_id,
            created_at: Utc::now(),
            created_by,
            updated_at: None,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
        }
    }

    /// Check whether the organization carries a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check whether the organization is a root (no declared parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Merge a patch into this organization and stamp the audit fields.
    pub fn apply(&mut self, patch: OrganizationPatch, updated_by: Uuid) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(abbreviation) = patch.abbreviation {
            self.abbreviation = abbreviation;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(echelon) = patch.echelon {
            self.echelon = echelon;
        }
        if let Some(has_budget) = patch.has_budget {
            self.has_budget = has_budget;
        }
        if let Some(parent_id) = patch.parent_id {
            self.parent_id = parent_id;
        }
        self.updated_at = Some(Utc::now());
        self.updated_by = Some(updated_by);
    }

    /// Stamp the tombstone. Children are left untouched.
    pub fn mark_deleted(&mut self, deleted_by: Uuid) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.deleted_by = Some(deleted_by);
        self.updated_at = Some(now);
        self.updated_by = Some(deleted_by);
    }
}

/// Input for creating an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrganization {
    /// Organization name (required, non-empty)
    pub name: String,
    /// Short form of the name
    #[serde(default)]
    pub abbreviation: Option<String>,
    /// Defaults to `Active`
    #[serde(default)]
    pub status: Option<OrganizationStatus>,
    /// Defaults to `Structural`
    #[serde(default)]
    pub kind: Option<OrganizationKind>,
    /// Echelon level, `None` for top of hierarchy
    #[serde(default)]
    pub echelon: Option<u8>,
    /// Budget flag
    #[serde(default)]
    pub has_budget: bool,
    /// Parent organization
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

impl NewOrganization {
    /// Input with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the parent organization.
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the organization kind.
    pub fn with_kind(mut self, kind: OrganizationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set the abbreviation.
    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }

    /// Set the echelon level.
    pub fn with_echelon(mut self, echelon: u8) -> Self {
        self.echelon = Some(echelon);
        self
    }
}

/// Partial update for an organization.
///
/// Outer `None` leaves the field untouched; for nullable fields the inner
/// `None` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationPatch {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New abbreviation
    #[serde(default)]
    pub abbreviation: Option<Option<String>>,
    /// New status
    #[serde(default)]
    pub status: Option<OrganizationStatus>,
    /// New kind
    #[serde(default)]
    pub kind: Option<OrganizationKind>,
    /// New echelon level
    #[serde(default)]
    pub echelon: Option<Option<u8>>,
    /// New budget flag
    #[serde(default)]
    pub has_budget: Option<bool>,
    /// New parent (re-parenting)
    #[serde(default)]
    pub parent_id: Option<Option<Uuid>>,
}
