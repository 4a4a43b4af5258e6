//! Membership domain models
//!
//! This module provides the membership entity that links a person to an
//! organization. Memberships are never deleted: removal ends the membership
//! and keeps the row as history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::MembershipRole;

/// Membership linking a user to an organization.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use governance_org::{Membership, MembershipRole};
///
/// let org_id = Uuid::now_v7();
/// let user_id = Uuid::now_v7();
/// let membership = Membership::new(org_id, user_id, MembershipRole::Officer);
/// assert!(membership.active);
/// assert!(membership.end_date.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    /// Unique membership ID
    pub id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the organization
    pub role: MembershipRole,

    /// When the membership started
    pub start_date: DateTime<Utc>,

    /// When the membership ended
    pub end_date: Option<DateTime<Utc>>,

    /// Whether the membership is active
    pub active: bool,

    /// Free-text notes
    pub notes: Option<String>,
}

impl Membership {
    /// Creates a new active membership starting now.
    pub fn new(organization_id: Uuid, user_id: Uuid, role: MembershipRole) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id,
            user_id,
            role,
            start_date: Utc::now(),
            end_date: None,
            active: true,
            notes: None,
        }
    }

    /// Override the start date.
    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = start_date;
        self
    }

    /// Attach notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// End the membership now.
    ///
    /// # Returns
    ///
    /// `false` when the membership had already ended (nothing changed)
    pub fn end(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.end_date = Some(Utc::now());
        true
    }

    /// Check whether this membership is the active link for a (user, org) pair.
    pub fn is_active_for(&self, organization_id: Uuid, user_id: Uuid) -> bool {
        self.active && self.organization_id == organization_id && self.user_id == user_id
    }
}

/// Input for adding a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMembership {
    /// Target organization
    pub organization_id: Uuid,
    /// User to add
    pub user_id: Uuid,
    /// Role, defaults to `Member`
    #[serde(default)]
    pub role: Option<MembershipRole>,
    /// Start date, defaults to now
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewMembership {
    /// Input with default role and start date.
    pub fn new(organization_id: Uuid, user_id: Uuid) -> Self {
        Self {
            organization_id,
            user_id,
            role: None,
            start_date: None,
            notes: None,
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: MembershipRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Set the start date.
    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Set the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Build the membership row.
    pub fn into_membership(self) -> Membership {
        let mut membership = Membership::new(
            self.organization_id,
            self.user_id,
            self.role.unwrap_or_default(),
        );
        if let Some(start_date) = self.start_date {
            membership.start_date = start_date;
        }
        membership.notes = self.notes;
        membership
    }
}

/// A membership joined with the member's directory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberView {
    /// The membership row
    pub membership: Membership,
    /// Directory entry of the member, if still present
    pub user: Option<crate::user::UserSummary>,
}
