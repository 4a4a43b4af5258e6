//! Leadership records
//!
//! A leadership record assigns one membership as the leader of its
//! organization for a period of time. Records are never hard-deleted; each
//! successor points back at the record it retired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::LeadershipType;

/// A leadership tenure.
///
/// # Succession chain
///
/// ```text
/// record A (retired) <── replaced_record_id ── record B (active)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadershipRecord {
    /// Unique record ID
    pub id: Uuid,

    /// Led organization
    pub organization_id: Uuid,

    /// Leader's membership in that organization
    pub membership_id: Uuid,

    /// Type of tenure
    pub leadership_type: LeadershipType,

    /// Start of the tenure
    pub start_date: DateTime<Utc>,

    /// End of the tenure
    pub end_date: Option<DateTime<Utc>>,

    /// Whether this is the organization's current leader
    pub active: bool,

    /// Reason for the appointment
    pub reason: Option<String>,

    /// Record this one superseded
    pub replaced_record_id: Option<Uuid>,

    /// Who made the appointment
    pub assigned_by: Option<Uuid>,
}

impl LeadershipRecord {
    /// Creates a new active record starting now.
    pub fn new(organization_id: Uuid, membership_id: Uuid, leadership_type: LeadershipType) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id,
            membership_id,
            leadership_type,
            start_date: Utc::now(),
            end_date: None,
            active: true,
            reason: None,
            replaced_record_id: None,
            assigned_by: None,
        }
    }

    /// Set the appointment reason.
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Link the record this one supersedes.
    pub fn replacing(mut self, replaced: Option<Uuid>) -> Self {
        self.replaced_record_id = replaced;
        self
    }

    /// Record who made the appointment.
    pub fn assigned_by(mut self, actor: Uuid) -> Self {
        self.assigned_by = Some(actor);
        self
    }

    /// Retire the tenure now.
    ///
    /// # Returns
    ///
    /// `false` when the record was already retired
    pub fn retire(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.end_date = Some(Utc::now());
        true
    }
}

/// Simplified view of an organization's current leader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLeader {
    /// Leadership record ID
    pub record_id: Uuid,

    /// Led organization
    pub organization_id: Uuid,

    /// Leader's membership
    pub membership_id: Uuid,

    /// Leader's user ID
    pub user_id: Uuid,

    /// Leader's name from the directory
    pub name: Option<String>,

    /// Leader's email from the directory
    pub email: Option<String>,

    /// Type of tenure
    pub leadership_type: LeadershipType,

    /// Start of the tenure
    pub start_date: DateTime<Utc>,
}

/// One entry in an organization's leadership history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadershipHistoryEntry {
    /// The record itself
    pub record: LeadershipRecord,

    /// Leader's user ID, when the membership is still resolvable
    pub user_id: Option<Uuid>,

    /// The record this one superseded
    pub replaced: Option<LeadershipRecord>,

    /// The record that superseded this one
    pub successor_id: Option<Uuid>,
}
