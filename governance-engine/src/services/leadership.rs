//! Leadership succession
//!
//! Per organization the state is either vacant (no active record) or led
//! (exactly one active record).
//!
//! ```text
//!            assign_leader                 assign_leader
//!   Vacant ───────────────→ Led(r1) ─────────────────────→ Led(r2)
//!     ↑                        │          r1 retired,
//!     └──── end_leadership ────┘          r2.replaced_record_id = r1
//! ```
//!
//! Handover is one transaction: validate the membership, retire the
//! current record, insert the new one. Every new assignment retires the
//! current holder whatever the leadership types involved.

use governance_org::{ActiveLeader, LeadershipHistoryEntry, LeadershipRecord, LeadershipType};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::directory::UserDirectory;
use crate::error::{GovernanceError, GovernanceResult};
use crate::store::{GovernanceStore, Tables};

/// Leadership succession service.
pub struct LeadershipService<S> {
    store: Arc<S>,
    directory: Arc<dyn UserDirectory>,
}

impl<S: GovernanceStore> LeadershipService<S> {
    /// Create a service over `store`, resolving leader names through
    /// `directory`.
    pub fn new(store: Arc<S>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// Make a membership the leader of an organization.
    ///
    /// Any active leader is retired in the same transaction and linked
    /// from the new record through `replaced_record_id`.
    ///
    /// # Arguments
    ///
    /// * `organization_id` - Organization to lead
    /// * `membership_id` - Leader's active membership in that organization
    /// * `leadership_type` - Definitive or acting tenure
    /// * `reason` - Free-text reason for the appointment
    /// * `actor` - User making the appointment
    ///
    /// # Returns
    ///
    /// The new active record
    ///
    /// # Errors
    ///
    /// - `NotFound` if the organization is absent or tombstoned
    /// - `Validation` if the membership is absent, belongs to another
    ///   organization, or has ended
    #[instrument(skip(self, reason))]
    pub async fn assign_leader(
        &self,
        organization_id: Uuid,
        membership_id: Uuid,
        leadership_type: LeadershipType,
        reason: Option<String>,
        actor: Uuid,
    ) -> GovernanceResult<LeadershipRecord> {
        let record = self
            .store
            .transact(move |t| {
                if t.live_organization(organization_id).is_none() {
                    return Err(GovernanceError::not_found("Organization", organization_id));
                }
                validate_leader_membership(t, organization_id, membership_id)?;
                let replaced = retire_current(t, organization_id);

                let record = LeadershipRecord::new(organization_id, membership_id, leadership_type)
                    .with_reason(reason)
                    .replacing(replaced)
                    .assigned_by(actor);
                t.insert_leadership(record.clone())?;
                Ok(record)
            })
            .await?;

        info!(
            record_id = %record.id,
            replaced = ?record.replaced_record_id,
            leadership_type = leadership_type.as_str(),
            "Leader assigned"
        );
        Ok(record)
    }

    /// End a tenure without a successor.
    ///
    /// Ending an already-ended record changes nothing.
    ///
    /// # Errors
    ///
    /// `NotFound` if the record is absent
    #[instrument(skip(self))]
    pub async fn end_leadership(&self, record_id: Uuid) -> GovernanceResult<LeadershipRecord> {
        let (record, changed) = self
            .store
            .transact(move |t| {
                let record = t
                    .leadership_record_mut(record_id)
                    .ok_or_else(|| GovernanceError::not_found("Leadership record", record_id))?;
                let changed = record.retire();
                Ok((record.clone(), changed))
            })
            .await?;

        if changed {
            info!(%record_id, "Leadership ended");
        } else {
            debug!(%record_id, "Leadership already ended");
        }
        Ok(record)
    }

    /// The current leader of an organization, if any.
    ///
    /// # Errors
    ///
    /// `Consistency` if the active record points at a missing membership
    pub async fn get_active_leader(&self, organization_id: Uuid) -> GovernanceResult<Option<ActiveLeader>> {
        let active = self
            .store
            .read(move |t| {
                let Some(record) = t.active_leadership(organization_id) else {
                    return Ok(None);
                };
                let membership = t.membership(record.membership_id).ok_or_else(|| {
                    GovernanceError::Consistency(format!(
                        "Leadership record {} references missing membership {}",
                        record.id, record.membership_id
                    ))
                })?;
                Ok(Some((record.clone(), membership.user_id)))
            })
            .await?;

        let Some((record, user_id)) = active else {
            return Ok(None);
        };
        let user = self.directory.find_user_by_id(user_id).await?;
        Ok(Some(ActiveLeader {
            record_id: record.id,
            organization_id: record.organization_id,
            membership_id: record.membership_id,
            user_id,
            name: user.as_ref().map(|u| u.name.clone()),
            email: user.map(|u| u.email),
            leadership_type: record.leadership_type,
            start_date: record.start_date,
        }))
    }

    /// The active record of an organization if it has the given type.
    pub async fn get_active_by_type(
        &self,
        organization_id: Uuid,
        leadership_type: LeadershipType,
    ) -> GovernanceResult<Option<LeadershipRecord>> {
        self.store
            .read(move |t| {
                Ok(t.active_leadership(organization_id)
                    .filter(|r| r.leadership_type == leadership_type)
                    .cloned())
            })
            .await
    }

    /// Every record of an organization, newest first.
    ///
    /// Each entry carries the record it replaced and the ID of the record
    /// that replaced it.
    pub async fn get_history(&self, organization_id: Uuid) -> GovernanceResult<Vec<LeadershipHistoryEntry>> {
        self.store
            .read(move |t| {
                let mut records: Vec<(usize, &LeadershipRecord)> = t
                    .leadership_records()
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.organization_id == organization_id)
                    .collect();
                // Same start instant: the later insert is the newer tenure.
                records.sort_by(|(ia, a), (ib, b)| {
                    b.start_date.cmp(&a.start_date).then_with(|| ib.cmp(ia))
                });

                Ok(records
                    .into_iter()
                    .map(|(_, record)| LeadershipHistoryEntry {
                        record: record.clone(),
                        user_id: t.membership(record.membership_id).map(|m| m.user_id),
                        replaced: record
                            .replaced_record_id
                            .and_then(|id| t.leadership_record(id))
                            .cloned(),
                        successor_id: t
                            .leadership_records()
                            .iter()
                            .find(|r| r.replaced_record_id == Some(record.id))
                            .map(|r| r.id),
                    })
                    .collect())
            })
            .await
    }

    /// Get a record by ID.
    pub async fn get_by_id(&self, record_id: Uuid) -> GovernanceResult<LeadershipRecord> {
        self.store
            .read(move |t| {
                t.leadership_record(record_id)
                    .cloned()
                    .ok_or_else(|| GovernanceError::not_found("Leadership record", record_id))
            })
            .await
    }

    /// Whether the record exists and is active.
    pub async fn is_active_record(&self, record_id: Uuid) -> GovernanceResult<bool> {
        self.store
            .read(move |t| Ok(t.leadership_record(record_id).map_or(false, |r| r.active)))
            .await
    }
}

fn validate_leader_membership(t: &Tables, organization_id: Uuid, membership_id: Uuid) -> GovernanceResult<()> {
    let membership = t
        .membership(membership_id)
        .ok_or_else(|| GovernanceError::validation("Membership not found"))?;
    if membership.organization_id != organization_id {
        return Err(GovernanceError::validation(
            "Membership does not belong to this organization",
        ));
    }
    if !membership.active {
        return Err(GovernanceError::validation("Membership is no longer active"));
    }
    Ok(())
}

/// Retire the organization's active record, returning its ID.
fn retire_current(t: &mut Tables, organization_id: Uuid) -> Option<Uuid> {
    let current = t.active_leadership(organization_id)?.id;
    if let Some(record) = t.leadership_record_mut(current) {
        record.retire();
    }
    Some(current)
}
