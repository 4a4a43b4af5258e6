//! Membership service
//!
//! Links directory users to organizations. A user holds at most one active
//! membership per organization; removal ends the row instead of deleting
//! it so history survives.

use governance_org::{MemberView, Membership, MembershipRole, NewMembership, UserSummary};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::GovernanceConfig;
use crate::directory::UserDirectory;
use crate::error::{GovernanceError, GovernanceResult};
use crate::store::GovernanceStore;

/// Membership service.
pub struct MembershipService<S> {
    store: Arc<S>,
    directory: Arc<dyn UserDirectory>,
    config: Arc<GovernanceConfig>,
}

impl<S: GovernanceStore> MembershipService<S> {
    /// Create a service over `store`, resolving users through `directory`.
    pub fn new(store: Arc<S>, directory: Arc<dyn UserDirectory>, config: Arc<GovernanceConfig>) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    /// Add a user to an organization.
    ///
    /// Role defaults to `Member` and start date to now. The duplicate check
    /// runs inside the insert transaction.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user or the organization is absent
    /// - `Conflict` if the user is already an active member
    #[instrument(skip(self, input), fields(organization_id = %input.organization_id, user_id = %input.user_id))]
    pub async fn add_member(&self, input: NewMembership) -> GovernanceResult<Membership> {
        if self.directory.find_user_by_id(input.user_id).await?.is_none() {
            return Err(GovernanceError::not_found("User", input.user_id));
        }

        let result = self
            .store
            .transact(move |t| {
                if t.live_organization(input.organization_id).is_none() {
                    return Err(GovernanceError::not_found("Organization", input.organization_id));
                }
                let membership = input.into_membership();
                t.insert_membership(membership.clone())?;
                Ok(membership)
            })
            .await;

        match result {
            Ok(membership) => {
                info!(membership_id = %membership.id, role = membership.role.as_str(), "Member added");
                Ok(membership)
            }
            Err(err @ GovernanceError::Conflict(_)) => {
                warn!("Duplicate active membership rejected");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Add a user, looked up by email, to an organization.
    ///
    /// # Errors
    ///
    /// `NotFound` if no user has that email; otherwise as [`Self::add_member`]
    #[instrument(skip(self, notes))]
    pub async fn add_member_by_email(
        &self,
        organization_id: Uuid,
        email: &str,
        role: Option<MembershipRole>,
        notes: Option<String>,
    ) -> GovernanceResult<Membership> {
        let user = self
            .directory
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| GovernanceError::not_found("User", email))?;

        let mut input = NewMembership::new(organization_id, user.id);
        input.role = role;
        input.notes = notes;
        self.add_member(input).await
    }

    /// Change the role of a membership in place.
    ///
    /// # Errors
    ///
    /// `NotFound` if the membership is absent
    #[instrument(skip(self))]
    pub async fn update_role(&self, membership_id: Uuid, role: MembershipRole) -> GovernanceResult<Membership> {
        let membership = self
            .store
            .transact(move |t| {
                let membership = t
                    .membership_mut(membership_id)
                    .ok_or_else(|| GovernanceError::not_found("Membership", membership_id))?;
                membership.role = role;
                Ok(membership.clone())
            })
            .await?;

        info!(%membership_id, role = role.as_str(), "Membership role updated");
        Ok(membership)
    }

    /// End a membership now.
    ///
    /// Ending an already-ended membership changes nothing.
    ///
    /// # Errors
    ///
    /// `NotFound` if the membership is absent
    #[instrument(skip(self))]
    pub async fn remove_member(&self, membership_id: Uuid) -> GovernanceResult<Membership> {
        let (membership, changed) = self
            .store
            .transact(move |t| {
                let membership = t
                    .membership_mut(membership_id)
                    .ok_or_else(|| GovernanceError::not_found("Membership", membership_id))?;
                let changed = membership.end();
                Ok((membership.clone(), changed))
            })
            .await?;

        if changed {
            info!(%membership_id, "Member removed");
        } else {
            debug!(%membership_id, "Membership already ended");
        }
        Ok(membership)
    }

    /// Get a membership by ID, ended or not.
    pub async fn get_by_id(&self, membership_id: Uuid) -> GovernanceResult<Membership> {
        self.store
            .read(move |t| {
                t.membership(membership_id)
                    .cloned()
                    .ok_or_else(|| GovernanceError::not_found("Membership", membership_id))
            })
            .await
    }

    /// Whether the membership exists and is active.
    pub async fn is_active_membership(&self, membership_id: Uuid) -> GovernanceResult<bool> {
        self.store
            .read(move |t| Ok(t.membership(membership_id).map_or(false, |m| m.active)))
            .await
    }

    /// Active members of an organization, newest first, with their
    /// directory entries.
    pub async fn list_members(&self, organization_id: Uuid) -> GovernanceResult<Vec<MemberView>> {
        let memberships = self
            .store
            .read(move |t| {
                Ok(newest_first(
                    t.memberships()
                        .iter()
                        .filter(|m| m.active && m.organization_id == organization_id)
                        .cloned()
                        .collect(),
                ))
            })
            .await?;

        let mut members = Vec::with_capacity(memberships.len());
        for membership in memberships {
            let user = self.directory.find_user_by_id(membership.user_id).await?;
            members.push(MemberView { membership, user });
        }
        Ok(members)
    }

    /// Active memberships of a user, newest first.
    pub async fn list_user_memberships(&self, user_id: Uuid) -> GovernanceResult<Vec<Membership>> {
        self.store
            .read(move |t| {
                Ok(newest_first(
                    t.memberships()
                        .iter()
                        .filter(|m| m.active && m.user_id == user_id)
                        .cloned()
                        .collect(),
                ))
            })
            .await
    }

    /// Number of active members of an organization.
    pub async fn member_count(&self, organization_id: Uuid) -> GovernanceResult<usize> {
        self.store
            .read(move |t| {
                Ok(t.memberships()
                    .iter()
                    .filter(|m| m.active && m.organization_id == organization_id)
                    .count())
            })
            .await
    }

    /// Directory users matching `query` who are not active members of the
    /// organization, for member pickers.
    ///
    /// Matching is a case-insensitive substring test on name or email. A
    /// blank query yields nothing. `limit` falls back to the configured
    /// default and is clamped to the configured maximum.
    pub async fn search_users_for_org(
        &self,
        query: &str,
        organization_id: Uuid,
        limit: Option<usize>,
    ) -> GovernanceResult<Vec<UserSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self.config.search_limit(limit);

        let members: HashSet<Uuid> = self
            .store
            .read(move |t| {
                Ok(t.memberships()
                    .iter()
                    .filter(|m| m.active && m.organization_id == organization_id)
                    .map(|m| m.user_id)
                    .collect())
            })
            .await?;

        let found = self.directory.search_users(query).await?;
        Ok(found
            .into_iter()
            .filter(|u| !members.contains(&u.id))
            .take(limit)
            .collect())
    }
}

fn newest_first(mut memberships: Vec<Membership>) -> Vec<Membership> {
    memberships.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    memberships
}
