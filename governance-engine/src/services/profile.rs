//! Profile service
//!
//! A profile is a context a user acts as. Each user with at least one
//! profile has exactly one default; every write that touches the default
//! flag clears and sets it in one transaction.

use governance_org::{NewProfile, Profile, ProfilePatch};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::require_name;
use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::store::{GovernanceStore, Tables};

/// Profile service.
pub struct ProfileService<S> {
    store: Arc<S>,
    config: Arc<GovernanceConfig>,
}

impl<S: GovernanceStore> ProfileService<S> {
    /// Create a service over `store`.
    pub fn new(store: Arc<S>, config: Arc<GovernanceConfig>) -> Self {
        Self { store, config }
    }

    /// Create a profile.
    ///
    /// The profile becomes the default when requested or when the user has
    /// no default yet. Organizational profiles act through the user's
    /// active membership in `input.organization_id`.
    ///
    /// # Errors
    ///
    /// - `Validation` for a bad name, an organizational profile without an
    ///   active membership, or an organization on another kind of profile
    /// - `NotFound` if the organization is absent or tombstoned
    /// - `Conflict` if the user already has a profile with this name
    #[instrument(skip(self, input), fields(user_id = %input.user_id, kind = input.kind.as_str()))]
    pub async fn create_profile(&self, input: NewProfile, actor: Uuid) -> GovernanceResult<Profile> {
        let name = require_name("Profile name", &input.name, self.config.name_max_len)?;
        match (input.kind.requires_membership(), input.organization_id) {
            (true, None) => {
                return Err(GovernanceError::validation(
                    "Organizational profiles need an organization",
                ))
            }
            (false, Some(_)) => {
                return Err(GovernanceError::validation(format!(
                    "{} profiles cannot be bound to an organization",
                    input.kind.as_str()
                )))
            }
            _ => {}
        }

        let profile = self
            .store
            .transact(move |t| {
                let mut profile = Profile::new(input.user_id, name, input.kind, actor);
                profile.avatar = input.avatar;

                if let Some(organization_id) = input.organization_id {
                    if t.live_organization(organization_id).is_none() {
                        return Err(GovernanceError::not_found("Organization", organization_id));
                    }
                    let membership = t
                        .active_membership(organization_id, input.user_id)
                        .ok_or_else(|| {
                            GovernanceError::validation(
                                "User is not an active member of the organization",
                            )
                        })?;
                    profile.membership_id = Some(membership.id);
                }

                let has_default = t.user_profiles(input.user_id).any(|p| p.is_default);
                if input.is_default || !has_default {
                    t.clear_user_defaults(input.user_id);
                    profile.is_default = true;
                }
                t.insert_profile(profile.clone())?;
                Ok(profile)
            })
            .await?;

        info!(profile_id = %profile.id, is_default = profile.is_default, "Profile created");
        Ok(profile)
    }

    /// Merge `patch` into a profile.
    ///
    /// Setting `is_default` moves the default to this profile. Clearing it
    /// on the current default, or deactivating the default, is rejected;
    /// use [`Self::switch_profile`] to move the default elsewhere.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the profile is absent or deleted
    /// - `Validation` for a bad name or a patch that would leave no default
    /// - `Conflict` if the new name is taken by another of the user's profiles
    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, id: Uuid, mut patch: ProfilePatch, actor: Uuid) -> GovernanceResult<Profile> {
        if let Some(name) = patch.name.as_deref() {
            patch.name = Some(require_name("Profile name", name, self.config.name_max_len)?);
        }

        let profile = self
            .store
            .transact(move |t| {
                let current = live_profile(t, id)?.clone();

                if let Some(name) = patch.name.as_deref() {
                    if t
                        .user_profiles(current.user_id)
                        .any(|p| p.id != id && p.name == name)
                    {
                        return Err(GovernanceError::conflict(format!(
                            "Profile name '{}' is already used",
                            name
                        )));
                    }
                }
                if current.is_default && patch.is_default == Some(false) {
                    return Err(GovernanceError::validation(
                        "Cannot clear the default profile; switch to another profile instead",
                    ));
                }
                if current.is_default && patch.active == Some(false) {
                    return Err(GovernanceError::validation("Cannot deactivate the default profile"));
                }
                let becomes_default = patch.is_default == Some(true) && !current.is_default;
                if becomes_default && !patch.active.unwrap_or(current.active) {
                    return Err(GovernanceError::validation("An inactive profile cannot be the default"));
                }
                if becomes_default {
                    t.clear_user_defaults(current.user_id);
                }

                let profile = t
                    .profile_mut(id)
                    .ok_or_else(|| GovernanceError::not_found("Profile", id))?;
                if let Some(name) = patch.name {
                    profile.name = name;
                }
                if let Some(avatar) = patch.avatar {
                    profile.avatar = avatar;
                }
                if let Some(active) = patch.active {
                    profile.active = active;
                }
                if becomes_default {
                    profile.is_default = true;
                }
                profile.touch(actor);
                Ok(profile.clone())
            })
            .await?;

        info!(profile_id = %id, "Profile updated");
        Ok(profile)
    }

    /// Soft-delete a profile.
    ///
    /// Deleting the default promotes the user's oldest remaining active
    /// profile.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the profile is absent or already deleted
    /// - `Conflict` if it is the user's only remaining profile, or the
    ///   default with no other active profile to take over
    #[instrument(skip(self))]
    pub async fn delete_profile(&self, id: Uuid, actor: Uuid) -> GovernanceResult<()> {
        let promoted = self
            .store
            .transact(move |t| {
                let current = live_profile(t, id)?.clone();
                let successor = {
                    let mut others = t.user_profiles(current.user_id).filter(|p| p.id != id).peekable();
                    if others.peek().is_none() {
                        return Err(GovernanceError::conflict(
                            "Cannot delete the only remaining profile",
                        ));
                    }
                    others.find(|p| p.is_live()).map(|p| p.id)
                };
                if current.is_default && successor.is_none() {
                    return Err(GovernanceError::conflict(
                        "Cannot delete the default profile while no other profile is active",
                    ));
                }

                if let Some(profile) = t.profile_mut(id) {
                    profile.mark_deleted(actor);
                }
                if !current.is_default {
                    return Ok(None);
                }
                match successor.and_then(|sid| t.profile_mut(sid)) {
                    Some(successor) => {
                        successor.is_default = true;
                        successor.touch(actor);
                        Ok(Some(successor.id))
                    }
                    None => Ok(None),
                }
            })
            .await?;

        match promoted {
            Some(successor) => info!(profile_id = %id, %successor, "Default profile deleted, successor promoted"),
            None => info!(profile_id = %id, "Profile deleted"),
        }
        Ok(())
    }

    /// Make a profile the user's default.
    ///
    /// This is the operation that changes who the user acts as for later
    /// permission resolution.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the profile is absent or deleted
    /// - `Unauthorized` if the profile belongs to another user
    /// - `Validation` if the profile is inactive
    #[instrument(skip(self))]
    pub async fn switch_profile(&self, user_id: Uuid, profile_id: Uuid) -> GovernanceResult<Profile> {
        let result = self
            .store
            .transact(move |t| {
                let target = live_profile(t, profile_id)?;
                if target.user_id != user_id {
                    return Err(GovernanceError::Unauthorized(
                        "Profile belongs to another user".to_string(),
                    ));
                }
                if !target.active {
                    return Err(GovernanceError::validation("Profile is not active"));
                }

                t.clear_user_defaults(user_id);
                let profile = t
                    .profile_mut(profile_id)
                    .ok_or_else(|| GovernanceError::not_found("Profile", profile_id))?;
                profile.is_default = true;
                profile.touch(user_id);
                Ok(profile.clone())
            })
            .await;

        match result {
            Ok(profile) => {
                info!(%profile_id, "Switched profile");
                Ok(profile)
            }
            Err(err @ GovernanceError::Unauthorized(_)) => {
                warn!(%profile_id, "Attempt to switch into another user's profile");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Active profiles of a user, default first, then by creation.
    pub async fn list_user_profiles(&self, user_id: Uuid) -> GovernanceResult<Vec<Profile>> {
        self.store
            .read(move |t| {
                let mut profiles: Vec<Profile> = t
                    .user_profiles(user_id)
                    .filter(|p| p.is_live())
                    .cloned()
                    .collect();
                profiles.sort_by_key(|p| !p.is_default);
                Ok(profiles)
            })
            .await
    }

    /// The user's default profile, if any.
    pub async fn get_default_profile(&self, user_id: Uuid) -> GovernanceResult<Option<Profile>> {
        self.store
            .read(move |t| Ok(t.user_profiles(user_id).find(|p| p.is_default).cloned()))
            .await
    }

    /// Get a profile by ID.
    ///
    /// # Errors
    ///
    /// `NotFound` if the profile is absent or deleted
    pub async fn get_by_id(&self, id: Uuid) -> GovernanceResult<Profile> {
        self.store.read(move |t| live_profile(t, id).cloned()).await
    }
}

/// A profile that is not soft-deleted.
pub(crate) fn live_profile(t: &Tables, id: Uuid) -> GovernanceResult<&Profile> {
    t.profile(id)
        .filter(|p| p.deleted_at.is_none())
        .ok_or_else(|| GovernanceError::not_found("Profile", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use governance_org::{Membership, MembershipRole, NewOrganization, Organization, ProfileKind};

    fn service() -> (ProfileService<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            ProfileService::new(store.clone(), Arc::new(GovernanceConfig::default())),
            store,
        )
    }

    async fn defaults(store: &MemoryStore, user_id: Uuid) -> Vec<Uuid> {
        store
            .snapshot()
            .await
            .user_profiles(user_id)
            .filter(|p| p.is_default)
            .map(|p| p.id)
            .collect()
    }

    #[tokio::test]
    async fn test_first_profile_becomes_default() {
        let (profiles, store) = service();
        let user = Uuid::now_v7();

        let first = profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
            .await
            .unwrap();
        let second = profiles
            .create_profile(NewProfile::new(user, "Consultant", ProfileKind::External), user)
            .await
            .unwrap();

        assert!(first.is_default);
        assert!(!second.is_default);
        assert_eq!(defaults(&store, user).await, vec![first.id]);
    }

    #[tokio::test]
    async fn test_requested_default_clears_others() {
        let (profiles, store) = service();
        let user = Uuid::now_v7();
        profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
            .await
            .unwrap();
        let second = profiles
            .create_profile(
                NewProfile::new(user, "Consultant", ProfileKind::External).as_default(),
                user,
            )
            .await
            .unwrap();

        assert_eq!(defaults(&store, user).await, vec![second.id]);
        let listed = profiles.list_user_profiles(user).await.unwrap();
        assert_eq!(listed[0].id, second.id);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let (profiles, _) = service();
        let user = Uuid::now_v7();
        profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
            .await
            .unwrap();
        let err = profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::External), user)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_organizational_profile_needs_active_membership() {
        let (profiles, store) = service();
        let user = Uuid::now_v7();
        let org = Organization::new(NewOrganization::named("Directorate"), user);
        let org_id = org.id;
        store.transact(move |t| t.insert_organization(org)).await.unwrap();

        let input = NewProfile::new(user, "Staff", ProfileKind::Organizational).in_organization(org_id);
        let err = profiles.create_profile(input.clone(), user).await.unwrap_err();
        assert!(matches!(err, GovernanceError::Validation(_)));

        let membership = Membership::new(org_id, user, MembershipRole::Officer);
        let membership_id = membership.id;
        store.transact(move |t| t.insert_membership(membership)).await.unwrap();

        let profile = profiles.create_profile(input, user).await.unwrap();
        assert_eq!(profile.membership_id, Some(membership_id));

        let err = profiles
            .create_profile(NewProfile::new(user, "Orgless", ProfileKind::Organizational), user)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Validation(_)));

        let err = profiles
            .create_profile(
                NewProfile::new(user, "Home", ProfileKind::Personal).in_organization(org_id),
                user,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_switch_profile() {
        let (profiles, store) = service();
        let user = Uuid::now_v7();
        let intruder = Uuid::now_v7();
        profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
            .await
            .unwrap();
        let work = profiles
            .create_profile(NewProfile::new(user, "Consultant", ProfileKind::External), user)
            .await
            .unwrap();

        let switched = profiles.switch_profile(user, work.id).await.unwrap();
        assert!(switched.is_default);
        assert_eq!(defaults(&store, user).await, vec![work.id]);

        let err = profiles.switch_profile(intruder, work.id).await.unwrap_err();
        assert!(matches!(err, GovernanceError::Unauthorized(_)));

        let err = profiles.switch_profile(user, Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, GovernanceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_switch_into_inactive_rejected() {
        let (profiles, _) = service();
        let user = Uuid::now_v7();
        profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
            .await
            .unwrap();
        let spare = profiles
            .create_profile(NewProfile::new(user, "Spare", ProfileKind::External), user)
            .await
            .unwrap();
        profiles
            .update_profile(
                spare.id,
                ProfilePatch {
                    active: Some(false),
                    ..ProfilePatch::default()
                },
                user,
            )
            .await
            .unwrap();

        let err = profiles.switch_profile(user, spare.id).await.unwrap_err();
        assert!(matches!(err, GovernanceError::Validation(_)));
        assert_eq!(profiles.list_user_profiles(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_default_rules() {
        let (profiles, store) = service();
        let user = Uuid::now_v7();
        let first = profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
            .await
            .unwrap();
        let second = profiles
            .create_profile(NewProfile::new(user, "Consultant", ProfileKind::External), user)
            .await
            .unwrap();

        let clear = ProfilePatch {
            is_default: Some(false),
            ..ProfilePatch::default()
        };
        assert!(profiles.update_profile(first.id, clear, user).await.is_err());

        let promote = ProfilePatch {
            is_default: Some(true),
            name: Some("Advisor".into()),
            ..ProfilePatch::default()
        };
        let updated = profiles.update_profile(second.id, promote, user).await.unwrap();
        assert_eq!(updated.name, "Advisor");
        assert_eq!(defaults(&store, user).await, vec![second.id]);

        let rename = ProfilePatch {
            name: Some("Advisor".into()),
            ..ProfilePatch::default()
        };
        let err = profiles.update_profile(first.id, rename, user).await.unwrap_err();
        assert!(matches!(err, GovernanceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let (profiles, store) = service();
        let user = Uuid::now_v7();
        let first = profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
            .await
            .unwrap();

        let err = profiles.delete_profile(first.id, user).await.unwrap_err();
        assert!(matches!(err, GovernanceError::Conflict(_)));

        let second = profiles
            .create_profile(NewProfile::new(user, "Consultant", ProfileKind::External), user)
            .await
            .unwrap();
        profiles.delete_profile(first.id, user).await.unwrap();

        assert_eq!(defaults(&store, user).await, vec![second.id]);
        assert!(profiles.get_by_id(first.id).await.is_err());
        assert_eq!(
            profiles.get_default_profile(user).await.unwrap().map(|p| p.id),
            Some(second.id)
        );

        // Name is free again once the holder is deleted.
        profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_default_never_promotes_inactive() {
        let (profiles, store) = service();
        let user = Uuid::now_v7();
        let first = profiles
            .create_profile(NewProfile::new(user, "Personal", ProfileKind::Personal), user)
            .await
            .unwrap();
        let dormant = profiles
            .create_profile(NewProfile::new(user, "Dormant", ProfileKind::External), user)
            .await
            .unwrap();
        profiles
            .update_profile(
                dormant.id,
                ProfilePatch {
                    active: Some(false),
                    ..ProfilePatch::default()
                },
                user,
            )
            .await
            .unwrap();

        let err = profiles.delete_profile(first.id, user).await.unwrap_err();
        assert!(matches!(err, GovernanceError::Conflict(_)));
        assert_eq!(defaults(&store, user).await, vec![first.id]);
        assert_eq!(profiles.list_user_profiles(user).await.unwrap().len(), 1);

        // The inactive profile itself can still go.
        profiles.delete_profile(dormant.id, user).await.unwrap();

        // With an active sibling, the oldest active one takes over.
        let guest = profiles
            .create_profile(NewProfile::new(user, "Guest", ProfileKind::External), user)
            .await
            .unwrap();
        let late = profiles
            .create_profile(NewProfile::new(user, "Late", ProfileKind::External), user)
            .await
            .unwrap();
        profiles
            .update_profile(
                guest.id,
                ProfilePatch {
                    active: Some(false),
                    ..ProfilePatch::default()
                },
                user,
            )
            .await
            .unwrap();
        profiles.delete_profile(first.id, user).await.unwrap();

        let default = profiles.get_default_profile(user).await.unwrap().unwrap();
        assert_eq!(default.id, late.id);
        assert!(default.active);
    }
}
