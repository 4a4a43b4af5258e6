//! Storage abstraction
//!
//! Services never hold rows themselves. They run closures against a
//! [`GovernanceStore`], either as a read over the current tables or as a
//! transaction over a working copy that is committed only on success.
//!
//! ```text
//! service ──read(f)────→ &Tables
//!         ──transact(f)─→ &mut Tables (copy) ──Ok──→ commit
//!                                          └─Err──→ discard
//! ```
//!
//! [`Tables`] enforces the uniqueness constraints a relational schema would
//! carry, so the invariants hold even when a service check is skipped.

use async_trait::async_trait;
use governance_org::{LeadershipRecord, Membership, Organization, Profile};
use governance_rbac::{Permission, PermissionKey, ProfileRole, Role, RolePermission, UserRole};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{GovernanceError, GovernanceResult};

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;

/// Transactional access to the governance tables.
#[async_trait]
pub trait GovernanceStore: Send + Sync {
    /// Run `f` over the current tables.
    ///
    /// Reads are not isolated from each other: two reads in one request may
    /// observe different committed states.
    async fn read<T, F>(&self, f: F) -> GovernanceResult<T>
    where
        F: FnOnce(&Tables) -> GovernanceResult<T> + Send,
        T: Send;

    /// Run `f` as one atomic unit.
    ///
    /// Changes made by `f` become visible only if it returns `Ok`.
    /// Transactions are serialized.
    async fn transact<T, F>(&self, f: F) -> GovernanceResult<T>
    where
        F: FnOnce(&mut Tables) -> GovernanceResult<T> + Send,
        T: Send;
}

/// The governance tables.
///
/// Rows are kept in insertion order, which doubles as creation order for
/// tie-breaking. Inserts go through the `insert_*` methods so the unique
/// constraints are checked; in-place updates go through the `*_mut`
/// accessors.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub(crate) organizations: Vec<Organization>,
    pub(crate) memberships: Vec<Membership>,
    pub(crate) leadership: Vec<LeadershipRecord>,
    pub(crate) profiles: Vec<Profile>,
    pub(crate) roles: Vec<Role>,
    pub(crate) permissions: Vec<Permission>,
    pub(crate) role_permissions: Vec<RolePermission>,
    pub(crate) profile_roles: Vec<ProfileRole>,
    pub(crate) user_roles: Vec<UserRole>,
}

impl Tables {
    /// Create empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- organizations ----

    /// All organization rows, tombstoned included.
    pub fn organizations(&self) -> &[Organization] {
        &self.organizations
    }

    /// Organization by ID, tombstoned included.
    pub fn organization(&self, id: Uuid) -> Option<&Organization> {
        self.organizations.iter().find(|o| o.id == id)
    }

    /// Organization by ID, excluding tombstoned rows.
    pub fn live_organization(&self, id: Uuid) -> Option<&Organization> {
        self.organization(id).filter(|o| !o.is_deleted())
    }

    pub(crate) fn organization_mut(&mut self, id: Uuid) -> Option<&mut Organization> {
        self.organizations.iter_mut().find(|o| o.id == id)
    }

    /// Insert an organization row.
    pub fn insert_organization(&mut self, org: Organization) -> GovernanceResult<()> {
        if self.organization(org.id).is_some() {
            return Err(GovernanceError::conflict(format!(
                "Organization {} already exists",
                org.id
            )));
        }
        self.organizations.push(org);
        Ok(())
    }

    /// Active member counts keyed by organization.
    pub fn active_member_counts(&self) -> HashMap<Uuid, u32> {
        let mut counts = HashMap::new();
        for m in self.memberships.iter().filter(|m| m.active) {
            *counts.entry(m.organization_id).or_insert(0) += 1;
        }
        counts
    }

    // ---- memberships ----

    /// All membership rows, ended included.
    pub fn memberships(&self) -> &[Membership] {
        &self.memberships
    }

    /// Membership by ID.
    pub fn membership(&self, id: Uuid) -> Option<&Membership> {
        self.memberships.iter().find(|m| m.id == id)
    }

    pub(crate) fn membership_mut(&mut self, id: Uuid) -> Option<&mut Membership> {
        self.memberships.iter_mut().find(|m| m.id == id)
    }

    /// The active membership of `user_id` in `organization_id`.
    pub fn active_membership(&self, organization_id: Uuid, user_id: Uuid) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|m| m.is_active_for(organization_id, user_id))
    }

    /// Insert a membership row.
    ///
    /// # Errors
    ///
    /// `Conflict` when the row is active and the user already holds an
    /// active membership in the organization
    pub fn insert_membership(&mut self, membership: Membership) -> GovernanceResult<()> {
        if membership.active
            && self
                .active_membership(membership.organization_id, membership.user_id)
                .is_some()
        {
            return Err(GovernanceError::conflict(
                "User is already an active member of this organization",
            ));
        }
        self.memberships.push(membership);
        Ok(())
    }

    // ---- leadership ----

    /// All leadership records.
    pub fn leadership_records(&self) -> &[LeadershipRecord] {
        &self.leadership
    }

    /// Leadership record by ID.
    pub fn leadership_record(&self, id: Uuid) -> Option<&LeadershipRecord> {
        self.leadership.iter().find(|r| r.id == id)
    }

    pub(crate) fn leadership_record_mut(&mut self, id: Uuid) -> Option<&mut LeadershipRecord> {
        self.leadership.iter_mut().find(|r| r.id == id)
    }

    /// The active leadership record of an organization.
    pub fn active_leadership(&self, organization_id: Uuid) -> Option<&LeadershipRecord> {
        self.leadership
            .iter()
            .find(|r| r.active && r.organization_id == organization_id)
    }

    /// Insert a leadership record.
    ///
    /// # Errors
    ///
    /// `Conflict` when the record is active and the organization already
    /// has an active leader
    pub fn insert_leadership(&mut self, record: LeadershipRecord) -> GovernanceResult<()> {
        if record.active && self.active_leadership(record.organization_id).is_some() {
            return Err(GovernanceError::conflict(
                "Organization already has an active leader",
            ));
        }
        self.leadership.push(record);
        Ok(())
    }

    // ---- profiles ----

    /// All profile rows, deleted included.
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Profile by ID, deleted included.
    pub fn profile(&self, id: Uuid) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub(crate) fn profile_mut(&mut self, id: Uuid) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    /// Profiles of a user that are not soft-deleted, in creation order.
    pub fn user_profiles(&self, user_id: Uuid) -> impl Iterator<Item = &Profile> {
        self.profiles
            .iter()
            .filter(move |p| p.user_id == user_id && p.deleted_at.is_none())
    }

    /// Insert a profile row.
    ///
    /// # Errors
    ///
    /// `Conflict` when the user already has a non-deleted profile with the
    /// same name, or when the row is a default and another default exists
    pub fn insert_profile(&mut self, profile: Profile) -> GovernanceResult<()> {
        if self
            .user_profiles(profile.user_id)
            .any(|p| p.name == profile.name)
        {
            return Err(GovernanceError::conflict(format!(
                "Profile name '{}' is already used",
                profile.name
            )));
        }
        if profile.is_default && self.user_profiles(profile.user_id).any(|p| p.is_default) {
            return Err(GovernanceError::conflict("User already has a default profile"));
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Drop the default flag from every profile of a user.
    pub(crate) fn clear_user_defaults(&mut self, user_id: Uuid) {
        for profile in self.profiles.iter_mut().filter(|p| p.user_id == user_id) {
            profile.is_default = false;
        }
    }

    // ---- roles ----

    /// All roles.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Role by ID.
    pub fn role(&self, id: Uuid) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    /// Role by name.
    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    pub(crate) fn role_mut(&mut self, id: Uuid) -> Option<&mut Role> {
        self.roles.iter_mut().find(|r| r.id == id)
    }

    /// Insert a role.
    ///
    /// # Errors
    ///
    /// `Conflict` on a duplicate name
    pub fn insert_role(&mut self, role: Role) -> GovernanceResult<()> {
        if self.role_by_name(&role.name).is_some() {
            return Err(GovernanceError::conflict(format!(
                "Role '{}' already exists",
                role.name
            )));
        }
        self.roles.push(role);
        Ok(())
    }

    /// Delete a role and every join row that references it.
    pub(crate) fn remove_role(&mut self, id: Uuid) -> Option<Role> {
        let pos = self.roles.iter().position(|r| r.id == id)?;
        self.role_permissions.retain(|rp| rp.role_id != id);
        self.profile_roles.retain(|pr| pr.role_id != id);
        self.user_roles.retain(|ur| ur.role_id != id);
        Some(self.roles.remove(pos))
    }

    // ---- permissions ----

    /// All catalog permissions.
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Permission by ID.
    pub fn permission(&self, id: Uuid) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.id == id)
    }

    /// Permission by `(resource, action)`.
    pub fn permission_by_key(&self, key: &PermissionKey) -> Option<&Permission> {
        self.permissions
            .iter()
            .find(|p| p.grants(&key.resource, &key.action))
    }

    pub(crate) fn permission_mut(&mut self, id: Uuid) -> Option<&mut Permission> {
        self.permissions.iter_mut().find(|p| p.id == id)
    }

    /// Insert a catalog permission.
    ///
    /// # Errors
    ///
    /// `Conflict` on a duplicate `(resource, action)`
    pub fn insert_permission(&mut self, permission: Permission) -> GovernanceResult<()> {
        let key = permission.key();
        if self.permission_by_key(&key).is_some() {
            return Err(GovernanceError::conflict(format!(
                "Permission {} already exists",
                key
            )));
        }
        self.permissions.push(permission);
        Ok(())
    }

    /// Delete a permission and every grant of it.
    pub(crate) fn remove_permission(&mut self, id: Uuid) -> Option<Permission> {
        let pos = self.permissions.iter().position(|p| p.id == id)?;
        self.role_permissions.retain(|rp| rp.permission_id != id);
        Some(self.permissions.remove(pos))
    }

    // ---- join rows ----

    /// Permission IDs granted to a role.
    pub fn role_permission_ids(&self, role_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.role_permissions
            .iter()
            .filter(move |rp| rp.role_id == role_id)
            .map(|rp| rp.permission_id)
    }

    /// Insert a role→permission grant.
    pub fn insert_role_permission(&mut self, row: RolePermission) -> GovernanceResult<()> {
        if self
            .role_permissions
            .iter()
            .any(|rp| rp.role_id == row.role_id && rp.permission_id == row.permission_id)
        {
            return Err(GovernanceError::conflict("Permission already granted to role"));
        }
        self.role_permissions.push(row);
        Ok(())
    }

    pub(crate) fn clear_role_permissions(&mut self, role_id: Uuid) {
        self.role_permissions.retain(|rp| rp.role_id != role_id);
    }

    /// Role IDs held by a profile, in assignment order.
    pub fn profile_role_ids(&self, profile_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.profile_roles
            .iter()
            .filter(move |pr| pr.profile_id == profile_id)
            .map(|pr| pr.role_id)
    }

    /// Insert a profile→role assignment.
    pub fn insert_profile_role(&mut self, row: ProfileRole) -> GovernanceResult<()> {
        if self
            .profile_roles
            .iter()
            .any(|pr| pr.profile_id == row.profile_id && pr.role_id == row.role_id)
        {
            return Err(GovernanceError::conflict("Role already assigned to profile"));
        }
        self.profile_roles.push(row);
        Ok(())
    }

    pub(crate) fn remove_profile_role(&mut self, profile_id: Uuid, role_id: Uuid) -> bool {
        let before = self.profile_roles.len();
        self.profile_roles
            .retain(|pr| !(pr.profile_id == profile_id && pr.role_id == role_id));
        self.profile_roles.len() != before
    }

    pub(crate) fn clear_profile_roles(&mut self, profile_id: Uuid) {
        self.profile_roles.retain(|pr| pr.profile_id != profile_id);
    }

    /// Role IDs held directly by a user, in assignment order.
    pub fn user_role_ids(&self, user_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.user_roles
            .iter()
            .filter(move |ur| ur.user_id == user_id)
            .map(|ur| ur.role_id)
    }

    /// Insert a user→role assignment.
    pub fn insert_user_role(&mut self, row: UserRole) -> GovernanceResult<()> {
        if self.has_user_role(row.user_id, row.role_id) {
            return Err(GovernanceError::conflict("Role already assigned to user"));
        }
        self.user_roles.push(row);
        Ok(())
    }

    /// Whether `user_id` holds `role_id` directly.
    pub fn has_user_role(&self, user_id: Uuid, role_id: Uuid) -> bool {
        self.user_roles
            .iter()
            .any(|ur| ur.user_id == user_id && ur.role_id == role_id)
    }

    pub(crate) fn remove_user_role(&mut self, user_id: Uuid, role_id: Uuid) -> bool {
        let before = self.user_roles.len();
        self.user_roles
            .retain(|ur| !(ur.user_id == user_id && ur.role_id == role_id));
        self.user_roles.len() != before
    }

    /// Count join rows referencing a role: (permissions, profiles, users).
    pub fn role_usage(&self, role_id: Uuid) -> (usize, usize, usize) {
        (
            self.role_permissions.iter().filter(|rp| rp.role_id == role_id).count(),
            self.profile_roles.iter().filter(|pr| pr.role_id == role_id).count(),
            self.user_roles.iter().filter(|ur| ur.role_id == role_id).count(),
        )
    }
}
