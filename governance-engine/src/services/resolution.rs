//! Permission resolution
//!
//! Effective permissions are aggregated along one of two paths:
//!
//! ```text
//! profile ─→ ProfileRole ─→ Role ─→ RolePermission ─→ Permission
//! user    ─→ UserRole    ─┘
//! ```
//!
//! One aggregation yields a [`Grants`] value that answers permission and
//! role checks by hash lookup. [`AccessScope`] keeps those values for the
//! length of a request so several checks share one aggregation.

use governance_rbac::{Grants, PermissionKey, PermissionSet, ProfileRole, Role};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::catalog::dedupe;
use super::profile::live_profile;
use crate::error::{GovernanceError, GovernanceResult};
use crate::store::{GovernanceStore, Tables};

/// Whose grants are being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    /// Roles attached to a profile
    Profile(Uuid),
    /// Roles assigned to a user directly
    User(Uuid),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Profile(id) => write!(f, "profile:{}", id),
            Subject::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// Permission resolution service.
pub struct ResolutionService<S> {
    store: Arc<S>,
}

impl<S: GovernanceStore> ResolutionService<S> {
    /// Create a service over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Aggregate the grants of a subject.
    ///
    /// # Errors
    ///
    /// `NotFound` for a profile subject that is absent or deleted
    pub async fn grants(&self, subject: Subject) -> GovernanceResult<Grants> {
        let grants = self
            .store
            .read(move |t| match subject {
                Subject::Profile(id) => {
                    live_profile(t, id)?;
                    Ok(aggregate(t, t.profile_role_ids(id)))
                }
                Subject::User(id) => Ok(aggregate(t, t.user_role_ids(id))),
            })
            .await?;
        debug!(%subject, roles = grants.roles.len(), permissions = grants.permissions.len(), "Resolved grants");
        Ok(grants)
    }

    /// Permissions reachable from a profile's roles.
    pub async fn get_profile_permissions(&self, profile_id: Uuid) -> GovernanceResult<PermissionSet> {
        Ok(self.grants(Subject::Profile(profile_id)).await?.permissions)
    }

    /// Permissions reachable from a user's directly assigned roles.
    pub async fn get_user_permissions(&self, user_id: Uuid) -> GovernanceResult<PermissionSet> {
        Ok(self.grants(Subject::User(user_id)).await?.permissions)
    }

    /// Whether a subject may perform `action` on `resource`.
    ///
    /// Each call aggregates afresh; use an [`AccessScope`] for repeated
    /// checks.
    pub async fn has_permission(&self, subject: Subject, resource: &str, action: &str) -> GovernanceResult<bool> {
        Ok(self.grants(subject).await?.has_permission(resource, action))
    }

    /// Whether a subject holds a role with this name.
    pub async fn has_role(&self, subject: Subject, role_name: &str) -> GovernanceResult<bool> {
        Ok(self.grants(subject).await?.has_role(role_name))
    }

    /// Check several permissions of a profile with one aggregation.
    pub async fn check_permissions(
        &self,
        profile_id: Uuid,
        keys: &[PermissionKey],
    ) -> GovernanceResult<BTreeMap<PermissionKey, bool>> {
        let grants = self.grants(Subject::Profile(profile_id)).await?;
        Ok(keys
            .iter()
            .map(|key| (key.clone(), grants.permissions.contains(key)))
            .collect())
    }

    /// Roles attached to a profile, in assignment order.
    pub async fn profile_roles(&self, profile_id: Uuid) -> GovernanceResult<Vec<Role>> {
        self.store
            .read(move |t| {
                live_profile(t, profile_id)?;
                Ok(t.profile_role_ids(profile_id)
                    .filter_map(|id| t.role(id))
                    .cloned()
                    .collect())
            })
            .await
    }

    /// Replace every role attached to a profile.
    ///
    /// Duplicate IDs are collapsed. An empty list detaches everything.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the profile is absent or deleted
    /// - `Validation` if any role ID is unknown
    #[instrument(skip(self, role_ids), fields(count = role_ids.len()))]
    pub async fn replace_roles(
        &self,
        profile_id: Uuid,
        role_ids: &[Uuid],
        actor: Option<Uuid>,
    ) -> GovernanceResult<Vec<Role>> {
        let ids = dedupe(role_ids);

        let roles = self
            .store
            .transact(move |t| {
                live_profile(t, profile_id)?;
                if let Some(missing) = ids.iter().find(|id| t.role(**id).is_none()) {
                    return Err(GovernanceError::validation(format!("Role {} does not exist", missing)));
                }
                t.clear_profile_roles(profile_id);
                for role_id in &ids {
                    t.insert_profile_role(ProfileRole::new(profile_id, *role_id, actor))?;
                }
                Ok(ids.iter().filter_map(|id| t.role(*id)).cloned().collect::<Vec<Role>>())
            })
            .await?;

        info!(%profile_id, roles = roles.len(), "Profile roles replaced");
        Ok(roles)
    }

    /// Attach one role to a profile.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the profile or the role is absent
    /// - `Conflict` if the profile already holds the role
    #[instrument(skip(self))]
    pub async fn assign_role(
        &self,
        profile_id: Uuid,
        role_id: Uuid,
        actor: Option<Uuid>,
    ) -> GovernanceResult<ProfileRole> {
        let row = self
            .store
            .transact(move |t| {
                live_profile(t, profile_id)?;
                if t.role(role_id).is_none() {
                    return Err(GovernanceError::not_found("Role", role_id));
                }
                let row = ProfileRole::new(profile_id, role_id, actor);
                t.insert_profile_role(row.clone())?;
                Ok(row)
            })
            .await?;

        info!("Role assigned to profile");
        Ok(row)
    }

    /// Detach one role from a profile.
    ///
    /// # Errors
    ///
    /// `NotFound` if the profile does not hold the role
    #[instrument(skip(self))]
    pub async fn revoke_role(&self, profile_id: Uuid, role_id: Uuid) -> GovernanceResult<()> {
        self.store
            .transact(move |t| {
                if t.remove_profile_role(profile_id, role_id) {
                    Ok(())
                } else {
                    Err(GovernanceError::not_found(
                        "Profile role",
                        format!("{}/{}", profile_id, role_id),
                    ))
                }
            })
            .await?;

        info!("Role revoked from profile");
        Ok(())
    }

    /// Start a request-scoped memo of grants.
    pub fn scope(&self) -> AccessScope<'_, S> {
        AccessScope::new(self)
    }
}

fn aggregate(t: &Tables, role_ids: impl Iterator<Item = Uuid>) -> Grants {
    let mut grants = Grants::new();
    for role in role_ids.filter_map(|id| t.role(id)) {
        grants.add_role(role.name.clone());
        for permission in t.role_permission_ids(role.id).filter_map(|id| t.permission(id)) {
            grants.add_permission(permission.key());
        }
    }
    grants
}

/// Request-scoped memo of grants per subject.
///
/// The first check for a subject aggregates its grants; later checks in the
/// same scope reuse them. Writes made after the first check are not seen.
///
/// # Example
///
/// ```rust,no_run
/// # use governance_engine::{MemoryStore, ResolutionService, Subject};
/// # use std::sync::Arc;
/// # async fn demo(profile_id: uuid::Uuid) -> governance_engine::GovernanceResult<()> {
/// let resolver = ResolutionService::new(Arc::new(MemoryStore::new()));
/// let mut scope = resolver.scope();
/// let subject = Subject::Profile(profile_id);
///
/// if scope.has_permission(subject, "dashboard", "read").await? {
///     // one aggregation, then hash lookups
///     let _can_edit = scope.has_permission(subject, "dashboard", "update").await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct AccessScope<'a, S> {
    resolver: &'a ResolutionService<S>,
    memo: HashMap<Subject, Grants>,
}

impl<'a, S: GovernanceStore> AccessScope<'a, S> {
    /// Create an empty scope.
    pub fn new(resolver: &'a ResolutionService<S>) -> Self {
        Self {
            resolver,
            memo: HashMap::new(),
        }
    }

    /// Grants of a subject, aggregated on first use.
    pub async fn grants(&mut self, subject: Subject) -> GovernanceResult<&Grants> {
        match self.memo.entry(subject) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let grants = self.resolver.grants(subject).await?;
                Ok(entry.insert(grants))
            }
        }
    }

    /// Whether a subject may perform `action` on `resource`.
    pub async fn has_permission(&mut self, subject: Subject, resource: &str, action: &str) -> GovernanceResult<bool> {
        Ok(self.grants(subject).await?.has_permission(resource, action))
    }

    /// Whether a subject holds a role with this name.
    pub async fn has_role(&mut self, subject: Subject, role_name: &str) -> GovernanceResult<bool> {
        Ok(self.grants(subject).await?.has_role(role_name))
    }

    /// Number of subjects aggregated so far.
    pub fn resolved(&self) -> usize {
        self.memo.len()
    }
}
