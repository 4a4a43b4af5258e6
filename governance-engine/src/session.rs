//! Session-bound authorization helpers
//!
//! These combine the identity provider with permission resolution for the
//! action layer: who is calling, and may they do this.

use governance_org::Profile;
use governance_rbac::{Grants, PermissionSet};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::directory::IdentityProvider;
use crate::error::{GovernanceError, GovernanceResult};
use crate::services::{ProfileService, ResolutionService, Subject};
use crate::store::GovernanceStore;

/// The profile a user currently acts as, with its grants.
#[derive(Debug, Clone)]
pub struct ActiveContext {
    /// The user's default profile
    pub profile: Profile,
    /// Grants reachable from that profile
    pub grants: Grants,
}

/// Authorization helpers for the current request's user.
pub struct Session<'a, S> {
    identity: &'a dyn IdentityProvider,
    profiles: &'a ProfileService<S>,
    resolver: &'a ResolutionService<S>,
}

impl<'a, S: GovernanceStore> Session<'a, S> {
    /// Bind helpers to an identity provider.
    pub fn new(
        identity: &'a dyn IdentityProvider,
        profiles: &'a ProfileService<S>,
        resolver: &'a ResolutionService<S>,
    ) -> Self {
        Self {
            identity,
            profiles,
            resolver,
        }
    }

    /// ID of the current user.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when there is no session
    pub async fn user_id(&self) -> GovernanceResult<Uuid> {
        self.identity.current_user_id().await
    }

    /// Permissions of the current user through directly assigned roles.
    pub async fn current_user_permissions(&self) -> GovernanceResult<PermissionSet> {
        let user_id = self.user_id().await?;
        self.resolver.get_user_permissions(user_id).await
    }

    /// Fail unless the current user may perform `action` on `resource`.
    ///
    /// # Returns
    ///
    /// The current user's ID
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when there is no session
    /// - `Unauthorized` when the permission is missing
    pub async fn require_permission(&self, resource: &str, action: &str) -> GovernanceResult<Uuid> {
        let user_id = self.user_id().await?;
        let grants = self.resolver.grants(Subject::User(user_id)).await?;
        if grants.has_permission(resource, action) {
            debug!(%user_id, resource, action, "Permission granted");
            return Ok(user_id);
        }
        warn!(%user_id, resource, action, "Permission denied");
        Err(GovernanceError::Unauthorized(format!(
            "Missing permission {}:{}",
            resource, action
        )))
    }

    /// Fail unless the current user holds the named role.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when there is no session
    /// - `Unauthorized` when the role is missing
    pub async fn require_role(&self, role_name: &str) -> GovernanceResult<Uuid> {
        let user_id = self.user_id().await?;
        if self.resolver.has_role(Subject::User(user_id), role_name).await? {
            return Ok(user_id);
        }
        warn!(%user_id, role = role_name, "Role required");
        Err(GovernanceError::Unauthorized(format!("Missing role {}", role_name)))
    }

    /// The current user's default profile and its grants.
    ///
    /// `None` when the user has no profile yet.
    pub async fn current_profile_grants(&self) -> GovernanceResult<Option<ActiveContext>> {
        let user_id = self.user_id().await?;
        let Some(profile) = self.profiles.get_default_profile(user_id).await? else {
            return Ok(None);
        };
        let grants = self.resolver.grants(Subject::Profile(profile.id)).await?;
        Ok(Some(ActiveContext { profile, grants }))
    }
}
