//! Role and permission catalog
//!
//! Plain CRUD over roles, permissions and the role→permission and
//! user→role joins. Uniqueness is enforced by the store; this service adds
//! the protection rules (system roles cannot be deleted) and cascades join
//! rows on delete.

use governance_rbac::{
    NewPermission, NewRole, Permission, PermissionPatch, Role, RolePatch, RolePermission, RoleSummary,
    UserRole,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{optional_text, require_name};
use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::store::{GovernanceStore, Tables};

/// Role and permission catalog service.
pub struct CatalogService<S> {
    store: Arc<S>,
    config: Arc<GovernanceConfig>,
}

impl<S: GovernanceStore> CatalogService<S> {
    /// Create a service over `store`.
    pub fn new(store: Arc<S>, config: Arc<GovernanceConfig>) -> Self {
        Self { store, config }
    }

    // ---- roles ----

    /// Create a role.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty or over-long name
    /// - `Conflict` if the name is taken
    #[instrument(skip(self, input), fields(name = %input.name, is_system = input.is_system))]
    pub async fn create_role(&self, mut input: NewRole) -> GovernanceResult<Role> {
        input.name = require_name("Role name", &input.name, self.config.name_max_len)?;
        input.description = optional_text("Description", input.description, usize::MAX)?;

        let role = self
            .store
            .transact(move |t| {
                let role = Role::new(input);
                t.insert_role(role.clone())?;
                Ok(role)
            })
            .await?;

        info!(role_id = %role.id, "Role created");
        Ok(role)
    }

    /// Merge `patch` into a role.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the role is absent
    /// - `Conflict` if the new name is taken by another role, or the patch
    ///   clears the system flag of a system role
    #[instrument(skip(self, patch))]
    pub async fn update_role(&self, id: Uuid, mut patch: RolePatch) -> GovernanceResult<Role> {
        if let Some(name) = patch.name.as_deref() {
            patch.name = Some(require_name("Role name", name, self.config.name_max_len)?);
        }

        let role = self
            .store
            .transact(move |t| {
                if let Some(name) = patch.name.as_deref() {
                    if t.role_by_name(name).map_or(false, |r| r.id != id) {
                        return Err(GovernanceError::conflict(format!("Role '{}' already exists", name)));
                    }
                }
                let role = t
                    .role_mut(id)
                    .ok_or_else(|| GovernanceError::not_found("Role", id))?;
                if role.is_system && patch.is_system == Some(false) {
                    warn!(role_id = %id, "Refused to demote system role");
                    return Err(GovernanceError::conflict(format!(
                        "System role '{}' cannot lose its system flag",
                        role.name
                    )));
                }
                role.apply(patch);
                Ok(role.clone())
            })
            .await?;

        info!(role_id = %id, "Role updated");
        Ok(role)
    }

    /// Delete a role with its permission grants and assignments.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the role is absent
    /// - `Conflict` if the role is a system role
    #[instrument(skip(self))]
    pub async fn delete_role(&self, id: Uuid) -> GovernanceResult<Role> {
        let result = self
            .store
            .transact(move |t| {
                let role = t.role(id).ok_or_else(|| GovernanceError::not_found("Role", id))?;
                if role.is_system {
                    return Err(GovernanceError::conflict(format!(
                        "System role '{}' cannot be deleted",
                        role.name
                    )));
                }
                t.remove_role(id)
                    .ok_or_else(|| GovernanceError::not_found("Role", id))
            })
            .await;

        match result {
            Ok(role) => {
                info!(role_id = %id, name = %role.name, "Role deleted");
                Ok(role)
            }
            Err(err @ GovernanceError::Conflict(_)) => {
                warn!(role_id = %id, "Refused to delete system role");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Get a role by ID.
    pub async fn get_role(&self, id: Uuid) -> GovernanceResult<Role> {
        self.store
            .read(move |t| t.role(id).cloned().ok_or_else(|| GovernanceError::not_found("Role", id)))
            .await
    }

    /// All roles with usage counts, ordered by name.
    pub async fn list_roles(&self) -> GovernanceResult<Vec<RoleSummary>> {
        self.store
            .read(|t| {
                let mut summaries: Vec<RoleSummary> = t
                    .roles()
                    .iter()
                    .map(|role| {
                        let (permission_count, profile_count, user_count) = t.role_usage(role.id);
                        RoleSummary {
                            role: role.clone(),
                            permission_count,
                            profile_count,
                            user_count,
                        }
                    })
                    .collect();
                summaries.sort_by(|a, b| a.role.name.cmp(&b.role.name));
                Ok(summaries)
            })
            .await
    }

    /// Whether a role with this name exists.
    pub async fn role_exists(&self, name: &str) -> GovernanceResult<bool> {
        let name = name.to_string();
        self.store.read(move |t| Ok(t.role_by_name(&name).is_some())).await
    }

    // ---- permissions ----

    /// Create a catalog permission.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty name, resource or action
    /// - `Conflict` if `(resource, action)` is taken
    #[instrument(skip(self, input), fields(resource = %input.resource, action = %input.action))]
    pub async fn create_permission(&self, mut input: NewPermission) -> GovernanceResult<Permission> {
        let max = self.config.name_max_len;
        input.name = require_name("Permission name", &input.name, max)?;
        input.resource = require_key_part("Resource", &input.resource, max)?;
        input.action = require_key_part("Action", &input.action, max)?;
        input.description = optional_text("Description", input.description, usize::MAX)?;

        let permission = self
            .store
            .transact(move |t| {
                let permission = Permission::new(input);
                t.insert_permission(permission.clone())?;
                Ok(permission)
            })
            .await?;

        info!(permission_id = %permission.id, key = %permission.key(), "Permission created");
        Ok(permission)
    }

    /// Merge `patch` into a permission.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the permission is absent
    /// - `Conflict` if the new `(resource, action)` is taken
    #[instrument(skip(self, patch))]
    pub async fn update_permission(&self, id: Uuid, mut patch: PermissionPatch) -> GovernanceResult<Permission> {
        let max = self.config.name_max_len;
        if let Some(name) = patch.name.as_deref() {
            patch.name = Some(require_name("Permission name", name, max)?);
        }
        if let Some(resource) = patch.resource.as_deref() {
            patch.resource = Some(require_key_part("Resource", resource, max)?);
        }
        if let Some(action) = patch.action.as_deref() {
            patch.action = Some(require_key_part("Action", action, max)?);
        }

        let permission = self
            .store
            .transact(move |t| {
                let mut updated = t
                    .permission(id)
                    .cloned()
                    .ok_or_else(|| GovernanceError::not_found("Permission", id))?;
                updated.apply(patch);
                let key = updated.key();
                if t.permission_by_key(&key).map_or(false, |p| p.id != id) {
                    return Err(GovernanceError::conflict(format!("Permission {} already exists", key)));
                }
                let slot = t
                    .permission_mut(id)
                    .ok_or_else(|| GovernanceError::not_found("Permission", id))?;
                *slot = updated.clone();
                Ok(updated)
            })
            .await?;

        info!(permission_id = %id, key = %permission.key(), "Permission updated");
        Ok(permission)
    }

    /// Delete a permission and revoke it from every role.
    ///
    /// # Errors
    ///
    /// `NotFound` if the permission is absent
    #[instrument(skip(self))]
    pub async fn delete_permission(&self, id: Uuid) -> GovernanceResult<Permission> {
        let permission = self
            .store
            .transact(move |t| {
                t.remove_permission(id)
                    .ok_or_else(|| GovernanceError::not_found("Permission", id))
            })
            .await?;

        info!(permission_id = %id, key = %permission.key(), "Permission deleted");
        Ok(permission)
    }

    /// Get a permission by ID.
    pub async fn get_permission(&self, id: Uuid) -> GovernanceResult<Permission> {
        self.store
            .read(move |t| {
                t.permission(id)
                    .cloned()
                    .ok_or_else(|| GovernanceError::not_found("Permission", id))
            })
            .await
    }

    /// All permissions, ordered by resource then action.
    pub async fn list_permissions(&self) -> GovernanceResult<Vec<Permission>> {
        self.store
            .read(|t| Ok(sorted_permissions(t.permissions().iter())))
            .await
    }

    /// Permissions on one resource, ordered by action.
    pub async fn permissions_by_resource(&self, resource: &str) -> GovernanceResult<Vec<Permission>> {
        let resource = resource.to_string();
        self.store
            .read(move |t| {
                Ok(sorted_permissions(
                    t.permissions().iter().filter(|p| p.resource == resource),
                ))
            })
            .await
    }

    /// Distinct resources in the catalog, sorted.
    pub async fn list_resources(&self) -> GovernanceResult<Vec<String>> {
        self.store
            .read(|t| {
                let resources: BTreeSet<&str> = t.permissions().iter().map(|p| p.resource.as_str()).collect();
                Ok(resources.into_iter().map(str::to_string).collect())
            })
            .await
    }

    // ---- role → permission ----

    /// Replace every permission granted to a role.
    ///
    /// Duplicate IDs are collapsed. An empty list revokes everything.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the role is absent
    /// - `Validation` if any permission ID is unknown
    #[instrument(skip(self, permission_ids), fields(count = permission_ids.len()))]
    pub async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> GovernanceResult<Vec<Permission>> {
        let ids = dedupe(permission_ids);

        let granted = self
            .store
            .transact(move |t| {
                if t.role(role_id).is_none() {
                    return Err(GovernanceError::not_found("Role", role_id));
                }
                if let Some(missing) = ids.iter().find(|id| t.permission(**id).is_none()) {
                    return Err(GovernanceError::validation(format!(
                        "Permission {} does not exist",
                        missing
                    )));
                }
                t.clear_role_permissions(role_id);
                for permission_id in &ids {
                    t.insert_role_permission(RolePermission::new(role_id, *permission_id))?;
                }
                Ok(role_permissions(t, role_id))
            })
            .await?;

        info!(%role_id, granted = granted.len(), "Role permissions replaced");
        Ok(granted)
    }

    /// Permissions granted to a role, ordered by resource then action.
    pub async fn role_permissions(&self, role_id: Uuid) -> GovernanceResult<Vec<Permission>> {
        self.store
            .read(move |t| {
                if t.role(role_id).is_none() {
                    return Err(GovernanceError::not_found("Role", role_id));
                }
                Ok(role_permissions(t, role_id))
            })
            .await
    }

    // ---- user → role ----

    /// Give a user a role directly. Assigning a held role changes nothing.
    ///
    /// # Errors
    ///
    /// `NotFound` if the role is absent
    #[instrument(skip(self))]
    pub async fn assign_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> GovernanceResult<()> {
        let added = self
            .store
            .transact(move |t| {
                if t.role(role_id).is_none() {
                    return Err(GovernanceError::not_found("Role", role_id));
                }
                if t.has_user_role(user_id, role_id) {
                    return Ok(false);
                }
                t.insert_user_role(UserRole::new(user_id, role_id))?;
                Ok(true)
            })
            .await?;

        if added {
            info!("Role assigned to user");
        } else {
            debug!("User already holds role");
        }
        Ok(())
    }

    /// Take a directly held role away from a user.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not hold the role directly
    #[instrument(skip(self))]
    pub async fn remove_role_from_user(&self, user_id: Uuid, role_id: Uuid) -> GovernanceResult<()> {
        self.store
            .transact(move |t| {
                if t.remove_user_role(user_id, role_id) {
                    Ok(())
                } else {
                    Err(GovernanceError::not_found("User role", format!("{}/{}", user_id, role_id)))
                }
            })
            .await?;

        info!("Role removed from user");
        Ok(())
    }

    /// Roles a user holds directly, in assignment order.
    pub async fn user_roles(&self, user_id: Uuid) -> GovernanceResult<Vec<Role>> {
        self.store
            .read(move |t| Ok(t.user_role_ids(user_id).filter_map(|id| t.role(id)).cloned().collect()))
            .await
    }

    /// Users holding a role directly.
    pub async fn users_with_role(&self, role_id: Uuid) -> GovernanceResult<Vec<Uuid>> {
        self.store
            .read(move |t| {
                if t.role(role_id).is_none() {
                    return Err(GovernanceError::not_found("Role", role_id));
                }
                Ok(t.user_roles
                    .iter()
                    .filter(|ur| ur.role_id == role_id)
                    .map(|ur| ur.user_id)
                    .collect())
            })
            .await
    }
}

/// Resource and action become part of `resource:action` keys, so they may
/// not be blank or contain the separator.
fn require_key_part(field: &str, value: &str, max_len: usize) -> GovernanceResult<String> {
    let value = require_name(field, value, max_len)?;
    if value.contains(':') {
        return Err(GovernanceError::validation(format!("{} cannot contain ':'", field)));
    }
    Ok(value)
}

fn sorted_permissions<'a>(permissions: impl Iterator<Item = &'a Permission>) -> Vec<Permission> {
    let mut sorted: Vec<Permission> = permissions.cloned().collect();
    sorted.sort_by(|a, b| a.resource.cmp(&b.resource).then_with(|| a.action.cmp(&b.action)));
    sorted
}

fn role_permissions(t: &Tables, role_id: Uuid) -> Vec<Permission> {
    sorted_permissions(t.role_permission_ids(role_id).filter_map(|id| t.permission(id)))
}

/// Collapse duplicates, keeping first occurrence order.
pub(crate) fn dedupe(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
