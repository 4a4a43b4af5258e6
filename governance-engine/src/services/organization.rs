//! Organization hierarchy service
//!
//! Owns organization rows and their parent links. Deletion is a tombstone;
//! children of a tombstoned organization stay where they are and render as
//! detached roots in the tree.

use governance_org::{
    ancestor_path, build_forest, depth_of, subtree_height, would_create_cycle, NewOrganization,
    Organization, OrganizationKind, OrganizationNode, OrganizationPatch,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::{optional_text, require_name};
use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::store::{GovernanceStore, Tables};

/// Organization service.
pub struct OrganizationService<S> {
    store: Arc<S>,
    config: Arc<GovernanceConfig>,
}

impl<S: GovernanceStore> OrganizationService<S> {
    /// Create a service over `store`.
    pub fn new(store: Arc<S>, config: Arc<GovernanceConfig>) -> Self {
        Self { store, config }
    }

    /// Create an organization.
    ///
    /// Status defaults to `Active` and kind to `Structural`.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty or over-long name, an over-long
    ///   abbreviation, echelon 0, a parent that is absent or tombstoned, or
    ///   a parent already at the maximum hierarchy depth
    #[instrument(skip(self, input), fields(name = %input.name, parent_id = ?input.parent_id))]
    pub async fn create(&self, mut input: NewOrganization, actor: Uuid) -> GovernanceResult<Organization> {
        input.name = require_name("Organization name", &input.name, self.config.name_max_len)?;
        input.abbreviation =
            optional_text("Abbreviation", input.abbreviation, self.config.abbreviation_max_len)?;
        check_echelon(input.echelon)?;
        let max_depth = self.config.max_hierarchy_depth;

        let org = self
            .store
            .transact(move |t| {
                if let Some(parent_id) = input.parent_id {
                    if t.live_organization(parent_id).is_none() {
                        return Err(GovernanceError::validation("Parent organization not found"));
                    }
                    check_depth(t, parent_id, 1, max_depth)?;
                }
                let org = Organization::new(input, actor);
                t.insert_organization(org.clone())?;
                Ok(org)
            })
            .await?;

        info!(organization_id = %org.id, "Organization created");
        Ok(org)
    }

    /// Merge `patch` into an organization.
    ///
    /// Re-parenting is checked against the live hierarchy: the new parent
    /// must exist and must not be the organization or one of its
    /// descendants.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the organization is absent or tombstoned
    /// - `Validation` for bad fields, a parent that would close a cycle, or
    ///   a move that pushes the subtree past the maximum hierarchy depth
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        mut patch: OrganizationPatch,
        actor: Uuid,
    ) -> GovernanceResult<Organization> {
        if let Some(name) = patch.name.as_deref() {
            patch.name = Some(require_name("Organization name", name, self.config.name_max_len)?);
        }
        if let Some(abbreviation) = patch.abbreviation.take() {
            patch.abbreviation = Some(optional_text(
                "Abbreviation",
                abbreviation,
                self.config.abbreviation_max_len,
            )?);
        }
        if let Some(echelon) = patch.echelon {
            check_echelon(echelon)?;
        }
        let max_depth = self.config.max_hierarchy_depth;

        let org = self
            .store
            .transact(move |t| {
                if t.live_organization(id).is_none() {
                    return Err(GovernanceError::not_found("Organization", id));
                }
                if let Some(Some(parent_id)) = patch.parent_id {
                    if parent_id == id {
                        return Err(GovernanceError::validation(
                            "Organization cannot be its own parent",
                        ));
                    }
                    if t.live_organization(parent_id).is_none() {
                        return Err(GovernanceError::validation("Parent organization not found"));
                    }
                    let cyclic = would_create_cycle(
                        id,
                        parent_id,
                        |n| t.organization(n).and_then(|o| o.parent_id),
                        max_depth,
                    )?;
                    if cyclic {
                        debug!(%parent_id, "Rejected re-parent under a descendant");
                        return Err(GovernanceError::validation(
                            "Parent cannot be a descendant of the organization",
                        ));
                    }
                    check_depth(t, parent_id, subtree_height(id, t.organizations()), max_depth)?;
                }

                let org = t
                    .organization_mut(id)
                    .ok_or_else(|| GovernanceError::not_found("Organization", id))?;
                org.apply(patch, actor);
                Ok(org.clone())
            })
            .await?;

        info!(organization_id = %id, "Organization updated");
        Ok(org)
    }

    /// Tombstone an organization. Children are not touched.
    ///
    /// # Errors
    ///
    /// `NotFound` if the organization is absent or already tombstoned
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: Uuid, actor: Uuid) -> GovernanceResult<Organization> {
        let org = self
            .store
            .transact(move |t| {
                let org = t
                    .organization_mut(id)
                    .filter(|o| !o.is_deleted())
                    .ok_or_else(|| GovernanceError::not_found("Organization", id))?;
                org.mark_deleted(actor);
                Ok(org.clone())
            })
            .await?;

        info!(organization_id = %id, "Organization deleted");
        Ok(org)
    }

    /// Get a live organization by ID.
    pub async fn get_by_id(&self, id: Uuid) -> GovernanceResult<Organization> {
        self.store
            .read(move |t| {
                t.live_organization(id)
                    .cloned()
                    .ok_or_else(|| GovernanceError::not_found("Organization", id))
            })
            .await
    }

    /// Whether a live organization with this ID exists.
    pub async fn exists(&self, id: Uuid) -> GovernanceResult<bool> {
        self.store.read(move |t| Ok(t.live_organization(id).is_some())).await
    }

    /// Live direct children of `parent_id`, ordered by name.
    pub async fn get_children(&self, parent_id: Uuid) -> GovernanceResult<Vec<Organization>> {
        self.store
            .read(move |t| {
                let mut children: Vec<Organization> = t
                    .organizations()
                    .iter()
                    .filter(|o| !o.is_deleted() && o.parent_id == Some(parent_id))
                    .cloned()
                    .collect();
                children.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(children)
            })
            .await
    }

    /// All live organizations, optionally of one kind, ordered by name.
    pub async fn get_all(&self, kind: Option<OrganizationKind>) -> GovernanceResult<Vec<Organization>> {
        self.store
            .read(move |t| {
                let mut orgs: Vec<Organization> = t
                    .organizations()
                    .iter()
                    .filter(|o| !o.is_deleted() && kind.map_or(true, |k| o.kind == k))
                    .cloned()
                    .collect();
                orgs.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(orgs)
            })
            .await
    }

    /// Live organizations offered as parents, roots first, then grouped by
    /// parent and ordered by name.
    pub async fn get_parent_candidates(&self) -> GovernanceResult<Vec<Organization>> {
        self.store
            .read(|t| {
                let mut orgs: Vec<Organization> = t
                    .organizations()
                    .iter()
                    .filter(|o| !o.is_deleted())
                    .cloned()
                    .collect();
                orgs.sort_by(|a, b| {
                    a.parent_id
                        .cmp(&b.parent_id)
                        .then_with(|| a.name.cmp(&b.name))
                });
                Ok(orgs)
            })
            .await
    }

    /// The live hierarchy as a forest with active member counts.
    pub async fn get_tree(&self) -> GovernanceResult<Vec<OrganizationNode>> {
        let forest = self
            .store
            .read(|t| Ok(build_forest(t.organizations(), &t.active_member_counts())))
            .await?;
        debug!(roots = forest.len(), "Built organization tree");
        Ok(forest)
    }

    /// Path from the root down to `id`, inclusive.
    ///
    /// Returns an empty path when `id` is absent or tombstoned. The walk
    /// stops at a tombstoned ancestor.
    ///
    /// # Errors
    ///
    /// `Consistency` when the stored parent links contain a cycle or run
    /// deeper than the configured bound
    pub async fn get_ancestor_path(&self, id: Uuid) -> GovernanceResult<Vec<Organization>> {
        let max_depth = self.config.max_hierarchy_depth;
        self.store
            .read(move |t| {
                ancestor_path(id, |n| t.live_organization(n), max_depth).map_err(|e| {
                    error!(organization_id = %id, error = %e, "Corrupt organization hierarchy");
                    GovernanceError::from(e)
                })
            })
            .await
    }
}

/// Reject placing `levels` levels under `parent_id` past `max_depth`.
fn check_depth(t: &Tables, parent_id: Uuid, levels: usize, max_depth: usize) -> GovernanceResult<()> {
    let parent_depth = depth_of(parent_id, |n| t.organization(n).map(|o| o.parent_id), max_depth)?;
    if parent_depth + levels > max_depth {
        debug!(%parent_id, parent_depth, levels, "Rejected placement past the depth limit");
        return Err(GovernanceError::validation(format!(
            "Organization hierarchy cannot be deeper than {} levels",
            max_depth
        )));
    }
    Ok(())
}

fn check_echelon(echelon: Option<u8>) -> GovernanceResult<()> {
    match echelon {
        Some(0) => Err(GovernanceError::validation("Echelon must be at least 1")),
        _ => Ok(()),
    }
}
