//! # Governance Engine
//!
//! Services for an organization hierarchy: the organization tree,
//! memberships, leadership succession, user profiles and permission
//! resolution.
//!
//! ## Overview
//!
//! The governance-engine crate handles:
//! - **Organizations**: Tree construction, ancestor paths, soft delete
//! - **Memberships**: One active membership per user and organization
//! - **Leadership**: Atomic handover between leaders
//! - **Profiles**: Switchable user contexts with exactly one default
//! - **Catalog**: Roles, permissions and their joins
//! - **Resolution**: Effective permissions per profile or user
//!
//! ## Architecture
//!
//! ```text
//! OrganizationService ─→ MembershipService ─→ LeadershipService
//!                                  │
//!                                  └──────→ ProfileService ─→ ResolutionService ←─ CatalogService
//!
//! every service ──read/transact──→ GovernanceStore (MemoryStore, ...)
//! MembershipService, LeadershipService ──→ UserDirectory
//! Session ──→ IdentityProvider
//! ```
//!
//! ## Features
//!
//! - `memory` (default): In-memory store for single-process use and tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use governance_engine::{Governance, MemoryStore, MemoryUserDirectory};
//! use governance_org::{LeadershipType, NewMembership, NewOrganization, UserSummary};
//! use uuid::Uuid;
//!
//! async fn example() -> governance_engine::GovernanceResult<()> {
//!     let alice = UserSummary::new("Alice", "alice@ministry.go.id");
//!     let directory = Arc::new(MemoryUserDirectory::with_users(vec![alice.clone()]));
//!     let gov = Governance::in_memory(directory);
//!     let actor = Uuid::now_v7();
//!
//!     let ministry = gov.organizations.create(NewOrganization::named("Ministry"), actor).await?;
//!     let membership = gov
//!         .memberships
//!         .add_member(NewMembership::new(ministry.id, alice.id))
//!         .await?;
//!     gov.leadership
//!         .assign_leader(ministry.id, membership.id, LeadershipType::Definitive, None, actor)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod services;
pub mod session;
pub mod store;

use std::sync::Arc;

pub use config::{ConfigError, GovernanceConfig};
pub use directory::{IdentityProvider, MemoryUserDirectory, StaticIdentity, UserDirectory};
pub use error::{GovernanceError, GovernanceResult};
pub use services::{
    AccessScope, CatalogService, LeadershipService, MembershipService, OrganizationService,
    ProfileService, ResolutionService, Subject,
};
pub use session::{ActiveContext, Session};
pub use store::{GovernanceStore, Tables};

#[cfg(feature = "memory")]
pub use store::MemoryStore;

/// All governance services over one store.
pub struct Governance<S> {
    /// Organization tree
    pub organizations: OrganizationService<S>,
    /// Memberships
    pub memberships: MembershipService<S>,
    /// Leadership succession
    pub leadership: LeadershipService<S>,
    /// Profiles
    pub profiles: ProfileService<S>,
    /// Role and permission catalog
    pub catalog: CatalogService<S>,
    /// Permission resolution
    pub resolver: ResolutionService<S>,
    store: Arc<S>,
}

impl<S: GovernanceStore> Governance<S> {
    /// Wire every service to `store` and `directory`.
    pub fn new(store: Arc<S>, directory: Arc<dyn UserDirectory>, config: GovernanceConfig) -> Self {
        let config = Arc::new(config);
        Self {
            organizations: OrganizationService::new(store.clone(), config.clone()),
            memberships: MembershipService::new(store.clone(), directory.clone(), config.clone()),
            leadership: LeadershipService::new(store.clone(), directory),
            profiles: ProfileService::new(store.clone(), config.clone()),
            catalog: CatalogService::new(store.clone(), config),
            resolver: ResolutionService::new(store.clone()),
            store,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Authorization helpers for the user behind `identity`.
    pub fn session<'a>(&'a self, identity: &'a dyn IdentityProvider) -> Session<'a, S> {
        Session::new(identity, &self.profiles, &self.resolver)
    }
}

#[cfg(feature = "memory")]
impl Governance<MemoryStore> {
    /// Services over a fresh in-memory store with default configuration.
    pub fn in_memory(directory: Arc<dyn UserDirectory>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), directory, GovernanceConfig::default())
    }
}
