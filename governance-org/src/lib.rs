//! # Governance Organization Models
//!
//! This crate provides the domain models of the organization hierarchy and
//! governance engine.
//!
//! ## Overview
//!
//! The governance-org crate handles:
//! - **Organizations**: Units of a strict tree, soft-deleted by tombstone
//! - **Memberships**: Time-bounded links between users and organizations
//! - **Leadership**: Succession records, at most one active per organization
//! - **Profiles**: Contexts a user switches between to scope permissions
//! - **Hierarchy**: Forest construction and parent-link walks
//!
//! ## Architecture
//!
//! ```text
//! Organization ─┬─ parent ─→ Organization
//!               ├─ Membership ─→ User
//!               │     └─ LeadershipRecord (replaced_record_id ─→ previous)
//!               └─ Profile (organizational) ─→ Membership
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use governance_org::{Membership, MembershipRole, NewOrganization, Organization};
//! use uuid::Uuid;
//!
//! let actor = Uuid::now_v7();
//! let ministry = Organization::new(NewOrganization::named("Ministry"), actor);
//! let directorate = Organization::new(
//!     NewOrganization::named("Directorate").with_parent(ministry.id),
//!     actor,
//! );
//!
//! let user_id = Uuid::now_v7();
//! let membership = Membership::new(directorate.id, user_id, MembershipRole::Officer);
//! ```
//!
//! ## Integration
//!
//! This crate is designed to work with:
//! - `governance-rbac`: Roles and permissions attached to profiles
//! - `governance-engine`: Transactional services over these models

pub mod hierarchy;
pub mod leadership;
pub mod membership;
pub mod organization;
pub mod profile;
pub mod roles;
pub mod user;

// Re-export main types for convenience
pub use hierarchy::{
    ancestor_path, build_forest, depth_of, subtree_height, would_create_cycle, HierarchyError,
    OrganizationNode,
};
pub use leadership::{ActiveLeader, LeadershipHistoryEntry, LeadershipRecord};
pub use membership::{MemberView, Membership, NewMembership};
pub use organization::{NewOrganization, Organization, OrganizationKind, OrganizationPatch, OrganizationStatus};
pub use profile::{NewProfile, Profile, ProfileKind, ProfilePatch};
pub use roles::{LeadershipType, MembershipRole};
pub use user::UserSummary;
