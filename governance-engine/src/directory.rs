//! Collaborator seams
//!
//! The user directory and the identity provider live outside the governance
//! core. These traits are what the core consumes from them.

use async_trait::async_trait;
use governance_org::UserSummary;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{GovernanceError, GovernanceResult};

/// Read access to the external user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look a user up by ID.
    async fn find_user_by_id(&self, id: Uuid) -> GovernanceResult<Option<UserSummary>>;

    /// Look a user up by email, case-insensitively.
    async fn find_user_by_email(&self, email: &str) -> GovernanceResult<Option<UserSummary>>;

    /// Users whose name or email contains `query`, case-insensitively,
    /// ordered by name then email.
    async fn search_users(&self, query: &str) -> GovernanceResult<Vec<UserSummary>>;
}

/// Source of the current authenticated user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// ID of the user the request acts for.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when there is no session
    async fn current_user_id(&self) -> GovernanceResult<Uuid>;
}

/// In-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<Vec<UserSummary>>>,
}

impl MemoryUserDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding `users`.
    pub fn with_users(users: Vec<UserSummary>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    /// Add or replace a user entry.
    pub async fn insert(&self, user: UserSummary) {
        let mut users = self.users.write().await;
        users.retain(|u| u.id != user.id);
        users.push(user);
    }

    /// Remove a user entry.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        users.len() != before
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_user_by_id(&self, id: Uuid) -> GovernanceResult<Option<UserSummary>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> GovernanceResult<Option<UserSummary>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    async fn search_users(&self, query: &str) -> GovernanceResult<Vec<UserSummary>> {
        let needle = query.trim().to_lowercase();
        let users = self.users.read().await;
        let mut found: Vec<UserSummary> = users.iter().filter(|u| u.matches(&needle)).cloned().collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(found)
    }
}

/// Identity provider with a fixed answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity {
    user_id: Option<Uuid>,
}

impl StaticIdentity {
    /// Identity of a signed-in user.
    pub fn signed_in(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// No session.
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user_id(&self) -> GovernanceResult<Uuid> {
        self.user_id.ok_or(GovernanceError::Unauthenticated)
    }
}
