//! In-memory store implementation
//!
//! Suitable for single-process embedding and testing. A transaction clones
//! the tables under the write lock and swaps the copy in on success, so a
//! failed transaction leaves no trace.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{GovernanceStore, Tables};
use crate::error::GovernanceResult;

/// In-memory governance store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with existing rows.
    ///
    /// The rows are taken as-is; no constraint is re-checked.
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Copy of the current committed state.
    pub async fn snapshot(&self) -> Tables {
        self.tables.read().await.clone()
    }
}

#[async_trait]
impl GovernanceStore for MemoryStore {
    async fn read<T, F>(&self, f: F) -> GovernanceResult<T>
    where
        F: FnOnce(&Tables) -> GovernanceResult<T> + Send,
        T: Send,
    {
        let tables = self.tables.read().await;
        f(&tables)
    }

    async fn transact<T, F>(&self, f: F) -> GovernanceResult<T>
    where
        F: FnOnce(&mut Tables) -> GovernanceResult<T> + Send,
        T: Send,
    {
        let mut guard = self.tables.write().await;
        let mut working = guard.clone();
        match f(&mut working) {
            Ok(value) => {
                *guard = working;
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "Transaction rolled back");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GovernanceError;
    use governance_org::{Membership, MembershipRole};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_commit_on_ok() {
        let store = MemoryStore::new();
        let org = Uuid::now_v7();
        store
            .transact(|t| t.insert_membership(Membership::new(org, Uuid::now_v7(), MembershipRole::Member)))
            .await
            .unwrap();

        let count = store.read(|t| Ok(t.memberships().len())).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_rollback_on_err() {
        let store = MemoryStore::new();
        let org = Uuid::now_v7();
        let user = Uuid::now_v7();

        let result: GovernanceResult<()> = store
            .transact(|t| {
                t.insert_membership(Membership::new(org, user, MembershipRole::Member))?;
                // Second insert violates the active-pair constraint.
                t.insert_membership(Membership::new(org, user, MembershipRole::Admin))
            })
            .await;

        assert!(matches!(result, Err(GovernanceError::Conflict(_))));
        assert!(store.snapshot().await.memberships().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_serialize() {
        let store = MemoryStore::new();
        let org = Uuid::now_v7();
        let user = Uuid::now_v7();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .transact(|t| {
                        t.insert_membership(Membership::new(org, user, MembershipRole::Member))
                    })
                    .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.snapshot().await.memberships().len(), 1);
    }
}
