//! User Store
//!
//! Persistence interface for user records, keyed by globally unique email.
//! Implementations must make "check email is free, then insert" atomic.

use crate::error::StoreError;
use crate::models::{NewUser, User};

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by exact (case-sensitive) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user, failing with `StoreError::Conflict` if the email is taken
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
}

/// Process-local user store
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the role on file for `email`. Returns false if there is no such user.
    pub async fn update_role(&self, email: &str, role: &str) -> bool {
        match self.users.write().await.get_mut(email) {
            Some(user) => {
                user.role = role.to_string();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        // Lookup and insert happen under one write guard
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(StoreError::Conflict);
        }

        let user = user.into_user(Uuid::new_v4());
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(email: &str, role: &str) -> NewUser {
        NewUser {
            first_name: "Test".into(),
            last_name: "User".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: role.into(),
        }
    }

    #[test]
    fn test_create_and_find() {
        tokio_test::block_on(async {
            let store = InMemoryUserStore::new();
            let created = store.create(new_user("t@x.com", "ROLE_USER")).await.unwrap();

            let found = store.find_by_email("t@x.com").await.unwrap().unwrap();
            assert_eq!(found, created);

            // case-sensitive
            assert!(store.find_by_email("T@x.com").await.unwrap().is_none());
        });
    }

    #[test]
    fn test_duplicate_email_leaves_record() {
        tokio_test::block_on(async {
            let store = InMemoryUserStore::new();
            let first = store.create(new_user("t@x.com", "ROLE_USER")).await.unwrap();

            let second = store.create(new_user("t@x.com", "ROLE_ADMIN")).await;
            assert!(matches!(second, Err(StoreError::Conflict)));

            let found = store.find_by_email("t@x.com").await.unwrap().unwrap();
            assert_eq!(found, first);
            assert_eq!(store.len().await, 1);
        });
    }

    #[test]
    fn test_update_role() {
        tokio_test::block_on(async {
            let store = InMemoryUserStore::new();
            store.create(new_user("a@b.com", "ROLE_ADMIN")).await.unwrap();

            assert!(store.update_role("a@b.com", "ROLE_USER").await);
            assert!(!store.update_role("missing@b.com", "ROLE_USER").await);

            let found = store.find_by_email("a@b.com").await.unwrap().unwrap();
            assert_eq!(found.role, "ROLE_USER");
        });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_single_winner() {
        let store = Arc::new(InMemoryUserStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_user("race@x.com", "ROLE_USER")).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.len().await, 1);
    }
}
