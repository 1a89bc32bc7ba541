//! In-memory implementation of UserRepository

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::instrument;

use classline_core::entities::User;
use classline_core::error::DomainError;
use classline_core::traits::{RepoResult, UserRepository};
use classline_core::value_objects::Snowflake;

/// In-memory implementation of UserRepository
///
/// Emails are indexed case-insensitively.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: DashMap<Snowflake, StoredUser>,
    by_email: DashMap<String, Snowflake>,
}

struct StoredUser {
    user: User,
    password_hash: String,
}

impl MemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn email_key(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    #[instrument(skip(self, password_hash))]
    async fn create(&self, user: &User, password_hash: &str) -> RepoResult<()> {
        let key = Self::email_key(&user.email);

        // The email index entry doubles as the uniqueness guard.
        match self.by_email.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(DomainError::EmailAlreadyExists),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(
                    user.id,
                    StoredUser {
                        user: user.clone(),
                        password_hash: password_hash.to_string(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>> {
        Ok(self.users.get(&id).map(|stored| stored.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let Some(id) = self.by_email.get(&Self::email_key(email)).map(|e| *e) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        Ok(self.by_email.contains_key(&Self::email_key(email)))
    }

    async fn get_password_hash(&self, id: Snowflake) -> RepoResult<Option<String>> {
        Ok(self.users.get(&id).map(|stored| stored.password_hash.clone()))
    }

    async fn list_others(&self, user_id: Snowflake) -> RepoResult<Vec<User>> {
        let mut others: Vec<User> = self
            .users
            .iter()
            .filter(|entry| *entry.key() != user_id)
            .map(|entry| entry.user.clone())
            .collect();
        others.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(others)
    }
}
