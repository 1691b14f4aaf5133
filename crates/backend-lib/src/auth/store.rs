//! Credential lookup seam.
//!
//! Persistence of user records lives outside this crate; the service only ever
//! reads through [`UserStore`].
use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A stored account as seen by the authentication core. Read-only here.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Stable user id, used as the token subject
    pub id: String,
    pub username: String,
    pub email: String,
    /// PHC-format password hash
    pub password_hash: String,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Read access to credential records.
///
/// `Ok(None)` means no such account; `Err` means the store could not answer.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<CredentialRecord>>;
}

/// In-process store keyed by user id, matching identifiers against username or email
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, CredentialRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record by id
    pub async fn insert(&self, record: CredentialRecord) {
        let mut users = self.users.write().await;
        users.insert(record.id.clone(), record);
    }

    /// Add a user under a freshly generated id and return that id
    pub async fn add_user(&self, username: &str, email: &str, password_hash: String) -> String {
        let id = Uuid::new_v4().to_string();
        self.insert(CredentialRecord {
            id: id.clone(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await;
        id
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
    async fn get_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<CredentialRecord>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.username == identifier || user.email.eq_ignore_ascii_case(identifier))
            .cloned())
    }
}
