//! An in-memory storage adapter.
//!
//! This stores all users, credentials, challenges and sessions in process
//! memory - they are lost on restart. It is useful for demo sites, tests
//! and as the reference implementation of the storage trait semantics,
//! particularly challenge single-use and the conditional counter update.
//!
//! Do not use this in production deployments with more than one process:
//! nothing is shared between instances.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::session::{ChallengeData, Session};
use crate::storage::{
    ChallengeStore, CredentialStore, SessionStore, StorageResult, StoredUser, UserStore,
};
use passlock_core::proto::PasskeyCredential;

type Store<T> = Arc<RwLock<HashMap<String, T>>>;

/// The in-memory reference storage adapter. Cloning is cheap and clones
/// share the same underlying stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    users: Store<StoredUser>,
    credentials: Store<PasskeyCredential>,
    challenges: Store<ChallengeData>,
    sessions: Store<Session>,
}

impl MemoryStorage {
    /// Create an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of live (unexpired) challenges held.
    pub async fn challenge_count(&self) -> usize {
        self.challenges
            .read()
            .await
            .values()
            .filter(|c| !c.is_expired())
            .count()
    }

    /// The number of live (unexpired) sessions held.
    pub async fn session_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| !s.is_expired())
            .count()
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<StoredUser>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StorageResult<Option<StoredUser>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, user: StoredUser) -> StorageResult<()> {
        self.users.write().await.insert(user.id.clone(), user);
        Ok(())
    }

    async fn update(&self, user: StoredUser) -> StorageResult<()> {
        self.users.write().await.insert(user.id.clone(), user);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.users.write().await.remove(id);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStorage {
    async fn find_by_id(&self, credential_id: &str) -> StorageResult<Option<PasskeyCredential>> {
        Ok(self.credentials.read().await.get(credential_id).cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> StorageResult<Vec<PasskeyCredential>> {
        Ok(self
            .credentials
            .read()
            .await
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_webauthn_user_id(
        &self,
        webauthn_user_id: &str,
    ) -> StorageResult<Option<PasskeyCredential>> {
        Ok(self
            .credentials
            .read()
            .await
            .values()
            .find(|c| c.webauthn_user_id.to_string() == webauthn_user_id)
            .cloned())
    }

    async fn create(&self, credential: PasskeyCredential) -> StorageResult<()> {
        self.credentials
            .write()
            .await
            .insert(credential.credential_id.to_string(), credential);
        Ok(())
    }

    async fn update_counter(&self, credential_id: &str, new_counter: u32) -> StorageResult<bool> {
        // Check and advance under one write lock: the linearisation point
        // for the strict-increase rule.
        let mut credentials = self.credentials.write().await;
        match credentials.get_mut(credential_id) {
            Some(cred) if new_counter > cred.counter => {
                cred.counter = new_counter;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_last_used(&self, credential_id: &str) -> StorageResult<()> {
        if let Some(cred) = self.credentials.write().await.get_mut(credential_id) {
            cred.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete(&self, credential_id: &str) -> StorageResult<()> {
        self.credentials.write().await.remove(credential_id);
        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: &str) -> StorageResult<()> {
        self.credentials
            .write()
            .await
            .retain(|_, c| c.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl ChallengeStore for MemoryStorage {
    async fn create(&self, challenge: ChallengeData) -> StorageResult<()> {
        self.challenges
            .write()
            .await
            .insert(challenge.challenge.clone(), challenge);
        Ok(())
    }

    async fn find(&self, challenge: &str) -> StorageResult<Option<ChallengeData>> {
        Ok(self
            .challenges
            .read()
            .await
            .get(challenge)
            .filter(|c| !c.is_expired())
            .cloned())
    }

    async fn delete(&self, challenge: &str) -> StorageResult<bool> {
        // An expired entry may still occupy the slot; removing it does not
        // count as consuming a live challenge.
        Ok(self
            .challenges
            .write()
            .await
            .remove(challenge)
            .map(|c| !c.is_expired())
            .unwrap_or(false))
    }

    async fn delete_expired(&self) -> StorageResult<()> {
        self.challenges.write().await.retain(|_, c| !c.is_expired());
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStorage {
    async fn create(&self, session_id: &str, session: Session) -> StorageResult<()> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), session);
        Ok(())
    }

    async fn find(&self, session_id: &str) -> StorageResult<Option<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .filter(|s| !s.is_expired())
            .cloned())
    }

    async fn update(&self, session_id: &str, session: Session) -> StorageResult<()> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), session);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StorageResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn delete_expired(&self) -> StorageResult<()> {
        self.sessions.write().await.retain(|_, s| !s.is_expired());
        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: &str) -> StorageResult<()> {
        self.sessions
            .write()
            .await
            .retain(|_, s| s.user_id != user_id);
        Ok(())
    }
}
