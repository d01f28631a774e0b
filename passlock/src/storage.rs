//! Storage adapter traits.
//!
//! The core consumes four narrow capabilities: credentials, challenges,
//! sessions and (for caller convenience only) users. Implement the traits
//! over your database of choice; [crate::MemoryStorage] is the reference
//! implementation and defines the expiry semantics adapters must honour.
//!
//! All operations may fail with [StorageError], which the library surfaces
//! to callers as `STORAGE_ERROR`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{ChallengeData, Session};
use passlock_core::proto::PasskeyCredential;

/// A fault inside a storage adapter.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct StorageError(pub String);

/// Result alias for adapter operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A stored application user. Offered for caller convenience; the ceremony
/// engine itself never touches this store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    /// The application's identifier for this user.
    pub id: String,
    /// The unique account name.
    pub username: String,
    /// An optional display name.
    pub display_name: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user by id.
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<StoredUser>>;
    /// Fetch a user by username.
    async fn find_by_username(&self, username: &str) -> StorageResult<Option<StoredUser>>;
    /// Persist a new user.
    async fn create(&self, user: StoredUser) -> StorageResult<()>;
    /// Replace a stored user.
    async fn update(&self, user: StoredUser) -> StorageResult<()>;
    /// Delete a user by id.
    async fn delete(&self, id: &str) -> StorageResult<()>;
}

/// Credential persistence. `credential_id` keys are the unpadded Base64URL
/// form of the credential id bytes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch a credential by its id.
    async fn find_by_id(&self, credential_id: &str) -> StorageResult<Option<PasskeyCredential>>;
    /// All credentials owned by an application user.
    async fn find_by_user_id(&self, user_id: &str) -> StorageResult<Vec<PasskeyCredential>>;
    /// Fetch the credential registered under a Webauthn user handle
    /// (unpadded Base64URL). Used by discoverable credential flows.
    async fn find_by_webauthn_user_id(
        &self,
        webauthn_user_id: &str,
    ) -> StorageResult<Option<PasskeyCredential>>;
    /// Persist a new credential.
    async fn create(&self, credential: PasskeyCredential) -> StorageResult<()>;
    /// Advance the stored signature counter to `new_counter`.
    ///
    /// The update must be linearisable per credential, and conditional:
    /// return `true` only if `new_counter` was strictly greater than the
    /// stored value at the moment of the update. Two racing authentications
    /// presenting the same counter must not both observe `true`.
    async fn update_counter(&self, credential_id: &str, new_counter: u32) -> StorageResult<bool>;
    /// Stamp the credential's last-used time.
    async fn update_last_used(&self, credential_id: &str) -> StorageResult<()>;
    /// Delete a credential by its id.
    async fn delete(&self, credential_id: &str) -> StorageResult<()>;
    /// Delete every credential owned by a user.
    async fn delete_by_user_id(&self, user_id: &str) -> StorageResult<()>;
}

/// Challenge persistence. Challenges are keyed by their unpadded Base64URL
/// value and are strictly single-use.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Store a freshly issued challenge.
    async fn create(&self, challenge: ChallengeData) -> StorageResult<()>;
    /// Fetch a live challenge. Expired entries behave as absent.
    async fn find(&self, challenge: &str) -> StorageResult<Option<ChallengeData>>;
    /// Remove a challenge, returning whether a live entry was removed.
    ///
    /// This is the at-most-once guard: of two verifications racing on the
    /// same challenge, exactly one may observe `true`.
    async fn delete(&self, challenge: &str) -> StorageResult<bool>;
    /// Sweep expired challenges.
    async fn delete_expired(&self) -> StorageResult<()>;
}

/// Session persistence. Sessions are keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session.
    async fn create(&self, session_id: &str, session: Session) -> StorageResult<()>;
    /// Fetch a live session. Expired entries behave as absent.
    async fn find(&self, session_id: &str) -> StorageResult<Option<Session>>;
    /// Replace a stored session.
    async fn update(&self, session_id: &str, session: Session) -> StorageResult<()>;
    /// Delete a session.
    async fn delete(&self, session_id: &str) -> StorageResult<()>;
    /// Sweep expired sessions.
    async fn delete_expired(&self) -> StorageResult<()>;
    /// Delete every session belonging to a user.
    async fn delete_by_user_id(&self, user_id: &str) -> StorageResult<()>;
}
