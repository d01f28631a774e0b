//! Passlock - a Webauthn relying party library with sealed session tokens.
//!
//! This crate layers over `passlock-core`:
//!
//! * a validated, immutable relying party configuration, built through
//!   [WebauthnBuilder];
//! * ceremony orchestration against pluggable storage adapters (challenge
//!   single-use, counter advancement, last-used stamping);
//! * authenticated sessions, carried in AEAD-sealed tokens and optionally
//!   persisted through a session store.
//!
//! ```no_run
//! use passlock::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), WebauthnError> {
//! let storage = Arc::new(MemoryStorage::new());
//! let webauthn = WebauthnBuilder::new("example.com", "Example Corp")
//!     .origin("https://example.com")
//!     .token_secret(b"an at least 32 byte long secret!")
//!     .storage(storage)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]

#[macro_use]
extern crate tracing;

pub mod memory;
pub mod session;
pub mod storage;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

use chrono::{Duration, Utc};
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::session::{CeremonyOperation, ChallengeData, Session, WebauthnUser};
use crate::storage::{ChallengeStore, CredentialStore, SessionStore, UserStore};
use crate::token::TokenContents;

use passlock_core::error::{WebauthnError, WebauthnResult};
use passlock_core::proto::*;
use passlock_core::{
    AuthenticationOverrides, RegistrationOverrides, RelyingPartyConfig, WebauthnCore,
};

/// Everything most applications need.
pub mod prelude {
    pub use crate::memory::MemoryStorage;
    pub use crate::session::{CeremonyOperation, ChallengeData, Session, WebauthnUser};
    pub use crate::storage::{
        ChallengeStore, CredentialStore, SessionStore, StorageError, StoredUser, UserStore,
    };
    pub use crate::{Webauthn, WebauthnBuilder};
    pub use passlock_core::error::{WebauthnError, WebauthnResult};
    pub use passlock_core::proto::*;
    pub use passlock_core::{
        AuthenticationOverrides, RegistrationOverrides, RelyingPartyConfig, WebauthnCore,
    };
}

/// The default lifetime of a session: 24 hours.
pub const DEFAULT_SESSION_DURATION_MS: u64 = 24 * 3600 * 1000;

/// The smallest token secret accepted.
pub const MIN_TOKEN_SECRET_BYTES: usize = 32;

/// Builds a [Webauthn] instance, validating the configuration before any
/// ceremony can be issued.
pub struct WebauthnBuilder {
    config: RelyingPartyConfig,
    token_secret: Vec<u8>,
    session_duration_ms: u64,
    users: Option<Arc<dyn UserStore>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    challenges: Option<Arc<dyn ChallengeStore>>,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl fmt::Debug for WebauthnBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebauthnBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WebauthnBuilder {
    /// Start a builder for the relying party `rp_id` (a domain label, e.g.
    /// `example.com`) with the human readable `rp_name`.
    pub fn new(rp_id: &str, rp_name: &str) -> Self {
        WebauthnBuilder {
            config: RelyingPartyConfig::new(rp_name, rp_id, Vec::new()),
            token_secret: Vec::new(),
            session_duration_ms: DEFAULT_SESSION_DURATION_MS,
            users: None,
            credentials: None,
            challenges: None,
            sessions: None,
        }
    }

    /// Add an expected ceremony origin. Web origins are scheme + host +
    /// optional port (`https://app.example.com`); mobile origins are
    /// scheme-prefixed bundle identifiers (`android:apk-key-hash:...`).
    /// Matching at verification time is exact and case sensitive.
    pub fn origin(mut self, origin: &str) -> Self {
        self.config.origins.push(origin.to_string());
        self
    }

    /// The secret that seals session tokens. At least 32 bytes. The secret
    /// is held in memory for the lifetime of the instance and is never
    /// logged.
    pub fn token_secret(mut self, secret: &[u8]) -> Self {
        self.token_secret = secret.to_vec();
        self
    }

    /// The signature algorithms offered to clients, in preference order.
    pub fn supported_algorithms(mut self, algorithms: Vec<COSEAlgorithm>) -> Self {
        self.config.supported_algorithms = algorithms;
        self
    }

    /// The attestation conveyance requested at registration. Defaults to
    /// `none`.
    pub fn attestation_preference(mut self, pref: AttestationConveyancePreference) -> Self {
        self.config.attestation_preference = pref;
        self
    }

    /// The user verification policy. Defaults to `preferred`.
    pub fn user_verification_policy(mut self, policy: UserVerificationPolicy) -> Self {
        self.config.user_verification_policy = policy;
        self
    }

    /// Authenticator selection hints layered into every registration.
    pub fn authenticator_selection(mut self, selection: AuthenticatorSelectionCriteria) -> Self {
        self.config.authenticator_selection = Some(selection);
        self
    }

    /// The challenge length in bytes, within [16, 64]. Defaults to 32.
    pub fn challenge_size_bytes(mut self, size: usize) -> Self {
        self.config.challenge_size_bytes = size;
        self
    }

    /// The client ceremony timeout in milliseconds, at least 10 000.
    /// Defaults to 60 000.
    pub fn operation_timeout_ms(mut self, timeout: u32) -> Self {
        self.config.operation_timeout_ms = timeout;
        self
    }

    /// How long a session lives, in milliseconds. Defaults to 24 hours.
    pub fn session_duration_ms(mut self, duration: u64) -> Self {
        self.session_duration_ms = duration;
        self
    }

    /// Attach one adapter as every store at once.
    pub fn storage<S>(mut self, storage: Arc<S>) -> Self
    where
        S: UserStore + CredentialStore + ChallengeStore + SessionStore + 'static,
    {
        self.users = Some(storage.clone());
        self.credentials = Some(storage.clone());
        self.challenges = Some(storage.clone());
        self.sessions = Some(storage);
        self
    }

    /// Attach a user store.
    pub fn user_store(mut self, store: Arc<dyn UserStore>) -> Self {
        self.users = Some(store);
        self
    }

    /// Attach a credential store.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Attach a challenge store. Without one, challenge single-use is your
    /// responsibility.
    pub fn challenge_store(mut self, store: Arc<dyn ChallengeStore>) -> Self {
        self.challenges = Some(store);
        self
    }

    /// Attach a session store. Without one, sessions live only inside their
    /// tokens.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    /// Validate the configuration and build the [Webauthn] instance.
    pub fn build(self) -> WebauthnResult<Webauthn> {
        self.config.validate()?;

        if self.token_secret.len() < MIN_TOKEN_SECRET_BYTES {
            return Err(WebauthnError::Configuration(
                "token_secret must be at least 32 bytes",
            ));
        }
        if self.session_duration_ms == 0 {
            return Err(WebauthnError::Configuration(
                "session_duration_ms must be non-zero",
            ));
        }

        // Every web origin must be scoped to the rp_id: its host is either
        // the rp_id itself or a subdomain of it. Non-web origins (mobile
        // bundle identifiers) cannot be checked this way and are taken as
        // given.
        for origin in &self.config.origins {
            if origin.starts_with("http://") || origin.starts_with("https://") {
                let rp_id = &self.config.rp_id;
                let valid = Url::parse(origin)
                    .ok()
                    .and_then(|url| url.host_str().map(|h| h.to_string()))
                    .map(|host| host == *rp_id || host.ends_with(&format!(".{rp_id}")))
                    .unwrap_or(false);
                if !valid {
                    error!(%origin, rp_id = %self.config.rp_id, "rp_id is not an effective domain of origin");
                    return Err(WebauthnError::Configuration(
                        "rp_id is not an effective domain of an origin",
                    ));
                }
            }
        }

        Ok(Webauthn {
            // Validation happened above, which is what the contract wants.
            core: unsafe { WebauthnCore::new(self.config) },
            token_secret: self.token_secret,
            session_duration_ms: self.session_duration_ms,
            users: self.users,
            credentials: self.credentials,
            challenges: self.challenges,
            sessions: self.sessions,
        })
    }
}

/// A configured Webauthn relying party.
///
/// All methods are safe to call from concurrent tasks; the only shared
/// mutable state lives in the storage adapters.
pub struct Webauthn {
    core: WebauthnCore,
    token_secret: Vec<u8>,
    session_duration_ms: u64,
    users: Option<Arc<dyn UserStore>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    challenges: Option<Arc<dyn ChallengeStore>>,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl fmt::Debug for Webauthn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The token secret must never appear in debug output.
        f.debug_struct("Webauthn")
            .field("config", self.core.config())
            .finish_non_exhaustive()
    }
}

impl Webauthn {
    /// The underlying ceremony engine, for callers that manage ceremony
    /// inputs themselves.
    pub fn core(&self) -> &WebauthnCore {
        &self.core
    }

    /// The attached user store, if any. The ceremony engine never consumes
    /// it; it is plumbed for application convenience.
    pub fn user_store(&self) -> Option<&Arc<dyn UserStore>> {
        self.users.as_ref()
    }

    fn storage_err(e: crate::storage::StorageError) -> WebauthnError {
        WebauthnError::Storage(e.to_string())
    }

    async fn put_challenge(
        &self,
        challenge: &Base64UrlSafeData,
        user_id: Option<&str>,
        operation: CeremonyOperation,
        timeout_ms: u32,
    ) -> WebauthnResult<()> {
        if let Some(challenges) = &self.challenges {
            let now = Utc::now();
            challenges
                .create(ChallengeData {
                    challenge: challenge.to_string(),
                    user_id: user_id.map(str::to_string),
                    operation,
                    created_at: now,
                    expires_at: now + Duration::milliseconds(i64::from(timeout_ms)),
                })
                .await
                .map_err(Self::storage_err)?;
        }
        Ok(())
    }

    /// Fetch the challenge from the store and require it to be live and
    /// issued for `operation`. A no-op without a challenge store.
    async fn check_challenge(
        &self,
        challenge: &Base64UrlSafeData,
        operation: CeremonyOperation,
    ) -> WebauthnResult<()> {
        if let Some(challenges) = &self.challenges {
            let found = challenges
                .find(&challenge.to_string())
                .await
                .map_err(Self::storage_err)?;
            match found {
                Some(data) if data.operation == operation => Ok(()),
                _ => Err(WebauthnError::ChallengeNotFound),
            }
        } else {
            Ok(())
        }
    }

    /// Consume the challenge. Exactly one concurrent verification of the
    /// same challenge can succeed here. A no-op without a challenge store.
    async fn consume_challenge(&self, challenge: &Base64UrlSafeData) -> WebauthnResult<()> {
        if let Some(challenges) = &self.challenges {
            let consumed = challenges
                .delete(&challenge.to_string())
                .await
                .map_err(Self::storage_err)?;
            if !consumed {
                return Err(WebauthnError::ChallengeNotFound);
            }
        }
        Ok(())
    }

    /// Begin a registration ceremony for `user`.
    ///
    /// Returns the options to send to the client and the state to hold for
    /// [Webauthn::finish_registration]. When a credential store is attached
    /// and the caller supplied no exclusion list, the user's existing
    /// credentials are excluded automatically.
    pub async fn start_registration(
        &self,
        user: &WebauthnUser,
        overrides: &RegistrationOverrides,
    ) -> WebauthnResult<(PublicKeyCredentialCreationOptions, RegistrationState)> {
        let mut overrides = overrides.clone();
        if overrides.exclude_credentials.is_none() {
            if let Some(credentials) = &self.credentials {
                let existing = credentials
                    .find_by_user_id(&user.id)
                    .await
                    .map_err(Self::storage_err)?;
                if !existing.is_empty() {
                    overrides.exclude_credentials = Some(
                        existing
                            .into_iter()
                            .map(|c| {
                                PublicKeyCredentialDescriptor::new(
                                    c.credential_id,
                                    if c.transports.is_empty() {
                                        None
                                    } else {
                                        Some(c.transports)
                                    },
                                )
                            })
                            .collect(),
                    );
                }
            }
        }

        let (options, state) = self.core.generate_challenge_register(
            &user.username,
            user.display_name.as_deref(),
            &overrides,
        )?;

        self.put_challenge(
            state.challenge(),
            Some(&user.id),
            CeremonyOperation::Registration,
            options.timeout.unwrap_or(self.core.config().operation_timeout_ms),
        )
        .await?;

        Ok((options, state))
    }

    /// Complete a registration ceremony.
    ///
    /// On success the challenge is consumed and the assembled credential is
    /// returned. Persisting it (for example through your credential store)
    /// remains your responsibility, so that you can attach application
    /// metadata in the same transaction.
    pub async fn finish_registration(
        &self,
        user: &WebauthnUser,
        reg: &RegisterPublicKeyCredential,
        state: &RegistrationState,
    ) -> WebauthnResult<PasskeyCredential> {
        self.check_challenge(state.challenge(), CeremonyOperation::Registration)
            .await?;

        let info = self.core.register_credential(reg, state)?;

        // The credential id must not already be registered, to this or any
        // other user.
        if let Some(credentials) = &self.credentials {
            let existing = credentials
                .find_by_id(&info.credential_id.to_string())
                .await
                .map_err(Self::storage_err)?;
            if existing.is_some() {
                return Err(WebauthnError::CredentialAlreadyExists);
            }
        }

        self.consume_challenge(state.challenge()).await?;

        Ok(PasskeyCredential::from_registration(
            &user.id,
            state.webauthn_user_id().clone(),
            &info,
        ))
    }

    /// Begin an authentication ceremony.
    ///
    /// With `user_id` and an attached credential store, the user's
    /// credentials populate `allowCredentials`. Without either, the list is
    /// omitted and the client may use any discoverable credential scoped to
    /// the relying party.
    pub async fn start_authentication(
        &self,
        user_id: Option<&str>,
        overrides: &AuthenticationOverrides,
    ) -> WebauthnResult<(PublicKeyCredentialRequestOptions, AuthenticationState)> {
        let mut allow = Vec::new();
        if let (Some(user_id), Some(credentials)) = (user_id, &self.credentials) {
            allow = credentials
                .find_by_user_id(user_id)
                .await
                .map_err(Self::storage_err)?
                .into_iter()
                .map(|c| AllowCredentials {
                    type_: "public-key".to_string(),
                    id: c.credential_id,
                    transports: if c.transports.is_empty() {
                        None
                    } else {
                        Some(c.transports)
                    },
                })
                .collect();
        }

        let (options, state) = self.core.generate_challenge_authenticate(allow, overrides)?;

        self.put_challenge(
            state.challenge(),
            user_id,
            CeremonyOperation::Authentication,
            options.timeout.unwrap_or(self.core.config().operation_timeout_ms),
        )
        .await?;

        Ok((options, state))
    }

    /// Complete an authentication ceremony, looking the asserted credential
    /// up in the credential store.
    ///
    /// On success the challenge is consumed, the stored counter advanced,
    /// and the last-used stamp refreshed.
    pub async fn finish_authentication(
        &self,
        rsp: &PublicKeyCredential,
        state: &AuthenticationState,
    ) -> WebauthnResult<VerifiedAuthenticationInfo> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(WebauthnError::Configuration(
                "finish_authentication requires a credential store; use finish_authentication_with_credential",
            ))?
            .clone();

        let cred = credentials
            .find_by_id(&rsp.raw_id.to_string())
            .await
            .map_err(Self::storage_err)?
            .ok_or(WebauthnError::CredentialNotFound)?;

        let info = self
            .finish_authentication_with_credential(rsp, state, &cred)
            .await?;

        // Advance the counter. The conditional update is the linearisation
        // point: when two authentications race with the same counter value,
        // only one may win.
        if !(info.new_counter == 0 && cred.counter == 0) {
            let advanced = credentials
                .update_counter(&cred.credential_id.to_string(), info.new_counter)
                .await
                .map_err(Self::storage_err)?;
            if !advanced {
                return Err(WebauthnError::CredentialPossibleCompromise);
            }
        }
        credentials
            .update_last_used(&cred.credential_id.to_string())
            .await
            .map_err(Self::storage_err)?;

        Ok(info)
    }

    /// Complete an authentication ceremony against a credential the caller
    /// already holds. Consumes the challenge but performs no credential
    /// store writes.
    pub async fn finish_authentication_with_credential(
        &self,
        rsp: &PublicKeyCredential,
        state: &AuthenticationState,
        cred: &PasskeyCredential,
    ) -> WebauthnResult<VerifiedAuthenticationInfo> {
        self.check_challenge(state.challenge(), CeremonyOperation::Authentication)
            .await?;

        let info = self.core.authenticate_credential(rsp, state, cred)?;

        self.consume_challenge(state.challenge()).await?;

        Ok(info)
    }

    // ---- sessions ----

    /// Create a session for an authenticated user and seal it into a token.
    ///
    /// The session is persisted when a session store is attached. The token
    /// alone is sufficient to validate the session otherwise.
    pub async fn create_session(
        &self,
        user_id: &str,
        credential_id: &str,
        user_verified: bool,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> WebauthnResult<(String, Session)> {
        let session_id = token::generate_session_id();
        let session = Session {
            session_id: session_id.clone(),
            user_id: user_id.to_string(),
            credential_id: credential_id.to_string(),
            user_verified,
            expires_at: Utc::now() + Duration::milliseconds(self.session_duration_ms as i64),
            extra,
        };

        if let Some(sessions) = &self.sessions {
            sessions
                .create(&session_id, session.clone())
                .await
                .map_err(Self::storage_err)?;
        }

        let sealed = token::seal(&session_id, &session, &self.token_secret)?;
        Ok((sealed, session))
    }

    /// Validate a session token.
    ///
    /// The token must open and be unexpired. When a session store is
    /// attached the session must also still exist there, and the stored
    /// copy wins over the token-embedded one (it may have been refreshed).
    pub async fn validate_session(&self, sealed: &str) -> WebauthnResult<Session> {
        let contents = token::open(sealed, &self.token_secret)?;

        if contents.data.is_expired() {
            return Err(WebauthnError::SessionExpired);
        }

        if let Some(sessions) = &self.sessions {
            let stored = sessions
                .find(&contents.session_id)
                .await
                .map_err(Self::storage_err)?
                .ok_or(WebauthnError::SessionNotFound)?;
            if stored.is_expired() {
                return Err(WebauthnError::SessionExpired);
            }
            return Ok(stored);
        }

        Ok(contents.data)
    }

    /// Validate a session token and extend its lifetime, returning a fresh
    /// token carrying the updated session.
    pub async fn refresh_session(&self, sealed: &str) -> WebauthnResult<(String, Session)> {
        let mut session = self.validate_session(sealed).await?;
        session.expires_at = Utc::now() + Duration::milliseconds(self.session_duration_ms as i64);

        if let Some(sessions) = &self.sessions {
            sessions
                .update(&session.session_id, session.clone())
                .await
                .map_err(Self::storage_err)?;
        }

        let resealed = token::seal(&session.session_id, &session, &self.token_secret)?;
        Ok((resealed, session))
    }

    /// Revoke the session a token refers to. Revoking an invalid, expired
    /// or unknown token is a no-op; this method never fails.
    pub async fn revoke_session(&self, sealed: &str) {
        let contents: TokenContents = match token::open(sealed, &self.token_secret) {
            Ok(c) => c,
            Err(_) => {
                debug!("revoke of an unopenable token ignored");
                return;
            }
        };

        if let Some(sessions) = &self.sessions {
            if let Err(e) = sessions.delete(&contents.session_id).await {
                debug!(error = %e, "session delete during revoke failed");
            }
        }
    }

    /// Sweep expired challenges and sessions from the attached stores.
    pub async fn cleanup(&self) -> WebauthnResult<()> {
        if let Some(challenges) = &self.challenges {
            challenges.delete_expired().await.map_err(Self::storage_err)?;
        }
        if let Some(sessions) = &self.sessions {
            sessions.delete_expired().await.map_err(Self::storage_err)?;
        }
        Ok(())
    }
}
