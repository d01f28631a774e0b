//! Sealed session tokens.
//!
//! A token is an authenticated, encrypted, self-describing string that
//! carries a session and its identifier. Tokens are opaque and URL-safe.
//!
//! Construction:
//! - a fresh 32 byte salt is drawn per token, and the content encryption
//!   key is `HMAC-SHA-256(key = salt, data = token_secret)`. Each token is
//!   thereby bound to its own key, and rotating `token_secret` never
//!   weakens unrelated tokens;
//! - the payload (UTF-8 JSON of the session id, session and creation time)
//!   is sealed with AES-256-GCM under a fresh 16 byte IV, producing a 16
//!   byte authentication tag;
//! - the envelope is Base64URL of JSON `{salt, iv, data, tag}`, each field
//!   itself Base64URL of its raw bytes.
//!
//! `open` collapses every failure to [WebauthnError::InvalidToken] - a
//! tampered ciphertext, a wrong secret and a malformed envelope are
//! indistinguishable to the caller.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Signer;
use openssl::symm::{decrypt_aead, encrypt_aead, Cipher};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::session::Session;
use passlock_core::error::{WebauthnError, WebauthnResult};
use passlock_core::proto::Base64UrlSafeData;

const SALT_SIZE: usize = 32;
const IV_SIZE: usize = 16;
const TAG_SIZE: usize = 16;
const SESSION_ID_SIZE: usize = 32;

#[derive(Serialize, Deserialize)]
struct TokenEnvelope {
    salt: Base64UrlSafeData,
    iv: Base64UrlSafeData,
    data: Base64UrlSafeData,
    tag: Base64UrlSafeData,
}

/// What a successfully opened token contains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenContents {
    /// The session identifier.
    pub session_id: String,
    /// The session as sealed into the token. When a session store is in
    /// use, the stored session is authoritative over this copy.
    pub data: Session,
    /// When the token was sealed.
    pub created_at: DateTime<Utc>,
}

/// Generate a fresh random session identifier.
pub fn generate_session_id() -> String {
    let mut id = [0u8; SESSION_ID_SIZE];
    rand::thread_rng().fill_bytes(&mut id);
    URL_SAFE_NO_PAD.encode(id)
}

fn derive_key(salt: &[u8], secret: &[u8]) -> WebauthnResult<Vec<u8>> {
    let hmac_key = PKey::hmac(salt)?;
    let mut signer = Signer::new(MessageDigest::sha256(), &hmac_key)?;
    Ok(signer.sign_oneshot_to_vec(secret)?)
}

/// Seal a session into a token under `secret`.
pub fn seal(session_id: &str, session: &Session, secret: &[u8]) -> WebauthnResult<String> {
    let contents = TokenContents {
        session_id: session_id.to_string(),
        data: session.clone(),
        created_at: Utc::now(),
    };
    let payload =
        serde_json::to_vec(&contents).map_err(|_| WebauthnError::TokenCreationFailure)?;

    let mut salt = vec![0u8; SALT_SIZE];
    let mut iv = vec![0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut iv);

    let key = derive_key(&salt, secret).map_err(|_| WebauthnError::TokenCreationFailure)?;

    let mut tag = vec![0u8; TAG_SIZE];
    let ciphertext = encrypt_aead(Cipher::aes_256_gcm(), &key, Some(&iv), &[], &payload, &mut tag)
        .map_err(|_| WebauthnError::TokenCreationFailure)?;

    let envelope = TokenEnvelope {
        salt: salt.into(),
        iv: iv.into(),
        data: ciphertext.into(),
        tag: tag.into(),
    };
    let envelope_json =
        serde_json::to_vec(&envelope).map_err(|_| WebauthnError::TokenCreationFailure)?;

    Ok(URL_SAFE_NO_PAD.encode(envelope_json))
}

/// Open a token sealed with [seal]. Any failure - wrong secret, tampering,
/// truncation, malformed structure - is reported as
/// [WebauthnError::InvalidToken] with no further detail.
pub fn open(token: &str, secret: &[u8]) -> WebauthnResult<TokenContents> {
    let envelope_json = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| WebauthnError::InvalidToken)?;
    let envelope: TokenEnvelope =
        serde_json::from_slice(&envelope_json).map_err(|_| WebauthnError::InvalidToken)?;

    let key = derive_key(&envelope.salt, secret).map_err(|_| WebauthnError::InvalidToken)?;

    // decrypt_aead checks the authentication tag before releasing any
    // plaintext.
    let payload = decrypt_aead(
        Cipher::aes_256_gcm(),
        &key,
        Some(envelope.iv.as_ref()),
        &[],
        envelope.data.as_ref(),
        envelope.tag.as_ref(),
    )
    .map_err(|_| WebauthnError::InvalidToken)?;

    serde_json::from_slice(&payload).map_err(|_| WebauthnError::InvalidToken)
}
