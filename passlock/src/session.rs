//! The session and ceremony-state data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which ceremony a stored challenge belongs to. A challenge issued for one
/// operation cannot be consumed by the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeremonyOperation {
    /// A `create()` ceremony.
    Registration,
    /// A `get()` ceremony.
    Authentication,
}

/// A challenge in flight, as held by the challenge store between options
/// generation and response verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeData {
    /// The challenge, Base64URL encoded. This is the store key.
    pub challenge: String,
    /// The user this challenge was issued for, when known at issue time.
    pub user_id: Option<String>,
    /// The ceremony this challenge belongs to.
    pub operation: CeremonyOperation,
    /// When the challenge was issued.
    pub created_at: DateTime<Utc>,
    /// When the challenge lapses: `created_at` plus the operation timeout.
    pub expires_at: DateTime<Utc>,
}

impl ChallengeData {
    /// Whether this challenge has lapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// An authenticated session, created after a successful authentication
/// ceremony. Sessions are persisted in the session store and/or carried
/// inside a sealed token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The random session identifier.
    pub session_id: String,
    /// The authenticated user.
    pub user_id: String,
    /// The credential that performed the authentication.
    pub credential_id: String,
    /// Whether the user was verified during the authentication.
    pub user_verified: bool,
    /// When this session lapses.
    pub expires_at: DateTime<Utc>,
    /// Caller supplied claims carried with the session.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    /// Whether this session has lapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// An application user, as the orchestration layer needs to see one. The
/// `id` here is your application identifier - it is never sent to the
/// client; a random Webauthn user handle is minted per registration
/// instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebauthnUser {
    /// The application's identifier for this user.
    pub id: String,
    /// The account name, shown by the client during ceremonies.
    pub username: String,
    /// A display name. Falls back to the username when absent.
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Duration;

    #[test]
    fn challenge_expiry() {
        let c = ChallengeData {
            challenge: "abc".to_string(),
            user_id: None,
            operation: CeremonyOperation::Registration,
            created_at: Utc::now() - Duration::milliseconds(70_000),
            expires_at: Utc::now() - Duration::milliseconds(10_000),
        };
        assert!(c.is_expired());
    }

    #[test]
    fn session_round_trips_extra_claims() {
        let mut extra = serde_json::Map::new();
        extra.insert("tenant".to_string(), serde_json::json!("acme"));
        let s = Session {
            session_id: "sid".to_string(),
            user_id: "u1".to_string(),
            credential_id: "c1".to_string(),
            user_verified: true,
            expires_at: Utc::now() + Duration::hours(1),
            extra,
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.extra["tenant"], "acme");
    }
}
