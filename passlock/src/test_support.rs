//! Fixtures shared between unit tests.

use chrono::{Duration, Utc};

use crate::session::Session;
use passlock_core::proto::{CredentialDeviceType, PasskeyCredential};

pub(crate) fn credential_fixture() -> PasskeyCredential {
    PasskeyCredential {
        credential_id: vec![0xaa; 32].into(),
        public_key_cose: vec![0xbb; 77].into(),
        counter: 0,
        transports: vec![],
        device_type: CredentialDeviceType::SingleDevice,
        backed_up: false,
        user_id: "u1".to_string(),
        webauthn_user_id: vec![0xcc; 32].into(),
        created_at: Utc::now(),
        last_used_at: None,
        aaguid: None,
    }
}

pub(crate) fn session_fixture() -> Session {
    Session {
        session_id: "s1".to_string(),
        user_id: "u1".to_string(),
        credential_id: "c1".to_string(),
        user_verified: false,
        expires_at: Utc::now() + Duration::hours(1),
        extra: serde_json::Map::new(),
    }
}
