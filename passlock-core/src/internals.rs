//! Parsers for the binary structures authenticators emit: the fixed-layout
//! authenticator data, and the CBOR attestation object that wraps it during
//! registration.

use byteorder::{BigEndian, ByteOrder};
use serde::Deserialize;
use serde_cbor_2::Value;
use std::collections::BTreeMap;
use std::convert::TryFrom;

use crate::error::WebauthnError;
use crate::proto::CredentialID;

/// UP - the user was present (interacted with the authenticator).
pub const FLAG_USER_PRESENT: u8 = 0x01;
/// UV - the user was verified (pin, biometric, ...). Implies presence.
pub const FLAG_USER_VERIFIED: u8 = 0x04;
/// BE - the credential is eligible for backup (sync).
pub const FLAG_BACKUP_ELIGIBLE: u8 = 0x08;
/// BS - the credential is currently backed up.
pub const FLAG_BACKUP_STATE: u8 = 0x10;
/// AT - attested credential data follows the counter.
pub const FLAG_ATTESTED_CRED_DATA: u8 = 0x40;
/// ED - an extension map trails the structure.
pub const FLAG_EXTENSIONS: u8 = 0x80;

/// Decode the first complete CBOR value from `i`, returning it with the
/// unconsumed remainder. This is what lets the COSE key inside attested
/// credential data be separated from trailing extension bytes.
pub(crate) fn cbor_decode_first(i: &[u8]) -> Result<(Value, &[u8]), WebauthnError> {
    let mut deserializer = serde_cbor_2::Deserializer::from_slice(i);
    let v = Value::deserialize(&mut deserializer).map_err(WebauthnError::ParseCBORFailure)?;
    let consumed = deserializer.byte_offset();
    Ok((v, &i[consumed..]))
}

/// Look a key up in a CBOR map by its text name, falling back to the CTAP2
/// canonical integer key. Authenticator platforms disagree on which form
/// they emit.
pub(crate) fn cbor_map_get<'a>(
    m: &'a BTreeMap<Value, Value>,
    text: &str,
    int: i128,
) -> Option<&'a Value> {
    m.get(&Value::Text(text.to_string()))
        .or_else(|| m.get(&Value::Integer(int)))
}

/// Attested Credential Data
#[derive(Debug, Clone)]
pub struct AttestedCredentialData {
    /// The guid of the authenticator. May indicate manufacturer.
    pub aaguid: [u8; 16],
    /// The credential ID.
    pub credential_id: CredentialID,
    /// The credential's public key, as a parsed CBOR value.
    pub credential_pk: Value,
    /// The raw CBOR bytes of the public key, exactly as the authenticator
    /// delivered them. This is what gets persisted.
    pub credential_pk_bytes: Vec<u8>,
}

/// Data returned by the authenticator, summarising the ceremony it
/// performed.
#[derive(Debug, Clone)]
pub struct AuthenticatorData {
    /// SHA-256 hash of the relying party id the credential is scoped to.
    pub rp_id_hash: Vec<u8>,
    /// The raw flags byte.
    pub flags: u8,
    /// The signature counter. 0 when the authenticator does not track one.
    pub counter: u32,
    /// Flag: the user was present.
    pub user_present: bool,
    /// Flag: the user was verified. Implies presence.
    pub user_verified: bool,
    /// Flag: the credential may be backed up.
    pub backup_eligible: bool,
    /// Flag: the credential is currently backed up.
    pub backup_state: bool,
    /// The attested credential data, present during registration.
    pub acd: Option<AttestedCredentialData>,
    /// Extensions supplied by the device.
    pub extensions: Option<Value>,
}

impl TryFrom<&[u8]> for AuthenticatorData {
    type Error = WebauthnError;

    fn try_from(auth_data: &[u8]) -> Result<Self, Self::Error> {
        // [ rp_id_hash (32) | flags (1) | counter (4, BE) | acd? | ext? ]
        if auth_data.len() < 37 {
            return Err(WebauthnError::AuthenticatorDataTooShort);
        }

        let rp_id_hash: Vec<u8> = auth_data[0..32].into();
        let flags = auth_data[32];
        let counter = BigEndian::read_u32(&auth_data[33..37]);

        let acd_present = (flags & FLAG_ATTESTED_CRED_DATA) != 0;
        let extensions_present = (flags & FLAG_EXTENSIONS) != 0;

        let mut rest = &auth_data[37..];

        let acd = if acd_present {
            // [ aaguid (16) | cred id len (2, BE) | cred id | COSE key ]
            if rest.len() < 18 {
                return Err(WebauthnError::AttestedCredentialDataMalformed);
            }
            let mut aaguid = [0u8; 16];
            aaguid.copy_from_slice(&rest[0..16]);

            let cred_id_len = BigEndian::read_u16(&rest[16..18]) as usize;
            let cred_id_end = 18 + cred_id_len;
            if rest.len() < cred_id_end {
                return Err(WebauthnError::AttestedCredentialDataMalformed);
            }
            let credential_id: Vec<u8> = rest[18..cred_id_end].into();

            // The COSE key ends at the first complete CBOR value. Whatever
            // trails it belongs to the extension map.
            let key_bytes = &rest[cred_id_end..];
            let (credential_pk, remainder) = cbor_decode_first(key_bytes)
                .map_err(|_| WebauthnError::AttestedCredentialDataMalformed)?;
            let consumed = key_bytes.len() - remainder.len();
            let credential_pk_bytes: Vec<u8> = key_bytes[..consumed].into();

            rest = remainder;

            Some(AttestedCredentialData {
                aaguid,
                credential_id: credential_id.into(),
                credential_pk,
                credential_pk_bytes,
            })
        } else {
            None
        };

        let extensions = if extensions_present {
            let (ext, remainder) = cbor_decode_first(rest)?;
            if !remainder.is_empty() {
                debug!("trailing bytes after authenticator data extensions");
            }
            Some(ext)
        } else {
            if !rest.is_empty() {
                debug!("trailing bytes after authenticator data without ED flag");
            }
            None
        };

        Ok(AuthenticatorData {
            rp_id_hash,
            flags,
            counter,
            user_present: (flags & FLAG_USER_PRESENT) != 0,
            user_verified: (flags & FLAG_USER_VERIFIED) != 0,
            backup_eligible: (flags & FLAG_BACKUP_ELIGIBLE) != 0,
            backup_state: (flags & FLAG_BACKUP_STATE) != 0,
            acd,
            extensions,
        })
    }
}

impl AuthenticatorData {
    /// Check the presence and verification bits against the ceremony's
    /// requirements.
    pub fn verify_flags(
        &self,
        require_user_presence: bool,
        require_user_verification: bool,
    ) -> Result<(), WebauthnError> {
        if require_user_presence && !self.user_present {
            return Err(WebauthnError::UserNotPresent);
        }
        if require_user_verification && !self.user_verified {
            return Err(WebauthnError::UserNotVerified);
        }
        Ok(())
    }
}

/// The attestation object a client delivers during registration: the
/// authenticator data bundled with a format identifier and a statement in
/// that format.
#[derive(Debug, Clone)]
pub(crate) struct AttestationObject {
    pub auth_data: AuthenticatorData,
    pub auth_data_bytes: Vec<u8>,
    pub fmt: String,
    #[allow(dead_code)]
    pub att_stmt: Value,
}

impl TryFrom<&[u8]> for AttestationObject {
    type Error = WebauthnError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let value: Value = serde_cbor_2::from_slice(data)?;
        let map = cbor_try_map!(&value).map_err(|_| WebauthnError::AttestationStatementMapInvalid)?;

        // Browsers emit text keys; CTAP2 canonical form uses 1/2/3.
        let fmt_value =
            cbor_map_get(map, "fmt", 1).ok_or(WebauthnError::AttestationStatementMapInvalid)?;
        let fmt = cbor_try_string!(fmt_value)
            .map_err(|_| WebauthnError::AttestationStatementMapInvalid)?;

        let auth_data_value = cbor_map_get(map, "authData", 2)
            .ok_or(WebauthnError::AttestationStatementMapInvalid)?;
        let auth_data_bytes = cbor_try_bytes!(auth_data_value)
            .map_err(|_| WebauthnError::AttestationStatementMapInvalid)?
            .clone();

        let att_stmt = cbor_map_get(map, "attStmt", 3)
            .cloned()
            .ok_or(WebauthnError::AttestationStatementMapInvalid)?;

        let auth_data = AuthenticatorData::try_from(auth_data_bytes.as_slice())?;

        Ok(AttestationObject {
            auth_data,
            auth_data_bytes,
            fmt,
            att_stmt,
        })
    }
}
