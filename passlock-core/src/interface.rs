//! Extended Structs and representations for Webauthn Operations. These types
//! are designed to allow persistence and should not change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use passlock_proto::{
    AuthenticatorTransport, Base64UrlSafeData, COSEAlgorithm, CredentialID,
};

/// Representation of an AAGUID
/// <https://www.w3.org/TR/webauthn/#aaguid>
pub type Aaguid = [u8; 16];

/// An EDDSACurve identifier. You probably will never need to alter
/// or use this value, as it is set inside the Credential for you.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EDDSACurve {
    /// Identifies this OKP as ED25519
    ED25519 = 6,
}

/// An ECDSACurve identifier. You probably will never need to alter
/// or use this value, as it is set inside the Credential for you.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ECDSACurve {
    // +---------+-------+----------+------------------------------------+
    // | Name    | Value | Key Type | Description                        |
    // +---------+-------+----------+------------------------------------+
    // | P-256   | 1     | EC2      | NIST P-256 also known as secp256r1 |
    // | P-384   | 2     | EC2      | NIST P-384 also known as secp384r1 |
    // | P-521   | 3     | EC2      | NIST P-521 also known as secp521r1 |
    // +---------+-------+----------+------------------------------------+
    /// Identifies this curve as SECP256R1 (X9_62_PRIME256V1 in OpenSSL)
    SECP256R1 = 1,
    /// Identifies this curve as SECP384R1
    SECP384R1 = 2,
    /// Identifies this curve as SECP521R1
    SECP521R1 = 3,
}

/// A COSE Elliptic Curve Public Key. This is generally the provided
/// credential that an authenticator registers, and is used to authenticate
/// the user. You will likely never need to interact with this value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct COSEEC2Key {
    /// The curve that this key references.
    pub curve: ECDSACurve,
    /// The key's public X coordinate.
    pub x: Base64UrlSafeData,
    /// The key's public Y coordinate.
    pub y: Base64UrlSafeData,
}

/// A COSE Octet Key Pair Public Key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct COSEOKPKey {
    /// The curve that this key references.
    pub curve: EDDSACurve,
    /// The key's public point.
    pub x: Base64UrlSafeData,
}

/// A COSE RSA Public Key. This is a provided credential from a registered
/// authenticator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct COSERSAKey {
    /// An RSA modulus, big endian.
    pub n: Base64UrlSafeData,
    /// An RSA exponent, big endian.
    pub e: Base64UrlSafeData,
}

/// The type of Key contained within a COSE value. You should never need
/// to alter or change this type.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum COSEKeyType {
    //    +-----------+-------+-----------------------------------------------+
    //    | Name      | Value | Description                                   |
    //    +-----------+-------+-----------------------------------------------+
    //    | OKP       | 1     | Octet Key Pair                                |
    //    | EC2       | 2     | Elliptic Curve Keys w/ x- and y-coordinate    |
    //    |           |       | pair                                          |
    //    | RSA       | 3     | RSA keys w/ modulus and exponent              |
    //    | Symmetric | 4     | Symmetric Keys                                |
    //    | Reserved  | 0     | This value is reserved                        |
    //    +-----------+-------+-----------------------------------------------+
    /// Identifies this as an Elliptic Curve octet key pair
    EC_OKP(COSEOKPKey),
    /// Identifies this as an Elliptic Curve EC2 key
    EC_EC2(COSEEC2Key),
    /// Identifies this as an RSA key
    RSA(COSERSAKey),
}

/// A COSE Key as provided by the Authenticator. You should never need
/// to alter or change these values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct COSEKey {
    /// The signature algorithm this key is used with. When the authenticator
    /// omitted the alg entry, this is the algorithm implied by the key shape.
    pub type_: COSEAlgorithm,
    /// The public key
    pub key: COSEKeyType,
}

/// Whether a credential is bound to a single piece of hardware, or may be
/// synchronised between devices (a passkey in a cloud keychain). Derived
/// from the backup eligibility flag at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialDeviceType {
    /// The credential exists only inside one authenticator.
    SingleDevice,
    /// The credential may be synchronised between the user's devices.
    MultiDevice,
}

/// A user's registered credential, in the form your credential store
/// persists. These can be safely serialised and deserialised from a
/// database for use.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasskeyCredential {
    /// The ID of this credential, unique across all users.
    pub credential_id: CredentialID,
    /// The credential public key, as the raw COSE CBOR bytes delivered by
    /// the authenticator at registration.
    pub public_key_cose: Base64UrlSafeData,
    /// The signature counter. 0 when the authenticator does not track one.
    pub counter: u32,
    /// The transports the client reported for this credential.
    pub transports: Vec<AuthenticatorTransport>,
    /// Single- or multi-device, from the backup eligibility flag.
    pub device_type: CredentialDeviceType,
    /// Whether the credential was backed up when last seen.
    pub backed_up: bool,
    /// The application user that owns this credential.
    pub user_id: String,
    /// The random Webauthn user handle minted for this user at registration.
    /// Distinct from `user_id`; contains no identifying information.
    pub webauthn_user_id: Base64UrlSafeData,
    /// When this credential was registered.
    pub created_at: DateTime<Utc>,
    /// When this credential last completed an authentication.
    pub last_used_at: Option<DateTime<Utc>>,
    /// The authenticator model guid, when the authenticator disclosed one.
    pub aaguid: Option<Base64UrlSafeData>,
}

impl PasskeyCredential {
    /// Assemble a credential for persistence from a verified registration.
    pub fn from_registration(
        user_id: &str,
        webauthn_user_id: Base64UrlSafeData,
        info: &VerifiedRegistrationInfo,
    ) -> Self {
        PasskeyCredential {
            credential_id: info.credential_id.clone(),
            public_key_cose: info.public_key_cose.clone(),
            counter: info.counter,
            transports: info.transports.clone(),
            device_type: info.device_type,
            backed_up: info.backed_up,
            user_id: user_id.to_string(),
            webauthn_user_id,
            created_at: Utc::now(),
            last_used_at: None,
            aaguid: info.aaguid.clone(),
        }
    }
}

/// The in progress state of a credential registration attempt. You must
/// persist this, associated to the user requesting the registration, for
/// the duration of the ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationState {
    pub(crate) challenge: Base64UrlSafeData,
    pub(crate) webauthn_user_id: Base64UrlSafeData,
    pub(crate) require_user_verification: bool,
    pub(crate) exclude_credentials: Vec<CredentialID>,
}

impl RegistrationState {
    /// The challenge issued for this ceremony.
    pub fn challenge(&self) -> &Base64UrlSafeData {
        &self.challenge
    }

    /// The user handle minted for this registration. Persist it with the
    /// credential so discoverable flows can map the handle back to the user.
    pub fn webauthn_user_id(&self) -> &Base64UrlSafeData {
        &self.webauthn_user_id
    }
}

/// The in progress state of an authentication attempt. You must persist
/// this, associated to the user requesting the authentication, for the
/// duration of the ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationState {
    pub(crate) challenge: Base64UrlSafeData,
    pub(crate) require_user_verification: bool,
    pub(crate) rp_ids: Vec<String>,
    pub(crate) allow_credentials: Vec<CredentialID>,
}

impl AuthenticationState {
    /// The challenge issued for this ceremony.
    pub fn challenge(&self) -> &Base64UrlSafeData {
        &self.challenge
    }

    /// Set which credentials the user is allowed to authenticate with. Used
    /// in discoverable flows after the user handle identifies the account.
    pub fn set_allowed_credentials(&mut self, allow_credentials: Vec<CredentialID>) {
        self.allow_credentials = allow_credentials;
    }
}

/// Everything the relying party learns from a successful registration.
/// Persist the credential material, and apply your own policy to the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedRegistrationInfo {
    /// The new credential's id.
    pub credential_id: CredentialID,
    /// The raw COSE bytes of the credential public key.
    pub public_key_cose: Base64UrlSafeData,
    /// The signature algorithm of the credential public key.
    pub algorithm: COSEAlgorithm,
    /// The initial signature counter.
    pub counter: u32,
    /// Transports the client reported, copied through as-is.
    pub transports: Vec<AuthenticatorTransport>,
    /// Single- or multi-device, from the backup eligibility flag.
    pub device_type: CredentialDeviceType,
    /// Whether the credential is currently backed up.
    pub backed_up: bool,
    /// The client origin this registration was performed against.
    pub origin: String,
    /// The relying party id whose hash matched the authenticator data.
    pub rp_id: String,
    /// Whether the user was verified during the ceremony.
    pub user_verified: bool,
    /// The authenticator model guid. None when the authenticator returned
    /// the anonymised all-zero value.
    pub aaguid: Option<Base64UrlSafeData>,
    /// The attestation statement format the client conveyed. Formats other
    /// than `none` are NOT validated by this library - do not treat this
    /// value as a verified property.
    pub attestation_format: String,
}

/// Everything the relying party learns from a successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedAuthenticationInfo {
    /// The credential that signed the assertion.
    pub credential_id: CredentialID,
    /// The counter value in the assertion. Store this as the credential's
    /// counter (the counter rule has already been enforced).
    pub new_counter: u32,
    /// The client origin the assertion was performed against.
    pub origin: String,
    /// The relying party id whose hash matched the authenticator data.
    pub rp_id: String,
    /// Whether the user was verified during the ceremony.
    pub user_verified: bool,
    /// Whether the credential reported being backed up.
    pub backup_state: bool,
}
