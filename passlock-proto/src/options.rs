//! Types that define options as to how an authenticator may interact with
//! with the server.

use crate::base64_data::Base64UrlSafeData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A credential ID type. At the moment this is a vector of bytes, but
/// it could also be a future change for this to be base64 string instead.
///
/// If changed, this would likely be a major library version change.
pub type CredentialID = Base64UrlSafeData;

/// Defines the User Authenticator Verification policy. This is documented
/// <https://w3c.github.io/webauthn/#enumdef-userverificationrequirement>.
///
/// Verification means the authenticator performed an extra interaction with
/// the user to verify who they are - a fingerprint on Touch Id, or a pin on
/// a yubico device. Presence alone only shows that *someone* touched the
/// device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationPolicy {
    /// Require the User Verification bit to be set, and fail the ceremony
    /// if it is not.
    Required,
    /// Prefer verification if the authenticator can do it, but do not fail
    /// the ceremony when it does not.
    #[default]
    Preferred,
    /// Request that no verification is performed.
    Discouraged,
}

/// The residency preference for the created credential.
/// <https://www.w3.org/TR/webauthn-2/#enum-residentKeyRequirement>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    /// The credential must be resident (discoverable) or the ceremony fails.
    Required,
    /// Create a resident credential if the authenticator supports it.
    #[default]
    Preferred,
    /// Prefer a non-resident credential.
    Discouraged,
}

/// Relying Party Entity
#[derive(Debug, Serialize, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelyingParty {
    /// The id of the relying party.
    pub id: String,
    /// The name of the relying party.
    pub name: String,
    /// Deprecated by the standard, but still accepted by some clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// User Entity
#[derive(Debug, Serialize, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// The user handle in base64 form. This MUST be a unique id, and
    /// must NOT contain personally identifying information, as this value can
    /// NEVER be changed.
    pub id: Base64UrlSafeData,
    /// The user's preferred name for display.
    pub name: String,
    /// The user's preferred display name.
    pub display_name: String,
}

/// Public key cryptographic parameters
#[derive(Debug, Serialize, Clone, Deserialize)]
pub struct PubKeyCredParams {
    /// The type of public-key credential.
    #[serde(rename = "type")]
    pub type_: String,
    /// The algorithm in use defined by COSE.
    pub alg: i64,
}

/// <https://www.w3.org/TR/webauthn/#enumdef-attestationconveyancepreference>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyancePreference {
    /// Do not request attestation.
    #[default]
    None,

    /// Request attestation in a semi-anonymized form.
    Indirect,

    /// Request attestation in a direct form.
    Direct,

    /// Request an enterprise attestation, which may contain uniquely
    /// identifying information. Clients only honour this for configured
    /// relying parties.
    Enterprise,
}

/// <https://www.w3.org/TR/webauthn/#enumdef-authenticatortransport>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorTransport {
    /// <https://www.w3.org/TR/webauthn/#dom-authenticatortransport-usb>
    Usb,
    /// <https://www.w3.org/TR/webauthn/#dom-authenticatortransport-nfc>
    Nfc,
    /// <https://www.w3.org/TR/webauthn/#dom-authenticatortransport-ble>
    Ble,
    /// Cross-device flows, i.e. caBLE v2
    Hybrid,
    /// <https://www.w3.org/TR/webauthn/#dom-authenticatortransport-internal>
    Internal,
    /// The predecessor of hybrid, caBLE v1
    Cable,
    /// A smart card, per CTAP 2.2
    SmartCard,
    /// A transport this library does not know. Carried so that stored
    /// credentials survive future client values.
    #[serde(other)]
    Unknown,
}

/// <https://www.w3.org/TR/webauthn/#dictdef-publickeycredentialdescriptor>
#[derive(Debug, Serialize, Clone, Deserialize)]
pub struct PublicKeyCredentialDescriptor {
    /// The type of credential
    #[serde(rename = "type")]
    pub type_: String,
    /// The credential id.
    pub id: Base64UrlSafeData,
    /// The allowed transports for this credential. Note this is a hint, and
    /// is NOT enforced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

impl PublicKeyCredentialDescriptor {
    /// Create a descriptor from a credential id and its transports.
    pub fn new(id: CredentialID, transports: Option<Vec<AuthenticatorTransport>>) -> Self {
        PublicKeyCredentialDescriptor {
            type_: "public-key".to_string(),
            id,
            transports,
        }
    }
}

/// The authenticator attachment hint. This is NOT enforced, and is only used
/// to help a user select a relevant authenticator type.
///
/// <https://www.w3.org/TR/webauthn/#attachment>
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthenticatorAttachment {
    /// Request a device that is part of the machine aka inseperable.
    #[serde(rename = "platform")]
    Platform,
    /// Request a device that can be seperated from the machine aka an
    /// external token.
    #[serde(rename = "cross-platform")]
    CrossPlatform,
}

/// A caller-facing hint about the kind of authenticator a registration is
/// intended for. Maps onto [AuthenticatorAttachment] when building options.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PreferredAuthenticatorType {
    /// A roaming key, i.e. a yubikey: cross-platform attachment.
    SecurityKey,
    /// The platform authenticator of the device in use: platform attachment.
    LocalDevice,
    /// Another device entirely (phone via hybrid transport): no attachment
    /// preference is sent.
    RemoteDevice,
}

impl PreferredAuthenticatorType {
    /// The attachment this preference maps to, if any.
    pub fn attachment(&self) -> Option<AuthenticatorAttachment> {
        match self {
            PreferredAuthenticatorType::SecurityKey => Some(AuthenticatorAttachment::CrossPlatform),
            PreferredAuthenticatorType::LocalDevice => Some(AuthenticatorAttachment::Platform),
            PreferredAuthenticatorType::RemoteDevice => None,
        }
    }
}

/// <https://www.w3.org/TR/webauthn/#dictdef-authenticatorselectioncriteria>
#[derive(Debug, Serialize, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteria {
    /// How the authenticator should be attached to the client machine.
    /// Note this is only a hint. It is not enforced in anyway shape or form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,

    /// The residency preference for the created credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<ResidentKeyRequirement>,

    /// Legacy form of `resident_key` consumed by older clients. True when
    /// `resident_key` is `required`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,

    /// The user verification level to request during the ceremony.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationPolicy>,
}

/// A descriptor of a credential that can be used.
#[derive(Debug, Serialize, Clone, Deserialize)]
pub struct AllowCredentials {
    #[serde(rename = "type")]
    /// The type of credential.
    pub type_: String,
    /// The id of the credential.
    pub id: Base64UrlSafeData,
    /// <https://www.w3.org/TR/webauthn/#transport>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

/// The data collected and hashed in the operation.
/// <https://www.w3.org/TR/webauthn-2/#dictdef-collectedclientdata>
///
/// The origin is deliberately kept as the raw string the client sent.
/// Origin matching is an exact, case sensitive string comparison - parsing
/// into a URL type would normalise the host and mask a mismatch.
#[derive(Debug, Serialize, Clone, Deserialize)]
pub struct CollectedClientData {
    /// The ceremony type: `webauthn.create` or `webauthn.get`.
    #[serde(rename = "type")]
    pub type_: String,
    /// The challenge.
    pub challenge: Base64UrlSafeData,
    /// The rp origin as the browser understood it.
    pub origin: String,
    /// The inverse of the sameOriginWithAncestors argument value that was
    /// passed into the internal method.
    #[serde(rename = "crossOrigin", skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<bool>,
    /// tokenBinding.
    #[serde(rename = "tokenBinding", skip_serializing_if = "Option::is_none")]
    pub token_binding: Option<TokenBinding>,
    /// This struct may be extended, so it's important to be tolerant of
    /// unknown keys.
    #[serde(flatten)]
    pub unknown_keys: BTreeMap<String, serde_json::Value>,
}

/// Token binding
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenBinding {
    /// status
    pub status: String,
    /// id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}
