//! Types related to authentication (Assertion)

use serde::{Deserialize, Serialize};

use crate::base64_data::Base64UrlSafeData;
use crate::options::*;

/// The requested options for the authentication
/// <https://w3c.github.io/webauthn/#dictionary-assertion-options>
#[derive(Debug, Serialize, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    /// The challenge that should be signed by the authenticator.
    pub challenge: Base64UrlSafeData,
    /// The timeout for the authenticator in case of no interaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    /// The relying party ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    /// The set of credentials that are allowed to sign this challenge.
    ///
    /// Omitted entirely when empty - this is what enables discoverable
    /// credential (resident key) flows on the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<AllowCredentials>>,
    /// The verification policy the browser will request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationPolicy>,
    /// extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

/// <https://w3c.github.io/webauthn/#authenticatorassertionresponse>
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthenticatorAssertionResponseRaw {
    /// Raw authenticator data.
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: Base64UrlSafeData,

    /// Signed client data.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlSafeData,

    /// Signature
    pub signature: Base64UrlSafeData,

    /// Optional userhandle.
    #[serde(
        rename = "userHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_handle: Option<Base64UrlSafeData>,
}

/// A client response to an authentication challenge. This contains all
/// required information to assess and assert trust in a credential's
/// legitimacy, followed by authentication to a user.
///
/// You should not need to handle the inner content of this structure - you
/// should provide this to the correctly handling function of Webauthn only.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PublicKeyCredential {
    /// The credential Id, likely base64
    pub id: String,
    /// The binary of the credential id.
    #[serde(rename = "rawId")]
    pub raw_id: Base64UrlSafeData,
    /// The authenticator response.
    pub response: AuthenticatorAssertionResponseRaw,
    /// The attachment of the authenticator in use, if the client reported it.
    #[serde(
        rename = "authenticatorAttachment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    /// Unsigned client processed extensions.
    #[serde(rename = "clientExtensionResults", default)]
    pub client_extension_results: serde_json::Map<String, serde_json::Value>,
    /// The authenticator type.
    #[serde(rename = "type")]
    pub type_: String,
}

impl PublicKeyCredential {
    /// Retrieve the user unique id that *may* have been provided by the
    /// authenticator during this authentication. Present in discoverable
    /// credential flows.
    pub fn get_user_unique_id(&self) -> Option<&[u8]> {
        self.response.user_handle.as_ref().map(|b| b.as_ref())
    }

    /// Retrieve the credential id that was provided in this authentication
    pub fn get_credential_id(&self) -> &[u8] {
        self.raw_id.0.as_slice()
    }
}
