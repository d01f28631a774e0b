//! The ceremony engine: building `create()`/`get()` options and verifying
//! the responses a client returns, per the W3C Webauthn verification
//! procedures.
//!
//! <https://w3c.github.io/webauthn/#sctn-registering-a-new-credential>
//! <https://w3c.github.io/webauthn/#sctn-verifying-assertion>

use rand::prelude::*;
use std::convert::TryFrom;

use crate::attestation::AttestationFormat;
use crate::constants::*;
use crate::crypto::{compute_sha256, ct_equal};
use crate::error::{WebauthnError, WebauthnResult};
use crate::interface::*;
use crate::internals::AttestationObject;
use crate::internals::AuthenticatorData;
use crate::proto::*;

/// The immutable relying party configuration the ceremony engine runs
/// against. Normally constructed and validated by the `passlock` builder.
#[derive(Debug, Clone)]
pub struct RelyingPartyConfig {
    /// The human readable relying party name, shown by clients in their
    /// ceremony UI.
    pub rp_name: String,
    /// The relying party id - a domain label credentials are scoped to,
    /// e.g. `example.com`.
    pub rp_id: String,
    /// The set of origins a client may legitimately perform ceremonies on.
    /// Web origins are scheme+host+optional port; mobile origins are
    /// scheme-prefixed bundle identifiers. Matching is exact and case
    /// sensitive.
    pub origins: Vec<String>,
    /// The signature algorithms offered to clients, in preference order.
    pub supported_algorithms: Vec<COSEAlgorithm>,
    /// The attestation conveyance requested at registration.
    pub attestation_preference: AttestationConveyancePreference,
    /// The user verification policy applied to ceremonies.
    pub user_verification_policy: UserVerificationPolicy,
    /// Optional authenticator selection hints layered into registration
    /// options.
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,
    /// The challenge length in bytes. Must lie in [16, 64].
    pub challenge_size_bytes: usize,
    /// The client-side ceremony timeout in milliseconds. Must be at least
    /// 10 000.
    pub operation_timeout_ms: u32,
}

impl RelyingPartyConfig {
    /// A configuration with this library's defaults for everything but the
    /// identity fields.
    pub fn new(rp_name: &str, rp_id: &str, origins: Vec<String>) -> Self {
        RelyingPartyConfig {
            rp_name: rp_name.to_string(),
            rp_id: rp_id.to_string(),
            origins,
            supported_algorithms: COSEAlgorithm::secure_algs(),
            attestation_preference: AttestationConveyancePreference::None,
            user_verification_policy: UserVerificationPolicy::Preferred,
            authenticator_selection: None,
            challenge_size_bytes: CHALLENGE_SIZE_BYTES,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
        }
    }

    /// Check the configuration bounds. The `passlock` builder calls this on
    /// build, together with its origin/rp-id relationship checks.
    pub fn validate(&self) -> WebauthnResult<()> {
        if self.rp_id.is_empty() {
            return Err(WebauthnError::Configuration("rp_id must not be empty"));
        }
        if self.rp_name.is_empty() {
            return Err(WebauthnError::Configuration("rp_name must not be empty"));
        }
        if self.origins.is_empty() {
            return Err(WebauthnError::Configuration(
                "at least one origin is required",
            ));
        }
        if self.supported_algorithms.is_empty() {
            return Err(WebauthnError::Configuration(
                "at least one signature algorithm is required",
            ));
        }
        if self.challenge_size_bytes < CHALLENGE_SIZE_BYTES_MIN
            || self.challenge_size_bytes > CHALLENGE_SIZE_BYTES_MAX
        {
            return Err(WebauthnError::Configuration(
                "challenge_size_bytes must lie in [16, 64]",
            ));
        }
        if self.operation_timeout_ms < MIN_OPERATION_TIMEOUT_MS {
            return Err(WebauthnError::Configuration(
                "operation_timeout_ms must be at least 10000",
            ));
        }
        Ok(())
    }
}

/// Per-call adjustments to registration options.
#[derive(Debug, Default, Clone)]
pub struct RegistrationOverrides {
    /// Credentials the client must refuse to re-register.
    pub exclude_credentials: Option<Vec<PublicKeyCredentialDescriptor>>,
    /// Selection hints layered over the configured ones.
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,
    /// A coarse hint for the kind of authenticator the caller expects.
    /// Takes precedence over any attachment in `authenticator_selection`.
    pub preferred_authenticator_type: Option<PreferredAuthenticatorType>,
    /// Extensions passed through to the client untouched.
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
    /// Ceremony timeout override, milliseconds.
    pub timeout: Option<u32>,
    /// Attestation conveyance override.
    pub attestation: Option<AttestationConveyancePreference>,
}

/// Per-call adjustments to authentication options.
#[derive(Debug, Default, Clone)]
pub struct AuthenticationOverrides {
    /// User verification policy override.
    pub user_verification: Option<UserVerificationPolicy>,
    /// Relying party id override.
    pub rp_id: Option<String>,
    /// Extensions passed through to the client untouched.
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
    /// Ceremony timeout override, milliseconds.
    pub timeout: Option<u32>,
}

/// This is the core of the Webauthn operations. It provides the four
/// interfaces you will use the most:
///
/// * [WebauthnCore::generate_challenge_register]
/// * [WebauthnCore::register_credential]
/// * [WebauthnCore::generate_challenge_authenticate]
/// * [WebauthnCore::authenticate_credential]
///
/// The generate functions return option structures intended to be processed
/// by the client, together with state that you must persist and supply back
/// to the corresponding verification call.
#[derive(Debug, Clone)]
pub struct WebauthnCore {
    config: RelyingPartyConfig,
}

impl WebauthnCore {
    /// Construct the ceremony engine from a configuration.
    ///
    /// # Safety
    ///
    /// This function is not memory-unsafe. It is marked `unsafe` because it
    /// performs no validation of the configuration, and a mistaken rp_id or
    /// origin silently breaks the security of every ceremony. Use the
    /// `passlock` builder instead, which validates before constructing.
    pub unsafe fn new(config: RelyingPartyConfig) -> Self {
        WebauthnCore { config }
    }

    /// The configuration in effect.
    pub fn config(&self) -> &RelyingPartyConfig {
        &self.config
    }

    fn generate_challenge(&self) -> Base64UrlSafeData {
        let mut chal = vec![0u8; self.config.challenge_size_bytes];
        rand::thread_rng().fill_bytes(&mut chal);
        chal.into()
    }

    /// Mint a fresh random Webauthn user handle. The handle deliberately
    /// contains no identifying information.
    pub fn generate_webauthn_user_id() -> Base64UrlSafeData {
        let mut id = vec![0u8; WEBAUTHN_USER_ID_SIZE_BYTES];
        rand::thread_rng().fill_bytes(&mut id);
        id.into()
    }

    fn resolve_authenticator_selection(
        &self,
        overrides: &RegistrationOverrides,
    ) -> AuthenticatorSelectionCriteria {
        // Layering: library default <- configured hints <- per-call hints.
        let mut sel = AuthenticatorSelectionCriteria {
            authenticator_attachment: None,
            resident_key: Some(ResidentKeyRequirement::Preferred),
            require_resident_key: None,
            user_verification: Some(self.config.user_verification_policy),
        };

        let layers = [
            self.config.authenticator_selection.as_ref(),
            overrides.authenticator_selection.as_ref(),
        ];
        for layer in layers.into_iter().flatten() {
            if layer.authenticator_attachment.is_some() {
                sel.authenticator_attachment = layer.authenticator_attachment;
            }
            if layer.resident_key.is_some() {
                sel.resident_key = layer.resident_key;
            }
            if layer.user_verification.is_some() {
                sel.user_verification = layer.user_verification;
            }
        }

        if let Some(preferred) = overrides.preferred_authenticator_type {
            sel.authenticator_attachment = preferred.attachment();
        }

        sel.require_resident_key = Some(matches!(
            sel.resident_key,
            Some(ResidentKeyRequirement::Required)
        ));

        sel
    }

    /// Generate a new challenge and options for client registration. This is
    /// the first step in the lifecycle of a credential.
    ///
    /// The returned [PublicKeyCredentialCreationOptions] is suitable for
    /// serde JSON serialisation to be sent to the client, which passes it to
    /// `navigator.credentials.create()`.
    ///
    /// It also returns a [RegistrationState] that you *must* persist for the
    /// verification step. It is strongly advised you associate it with the
    /// requesting user's id.
    pub fn generate_challenge_register(
        &self,
        username: &str,
        display_name: Option<&str>,
        overrides: &RegistrationOverrides,
    ) -> WebauthnResult<(PublicKeyCredentialCreationOptions, RegistrationState)> {
        if username.is_empty() {
            return Err(WebauthnError::Configuration("username must not be empty"));
        }

        let challenge = self.generate_challenge();
        let webauthn_user_id = Self::generate_webauthn_user_id();

        let selection = self.resolve_authenticator_selection(overrides);
        let require_user_verification = matches!(
            selection.user_verification,
            Some(UserVerificationPolicy::Required)
        );

        let exclude_ids: Vec<CredentialID> = overrides
            .exclude_credentials
            .as_ref()
            .map(|creds| creds.iter().map(|d| d.id.clone()).collect())
            .unwrap_or_default();

        let options = PublicKeyCredentialCreationOptions {
            challenge: challenge.clone(),
            rp: RelyingParty {
                id: self.config.rp_id.clone(),
                name: self.config.rp_name.clone(),
                icon: None,
            },
            user: UserEntity {
                id: webauthn_user_id.clone(),
                name: username.to_string(),
                display_name: display_name.unwrap_or(username).to_string(),
            },
            pub_key_cred_params: self
                .config
                .supported_algorithms
                .iter()
                .map(|alg| PubKeyCredParams {
                    type_: "public-key".to_string(),
                    alg: alg.into(),
                })
                .collect(),
            timeout: Some(overrides.timeout.unwrap_or(self.config.operation_timeout_ms)),
            exclude_credentials: overrides.exclude_credentials.clone(),
            authenticator_selection: Some(selection),
            attestation: Some(
                overrides
                    .attestation
                    .unwrap_or(self.config.attestation_preference),
            ),
            extensions: overrides.extensions.clone(),
        };

        let state = RegistrationState {
            challenge,
            webauthn_user_id,
            require_user_verification,
            exclude_credentials: exclude_ids,
        };

        Ok((options, state))
    }

    /// Process a credential registration response: the output of
    /// `navigator.credentials.create()` which the client posts back.
    ///
    /// Alongside the response, you must supply the [RegistrationState] from
    /// options generation.
    ///
    /// On success this returns the verified credential material, which you
    /// must persist and associate with the user.
    pub fn register_credential(
        &self,
        reg: &RegisterPublicKeyCredential,
        state: &RegistrationState,
    ) -> WebauthnResult<VerifiedRegistrationInfo> {
        self.register_credential_internal(
            reg,
            state.challenge.as_ref(),
            &self.config.origins,
            std::slice::from_ref(&self.config.rp_id),
            state.require_user_verification,
            &state.exclude_credentials,
        )
    }

    /// The registration verification procedure with every ceremony input
    /// explicit. Exposed for callers that manage expected origins or rp ids
    /// per call (e.g. multi-tenant deployments).
    pub fn register_credential_internal(
        &self,
        reg: &RegisterPublicKeyCredential,
        expected_challenge: &[u8],
        expected_origins: &[String],
        expected_rp_ids: &[String],
        require_user_verification: bool,
        exclude_credentials: &[CredentialID],
    ) -> WebauthnResult<VerifiedRegistrationInfo> {
        // Let C, the client data claimed as collected during the credential
        // creation, be the result of running an implementation-specific JSON
        // parser on the UTF-8 decode of response.clientDataJSON.
        let client_data_bytes = reg.response.client_data_json.as_ref();
        let client_data: CollectedClientData = serde_json::from_slice(client_data_bytes)?;

        // Verify that the value of C.type is webauthn.create.
        if client_data.type_ != "webauthn.create" {
            return Err(WebauthnError::InvalidClientDataType);
        }

        // Verify that the value of C.challenge matches the challenge that
        // was sent to the authenticator in the create() call.
        if client_data.challenge.as_ref() != expected_challenge {
            return Err(WebauthnError::MismatchedChallenge);
        }

        // Verify that the value of C.origin is an origin we expected. The
        // comparison is exact - origins differing only in case are distinct.
        if !expected_origins.iter().any(|o| o == &client_data.origin) {
            debug!(origin = %client_data.origin, "origin not in the expected set");
            return Err(WebauthnError::InvalidRPOrigin);
        }

        // Perform CBOR decoding on the attestationObject field to obtain the
        // attestation statement format fmt, the authenticator data authData,
        // and the attestation statement attStmt.
        let attestation_object =
            AttestationObject::try_from(reg.response.attestation_object.as_ref())?;
        let auth_data = &attestation_object.auth_data;

        // Verify that the rpIdHash in authData is the SHA-256 hash of an
        // RP ID expected by the Relying Party.
        let rp_id = self.match_rp_id_hash(expected_rp_ids, &auth_data.rp_id_hash)?;

        // Verify the User Present bit, and if verification is required for
        // this registration, the User Verified bit.
        auth_data.verify_flags(true, require_user_verification)?;

        // Determine the attestation statement format. This library verifies
        // no statement: `none` needs nothing, and every other format is
        // carried opaquely. The credential is trusted on first use.
        if AttestationFormat::try_from(attestation_object.fmt.as_str()).is_err() {
            debug!(fmt = %attestation_object.fmt, "unrecognised attestation format, accepted unvalidated");
        }

        // The attested credential data, and within it the credential id and
        // public key, must be present for a registration.
        let acd = auth_data
            .acd
            .as_ref()
            .ok_or(WebauthnError::MissingAttestedCredentialData)?;
        if acd.credential_id.is_empty() {
            return Err(WebauthnError::MissingAttestedCredentialData);
        }

        // Parse the credential public key - this validates the key shape
        // and pins the signature algorithm.
        let cose_key = COSEKey::try_from(&acd.credential_pk)?;

        // Verify that the key's algorithm is one of the algorithms we
        // offered in pubKeyCredParams. A mismatch means the response was
        // altered in flight.
        if !self
            .config
            .supported_algorithms
            .iter()
            .any(|alg| *alg == cose_key.type_)
        {
            return Err(WebauthnError::CredentialAlteredAlgFromRequest);
        }

        // Refuse any credential that this ceremony asked the client to
        // exclude.
        if exclude_credentials
            .iter()
            .any(|id| id.as_ref() == acd.credential_id.as_ref())
        {
            return Err(WebauthnError::CredentialAlreadyExists);
        }

        let aaguid = if acd.aaguid == [0u8; 16] {
            None
        } else {
            Some(acd.aaguid.into())
        };

        Ok(VerifiedRegistrationInfo {
            credential_id: acd.credential_id.clone(),
            public_key_cose: acd.credential_pk_bytes.as_slice().into(),
            algorithm: cose_key.type_,
            counter: auth_data.counter,
            transports: reg.response.transports.clone().unwrap_or_default(),
            device_type: if auth_data.backup_eligible {
                CredentialDeviceType::MultiDevice
            } else {
                CredentialDeviceType::SingleDevice
            },
            backed_up: auth_data.backup_state,
            origin: client_data.origin,
            rp_id,
            user_verified: auth_data.user_verified,
            aaguid,
            attestation_format: attestation_object.fmt,
        })
    }

    /// Generate a challenge and options for an authentication ceremony.
    ///
    /// Supply the credential descriptors the user may authenticate with.
    /// An empty set omits `allowCredentials` from the options entirely,
    /// which enables discoverable credential flows.
    pub fn generate_challenge_authenticate(
        &self,
        allow_credentials: Vec<AllowCredentials>,
        overrides: &AuthenticationOverrides,
    ) -> WebauthnResult<(PublicKeyCredentialRequestOptions, AuthenticationState)> {
        let challenge = self.generate_challenge();

        let policy = overrides
            .user_verification
            .unwrap_or(self.config.user_verification_policy);
        let rp_id = overrides
            .rp_id
            .clone()
            .unwrap_or_else(|| self.config.rp_id.clone());

        let allow_ids: Vec<CredentialID> =
            allow_credentials.iter().map(|c| c.id.clone()).collect();

        let options = PublicKeyCredentialRequestOptions {
            challenge: challenge.clone(),
            timeout: Some(overrides.timeout.unwrap_or(self.config.operation_timeout_ms)),
            rp_id: Some(rp_id.clone()),
            allow_credentials: if allow_credentials.is_empty() {
                None
            } else {
                Some(allow_credentials)
            },
            user_verification: Some(policy),
            extensions: overrides.extensions.clone(),
        };

        let state = AuthenticationState {
            challenge,
            require_user_verification: matches!(policy, UserVerificationPolicy::Required),
            rp_ids: vec![rp_id],
            allow_credentials: allow_ids,
        };

        Ok((options, state))
    }

    /// Process an authentication response from the client: the output of
    /// `navigator.credentials.get()`.
    ///
    /// Supply the [AuthenticationState] from options generation and the
    /// stored credential the response asserts.
    ///
    /// On success, persist `new_counter` (and your last-used stamp) against
    /// the credential.
    pub fn authenticate_credential(
        &self,
        rsp: &PublicKeyCredential,
        state: &AuthenticationState,
        cred: &PasskeyCredential,
    ) -> WebauthnResult<VerifiedAuthenticationInfo> {
        // If allowCredentials was given when this ceremony was initiated,
        // verify that credential.id identifies one of the listed
        // credentials.
        if !state.allow_credentials.is_empty()
            && !state
                .allow_credentials
                .iter()
                .any(|id| id.as_ref() == rsp.raw_id.as_ref())
        {
            return Err(WebauthnError::CredentialNotFound);
        }

        self.verify_credential_internal(
            rsp,
            state.challenge.as_ref(),
            &self.config.origins,
            &state.rp_ids,
            state.require_user_verification,
            cred,
        )
    }

    /// The assertion verification procedure with every ceremony input
    /// explicit.
    pub fn verify_credential_internal(
        &self,
        rsp: &PublicKeyCredential,
        expected_challenge: &[u8],
        expected_origins: &[String],
        expected_rp_ids: &[String],
        require_user_verification: bool,
        cred: &PasskeyCredential,
    ) -> WebauthnResult<VerifiedAuthenticationInfo> {
        // The asserted id must identify the stored credential.
        if rsp.raw_id.as_ref() != cred.credential_id.as_ref() {
            return Err(WebauthnError::CredentialIDMismatch);
        }

        // Let C be the parsed client data.
        let client_data_bytes = rsp.response.client_data_json.as_ref();
        let client_data: CollectedClientData = serde_json::from_slice(client_data_bytes)?;

        // Verify that the value of C.type is the string webauthn.get.
        if client_data.type_ != "webauthn.get" {
            return Err(WebauthnError::InvalidClientDataType);
        }

        // Verify that the value of C.challenge matches the challenge that
        // was sent in the options passed to the get() call.
        if client_data.challenge.as_ref() != expected_challenge {
            return Err(WebauthnError::MismatchedChallenge);
        }

        // Verify that the value of C.origin is an origin we expected.
        if !expected_origins.iter().any(|o| o == &client_data.origin) {
            debug!(origin = %client_data.origin, "origin not in the expected set");
            return Err(WebauthnError::InvalidRPOrigin);
        }

        // Parse the authenticator data. No attested credential data is
        // expected here; if an authenticator includes it anyway it is
        // ignored.
        let auth_data_bytes = rsp.response.authenticator_data.as_ref();
        let auth_data = AuthenticatorData::try_from(auth_data_bytes)?;

        // Verify that the rpIdHash in authData is the SHA-256 hash of an
        // RP ID expected by the Relying Party.
        let rp_id = self.match_rp_id_hash(expected_rp_ids, &auth_data.rp_id_hash)?;

        // Verify the User Present bit, and if verification is required for
        // this assertion, the User Verified bit.
        auth_data.verify_flags(true, require_user_verification)?;

        // The signature counter must strictly increase, except that a pair
        // of zeros means the authenticator does not track a counter at all.
        // A stalled or regressed counter is a signal that the credential
        // private key may exist in more than one place.
        let new_counter = auth_data.counter;
        let old_counter = cred.counter;
        if !(new_counter == 0 && old_counter == 0) && new_counter <= old_counter {
            warn!(
                credential_id = %cred.credential_id,
                new_counter, old_counter, "counter regression, possible cloned authenticator"
            );
            return Err(WebauthnError::CredentialPossibleCompromise);
        }

        // Parse the stored credential public key.
        let cose_key = COSEKey::try_from(cred.public_key_cose.as_ref())?;

        // Let hash be the SHA-256 of cData. Using the credential public key,
        // verify that sig is a valid signature over the binary concatenation
        // of authData and hash.
        let client_data_hash = compute_sha256(client_data_bytes);
        let mut verification_data =
            Vec::with_capacity(auth_data_bytes.len() + client_data_hash.len());
        verification_data.extend_from_slice(auth_data_bytes);
        verification_data.extend_from_slice(&client_data_hash);

        let verified = cose_key.verify_signature(rsp.response.signature.as_ref(), &verification_data)?;
        if !verified {
            return Err(WebauthnError::AuthenticationFailure);
        }

        Ok(VerifiedAuthenticationInfo {
            credential_id: cred.credential_id.clone(),
            new_counter,
            origin: client_data.origin,
            rp_id,
            user_verified: auth_data.user_verified,
            backup_state: auth_data.backup_state,
        })
    }

    /// Find the expected rp id whose SHA-256 matches `rp_id_hash`. The hash
    /// comparison is constant time.
    fn match_rp_id_hash(
        &self,
        expected_rp_ids: &[String],
        rp_id_hash: &[u8],
    ) -> WebauthnResult<String> {
        expected_rp_ids
            .iter()
            .find(|rp_id| ct_equal(&compute_sha256(rp_id.as_bytes()), rp_id_hash))
            .cloned()
            .ok_or(WebauthnError::InvalidRPIDHash)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;
    use crate::internals::{
        FLAG_ATTESTED_CRED_DATA, FLAG_BACKUP_ELIGIBLE, FLAG_BACKUP_STATE, FLAG_USER_PRESENT,
        FLAG_USER_VERIFIED,
    };
    use openssl::{bn, ec, hash::MessageDigest, nid, pkey, sign};
    use serde_cbor_2::Value;
    use std::collections::BTreeMap;
    use std::convert::TryFrom;

    fn core(rp_name: &str, origin: &str, rp_id: &str) -> WebauthnCore {
        let mut config = RelyingPartyConfig::new(rp_name, rp_id, vec![origin.to_string()]);
        // The captured vectors predate everything but ES256.
        config.supported_algorithms = COSEAlgorithm::all_possible_algs();
        unsafe { WebauthnCore::new(config) }
    }

    fn registration_state(challenge: Vec<u8>, require_uv: bool) -> RegistrationState {
        RegistrationState {
            challenge: challenge.into(),
            webauthn_user_id: WebauthnCore::generate_webauthn_user_id(),
            require_user_verification: require_uv,
            exclude_credentials: vec![],
        }
    }

    fn authentication_state(
        challenge: Vec<u8>,
        rp_id: &str,
        require_uv: bool,
    ) -> AuthenticationState {
        AuthenticationState {
            challenge: challenge.into(),
            require_user_verification: require_uv,
            rp_ids: vec![rp_id.to_string()],
            allow_credentials: vec![],
        }
    }

    fn stored_credential(credential_id: Vec<u8>, cose: Vec<u8>, counter: u32) -> PasskeyCredential {
        PasskeyCredential {
            credential_id: credential_id.into(),
            public_key_cose: cose.into(),
            counter,
            transports: vec![],
            device_type: CredentialDeviceType::SingleDevice,
            backed_up: false,
            user_id: "u1".to_string(),
            webauthn_user_id: WebauthnCore::generate_webauthn_user_id(),
            created_at: chrono::Utc::now(),
            last_used_at: None,
            aaguid: None,
        }
    }

    // Captured from a yubico 5 against a local test relying party.
    const YK5_REGISTRATION: &str = r#"
        {
            "id":"0xYE4bQ_HZM51-XYwp7WHJu8RfeA2Oz3_9HnNIZAKqRTz9gsUlF3QO7EqcJ0pgLSwDcq6cL1_aQpTtKLeGu6Ig",
            "rawId":"0xYE4bQ_HZM51-XYwp7WHJu8RfeA2Oz3_9HnNIZAKqRTz9gsUlF3QO7EqcJ0pgLSwDcq6cL1_aQpTtKLeGu6Ig",
            "response":{
                 "attestationObject":"o2NmbXRoZmlkby11MmZnYXR0U3RtdKJjc2lnWEcwRQIhALjRb43YFcbJ3V9WiYPpIrZkhgzAM6KTR8KIjwCXejBCAiAO5Lvp1VW4dYBhBDv7HZIrxZb1SwKKYOLfFRXykRxMqGN4NWOBWQLBMIICvTCCAaWgAwIBAgIEGKxGwDANBgkqhkiG9w0BAQsFADAuMSwwKgYDVQQDEyNZdWJpY28gVTJGIFJvb3QgQ0EgU2VyaWFsIDQ1NzIwMDYzMTAgFw0xNDA4MDEwMDAwMDBaGA8yMDUwMDkwNDAwMDAwMFowbjELMAkGA1UEBhMCU0UxEjAQBgNVBAoMCVl1YmljbyBBQjEiMCAGA1UECwwZQXV0aGVudGljYXRvciBBdHRlc3RhdGlvbjEnMCUGA1UEAwweWXViaWNvIFUyRiBFRSBTZXJpYWwgNDEzOTQzNDg4MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEeeo7LHxJcBBiIwzSP-tg5SkxcdSD8QC-hZ1rD4OXAwG1Rs3Ubs_K4-PzD4Hp7WK9Jo1MHr03s7y-kqjCrutOOqNsMGowIgYJKwYBBAGCxAoCBBUxLjMuNi4xLjQuMS40MTQ4Mi4xLjcwEwYLKwYBBAGC5RwCAQEEBAMCBSAwIQYLKwYBBAGC5RwBAQQEEgQQy2lIHo_3QDmT7AonKaFUqDAMBgNVHRMBAf8EAjAAMA0GCSqGSIb3DQEBCwUAA4IBAQCXnQOX2GD4LuFdMRx5brr7Ivqn4ITZurTGG7tX8-a0wYpIN7hcPE7b5IND9Nal2bHO2orh_tSRKSFzBY5e4cvda9rAdVfGoOjTaCW6FZ5_ta2M2vgEhoz5Do8fiuoXwBa1XCp61JfIlPtx11PXm5pIS2w3bXI7mY0uHUMGvxAzta74zKXLslaLaSQibSKjWKt9h-SsXy4JGqcVefOlaQlJfXL1Tga6wcO0QTu6Xq-Uw7ZPNPnrpBrLauKDd202RlN4SP7ohL3d9bG6V5hUz_3OusNEBZUn5W3VmPj1ZnFavkMB3RkRMOa58MZAORJT4imAPzrvJ0vtv94_y71C6tZ5aGF1dGhEYXRhWMQSyhe0mvIolDbzA-AWYDCiHlJdJm4gkmdDOAGo_UBxoEEAAAAAAAAAAAAAAAAAAAAAAAAAAABA0xYE4bQ_HZM51-XYwp7WHJu8RfeA2Oz3_9HnNIZAKqRTz9gsUlF3QO7EqcJ0pgLSwDcq6cL1_aQpTtKLeGu6IqUBAgMmIAEhWCCe1KvqpcVWN416_QZc8vJynt3uo3_WeJ2R4uj6kJbaiiJYIDC5ssxxummKviGgLoP9ZLFb836A9XfRO7op18QY3i5m",
                 "clientDataJSON":"eyJjaGFsbGVuZ2UiOiJBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBIiwiY2xpZW50RXh0ZW5zaW9ucyI6e30sImhhc2hBbGdvcml0aG0iOiJTSEEtMjU2Iiwib3JpZ2luIjoiaHR0cDovLzEyNy4wLjAuMTo4MDgwIiwidHlwZSI6IndlYmF1dGhuLmNyZWF0ZSJ9"
            },
            "type":"public-key"
        }
    "#;

    #[test]
    fn test_registration_yk5() {
        let wan = core(
            "http://127.0.0.1:8080/auth",
            "http://127.0.0.1:8080",
            "127.0.0.1",
        );

        // A fixed challenge whose value we know.
        let zero_chal = vec![0u8; 32];

        let rsp_d: RegisterPublicKeyCredential = serde_json::from_str(YK5_REGISTRATION).unwrap();

        let state = registration_state(zero_chal, false);
        let result = wan.register_credential(&rsp_d, &state).unwrap();

        assert_eq!(result.rp_id, "127.0.0.1");
        assert_eq!(result.origin, "http://127.0.0.1:8080");
        assert_eq!(result.attestation_format, "fido-u2f");
        assert_eq!(result.algorithm, COSEAlgorithm::ES256);
        assert_eq!(result.device_type, CredentialDeviceType::SingleDevice);
        assert!(!result.backed_up);
        assert_eq!(result.counter, 0);
        // The returned credential id decodes to the byte string embedded in
        // the attested credential data.
        assert_eq!(result.credential_id.len(), 64);
        assert_eq!(result.credential_id, rsp_d.raw_id);
        // The returned COSE bytes parse to a well formed key of the declared
        // algorithm.
        let key = COSEKey::try_from(result.public_key_cose.as_ref()).unwrap();
        assert_eq!(key.type_, COSEAlgorithm::ES256);
    }

    // These are vectors from https://github.com/duo-labs/webauthn
    #[test]
    fn test_registration_duo_go() {
        let wan = core("webauthn.io", "https://webauthn.io", "webauthn.io");

        let chal: Base64UrlSafeData =
            Base64UrlSafeData::try_from("+Ri5NZTzJ8b6mvW3TVScLotEoALfgBa2Bn4YSaIObHc").unwrap();

        let rsp = r#"
        {
                "id": "FOxcmsqPLNCHtyILvbNkrtHMdKAeqSJXYZDbeFd0kc5Enm8Kl6a0Jp0szgLilDw1S4CjZhe9Z2611EUGbjyEmg",
                "rawId": "FOxcmsqPLNCHtyILvbNkrtHMdKAeqSJXYZDbeFd0kc5Enm8Kl6a0Jp0szgLilDw1S4CjZhe9Z2611EUGbjyEmg",
                "response": {
                        "attestationObject": "o2NmbXRoZmlkby11MmZnYXR0U3RtdKJjc2lnWEYwRAIgfyIhwZj-fkEVyT1GOK8chDHJR2chXBLSRg6bTCjODmwCIHH6GXI_BQrcR-GHg5JfazKVQdezp6_QWIFfT4ltTCO2Y3g1Y4FZAlMwggJPMIIBN6ADAgECAgQSNtF_MA0GCSqGSIb3DQEBCwUAMC4xLDAqBgNVBAMTI1l1YmljbyBVMkYgUm9vdCBDQSBTZXJpYWwgNDU3MjAwNjMxMCAXDTE0MDgwMTAwMDAwMFoYDzIwNTAwOTA0MDAwMDAwWjAxMS8wLQYDVQQDDCZZdWJpY28gVTJGIEVFIFNlcmlhbCAyMzkyNTczNDEwMzI0MTA4NzBZMBMGByqGSM49AgEGCCqGSM49AwEHA0IABNNlqR5emeDVtDnA2a-7h_QFjkfdErFE7bFNKzP401wVE-QNefD5maviNnGVk4HJ3CsHhYuCrGNHYgTM9zTWriGjOzA5MCIGCSsGAQQBgsQKAgQVMS4zLjYuMS40LjEuNDE0ODIuMS41MBMGCysGAQQBguUcAgEBBAQDAgUgMA0GCSqGSIb3DQEBCwUAA4IBAQAiG5uzsnIk8T6-oyLwNR6vRklmo29yaYV8jiP55QW1UnXdTkEiPn8mEQkUac-Sn6UmPmzHdoGySG2q9B-xz6voVQjxP2dQ9sgbKd5gG15yCLv6ZHblZKkdfWSrUkrQTrtaziGLFSbxcfh83vUjmOhDLFC5vxV4GXq2674yq9F2kzg4nCS4yXrO4_G8YWR2yvQvE2ffKSjQJlXGO5080Ktptplv5XN4i5lS-AKrT5QRVbEJ3B4g7G0lQhdYV-6r4ZtHil8mF4YNMZ0-RaYPxAaYNWkFYdzOZCaIdQbXRZefgGfbMUiAC2gwWN7fiPHV9eu82NYypGU32OijG9BjhGt_aGF1dGhEYXRhWMR0puqSE8mcL3SyJJKzIM9AJiqUwalQoDl_KSULYIQe8EEAAAAAAAAAAAAAAAAAAAAAAAAAAABAFOxcmsqPLNCHtyILvbNkrtHMdKAeqSJXYZDbeFd0kc5Enm8Kl6a0Jp0szgLilDw1S4CjZhe9Z2611EUGbjyEmqUBAgMmIAEhWCD_ap3Q9zU8OsGe967t48vyRxqn8NfFTk307mC1WsH2ISJYIIcqAuW3MxhU0uDtaSX8-Ftf_zeNJLdCOEjZJGHsrLxH",
                        "clientDataJSON": "eyJjaGFsbGVuZ2UiOiItUmk1TlpUeko4YjZtdlczVFZTY0xvdEVvQUxmZ0JhMkJuNFlTYUlPYkhjIiwib3JpZ2luIjoiaHR0cHM6Ly93ZWJhdXRobi5pbyIsInR5cGUiOiJ3ZWJhdXRobi5jcmVhdGUifQ"
                },
                "type": "public-key"
        }
        "#;
        let rsp_d: RegisterPublicKeyCredential = serde_json::from_str(rsp).unwrap();
        let state = registration_state(chal.into(), false);
        let result = wan.register_credential(&rsp_d, &state);
        assert!(result.is_ok());
    }

    #[test]
    fn test_registration_origin_mismatch() {
        // Same response, but this relying party expects a different origin.
        let wan = core(
            "attacker.example.com",
            "https://attacker.example.com",
            "127.0.0.1",
        );
        let rsp_d: RegisterPublicKeyCredential = serde_json::from_str(YK5_REGISTRATION).unwrap();
        let state = registration_state(vec![0u8; 32], false);
        let result = wan.register_credential(&rsp_d, &state);
        assert!(matches!(result, Err(WebauthnError::InvalidRPOrigin)));
    }

    #[test]
    fn test_registration_origin_case_sensitive() {
        let wan = core(
            "http://127.0.0.1:8080/auth",
            "HTTP://127.0.0.1:8080",
            "127.0.0.1",
        );
        let rsp_d: RegisterPublicKeyCredential = serde_json::from_str(YK5_REGISTRATION).unwrap();
        let state = registration_state(vec![0u8; 32], false);
        let result = wan.register_credential(&rsp_d, &state);
        assert!(matches!(result, Err(WebauthnError::InvalidRPOrigin)));
    }

    #[test]
    fn test_registration_challenge_mismatch() {
        let wan = core(
            "http://127.0.0.1:8080/auth",
            "http://127.0.0.1:8080",
            "127.0.0.1",
        );
        let rsp_d: RegisterPublicKeyCredential = serde_json::from_str(YK5_REGISTRATION).unwrap();

        // One bit different from the challenge the client signed over.
        let mut chal = vec![0u8; 32];
        chal[31] = 0x01;
        let state = registration_state(chal, false);
        let result = wan.register_credential(&rsp_d, &state);
        assert!(matches!(result, Err(WebauthnError::MismatchedChallenge)));
    }

    #[test]
    fn test_registration_rp_id_mismatch() {
        let wan = core(
            "http://127.0.0.1:8080/auth",
            "http://127.0.0.1:8080",
            "localhost",
        );
        let rsp_d: RegisterPublicKeyCredential = serde_json::from_str(YK5_REGISTRATION).unwrap();
        let state = registration_state(vec![0u8; 32], false);
        let result = wan.register_credential(&rsp_d, &state);
        assert!(matches!(result, Err(WebauthnError::InvalidRPIDHash)));
    }

    #[test]
    fn test_registration_uv_required_rejects_unverified() {
        let wan = core(
            "http://127.0.0.1:8080/auth",
            "http://127.0.0.1:8080",
            "127.0.0.1",
        );
        let rsp_d: RegisterPublicKeyCredential = serde_json::from_str(YK5_REGISTRATION).unwrap();
        let state = registration_state(vec![0u8; 32], true);
        let result = wan.register_credential(&rsp_d, &state);
        assert!(matches!(result, Err(WebauthnError::UserNotVerified)));
    }

    #[test]
    fn test_registration_excluded_credential() {
        let wan = core(
            "http://127.0.0.1:8080/auth",
            "http://127.0.0.1:8080",
            "127.0.0.1",
        );
        let rsp_d: RegisterPublicKeyCredential = serde_json::from_str(YK5_REGISTRATION).unwrap();
        let mut state = registration_state(vec![0u8; 32], false);
        state.exclude_credentials = vec![rsp_d.raw_id.clone()];
        let result = wan.register_credential(&rsp_d, &state);
        assert!(matches!(result, Err(WebauthnError::CredentialAlreadyExists)));
    }

    // The COSE public key matching the captured yubico 5 authentication
    // vector below.
    fn yk5_auth_cose() -> Vec<u8> {
        let x: [u8; 32] = [
            46, 121, 76, 233, 118, 208, 250, 74, 227, 182, 8, 145, 45, 46, 5, 9, 199, 186, 84, 83,
            7, 237, 130, 73, 16, 90, 17, 54, 33, 255, 54, 56,
        ];
        let y: [u8; 32] = [
            117, 105, 1, 23, 253, 223, 67, 135, 253, 219, 253, 223, 17, 247, 91, 197, 205, 225,
            143, 59, 47, 138, 70, 120, 74, 155, 177, 177, 166, 233, 48, 71,
        ];
        let mut m = BTreeMap::new();
        m.insert(Value::Integer(1), Value::Integer(2));
        m.insert(Value::Integer(3), Value::Integer(-7));
        m.insert(Value::Integer(-1), Value::Integer(1));
        m.insert(Value::Integer(-2), Value::Bytes(x.to_vec()));
        m.insert(Value::Integer(-3), Value::Bytes(y.to_vec()));
        serde_cbor_2::to_vec(&Value::Map(m)).unwrap()
    }

    const YK5_CRED_ID: [u8; 64] = [
        106, 223, 133, 124, 161, 172, 56, 141, 181, 18, 27, 66, 187, 181, 113, 251, 187, 123, 20,
        169, 41, 80, 236, 138, 92, 137, 4, 4, 16, 255, 188, 47, 158, 202, 111, 192, 117, 110, 152,
        245, 95, 22, 200, 172, 71, 154, 40, 181, 212, 64, 80, 17, 238, 238, 21, 13, 27, 145, 140,
        27, 208, 101, 166, 81,
    ];

    const YK5_AUTH_CHALLENGE: [u8; 32] = [
        90, 5, 243, 254, 68, 239, 221, 101, 20, 214, 76, 60, 134, 111, 142, 26, 129, 146, 225, 144,
        135, 95, 253, 219, 18, 161, 199, 216, 251, 213, 167, 195,
    ];

    const YK5_AUTHENTICATION: &str = r#"
        {"id":"at-FfKGsOI21EhtCu7Vx-7t7FKkpUOyKXIkEBBD_vC-eym_AdW6Y9V8WyKxHmii11EBQEe7uFQ0bkYwb0GWmUQ",
         "rawId":"at+FfKGsOI21EhtCu7Vx+7t7FKkpUOyKXIkEBBD/vC+eym/AdW6Y9V8WyKxHmii11EBQEe7uFQ0bkYwb0GWmUQ==",
         "response":{"authenticatorData":"SZYN5YgOjGh0NBcPZHZgW4/krrmihjLHmVzzuoMdl2MBAAAAFA==",
                     "clientDataJSON":"eyJjaGFsbGVuZ2UiOiJXZ1h6X2tUdjNXVVUxa3c4aG0tT0dvR1M0WkNIWF8zYkVxSEgyUHZWcDhNIiwiY2xpZW50RXh0ZW5zaW9ucyI6e30sImhhc2hBbGdvcml0aG0iOiJTSEEtMjU2Iiwib3JpZ2luIjoiaHR0cDovL2xvY2FsaG9zdDo4MDgwIiwidHlwZSI6IndlYmF1dGhuLmdldCJ9",
                     "signature":"MEYCIQDmLVOqv85cdRup4Fr8Pf9zC4AWO+XKBJqa8xPwYFCCMAIhAOiExLoyes0xipmUmq0BVlqJaCKLn/MFKG9GIDsCGq/+",
                     "userHandle":null},
         "type":"public-key"}
    "#;

    #[test]
    fn test_authentication_yk5() {
        let wan = core(
            "http://localhost:8080/auth",
            "http://localhost:8080",
            "localhost",
        );

        let cred = stored_credential(YK5_CRED_ID.to_vec(), yk5_auth_cose(), 0);
        let rsp_d: PublicKeyCredential = serde_json::from_str(YK5_AUTHENTICATION).unwrap();
        let state = authentication_state(YK5_AUTH_CHALLENGE.to_vec(), "localhost", false);

        let r = wan.authenticate_credential(&rsp_d, &state, &cred).unwrap();
        assert_eq!(r.new_counter, 20);
        assert_eq!(r.origin, "http://localhost:8080");
        assert_eq!(r.rp_id, "localhost");
        assert!(!r.user_verified);
    }

    #[test]
    fn test_authentication_counter_regression() {
        let wan = core(
            "http://localhost:8080/auth",
            "http://localhost:8080",
            "localhost",
        );
        let rsp_d: PublicKeyCredential = serde_json::from_str(YK5_AUTHENTICATION).unwrap();
        let state = authentication_state(YK5_AUTH_CHALLENGE.to_vec(), "localhost", false);

        // The assertion carries counter 20. Equal or greater stored values
        // must be rejected; lesser values accepted.
        let cred = stored_credential(YK5_CRED_ID.to_vec(), yk5_auth_cose(), 20);
        assert!(matches!(
            wan.authenticate_credential(&rsp_d, &state, &cred),
            Err(WebauthnError::CredentialPossibleCompromise)
        ));

        let cred = stored_credential(YK5_CRED_ID.to_vec(), yk5_auth_cose(), 21);
        assert!(matches!(
            wan.authenticate_credential(&rsp_d, &state, &cred),
            Err(WebauthnError::CredentialPossibleCompromise)
        ));

        let cred = stored_credential(YK5_CRED_ID.to_vec(), yk5_auth_cose(), 19);
        assert!(wan.authenticate_credential(&rsp_d, &state, &cred).is_ok());
    }

    #[test]
    fn test_authentication_credential_id_mismatch() {
        let wan = core(
            "http://localhost:8080/auth",
            "http://localhost:8080",
            "localhost",
        );
        let rsp_d: PublicKeyCredential = serde_json::from_str(YK5_AUTHENTICATION).unwrap();
        let state = authentication_state(YK5_AUTH_CHALLENGE.to_vec(), "localhost", false);

        let mut other_id = YK5_CRED_ID.to_vec();
        other_id[0] ^= 0xff;
        let cred = stored_credential(other_id, yk5_auth_cose(), 0);
        assert!(matches!(
            wan.authenticate_credential(&rsp_d, &state, &cred),
            Err(WebauthnError::CredentialIDMismatch)
        ));
    }

    #[test]
    fn test_authentication_wrong_key_fails_signature() {
        let wan = core(
            "http://localhost:8080/auth",
            "http://localhost:8080",
            "localhost",
        );
        let rsp_d: PublicKeyCredential = serde_json::from_str(YK5_AUTHENTICATION).unwrap();
        let state = authentication_state(YK5_AUTH_CHALLENGE.to_vec(), "localhost", false);

        // A different (valid) P-256 point: the signature must not verify.
        let mut m = BTreeMap::new();
        m.insert(Value::Integer(1), Value::Integer(2));
        m.insert(Value::Integer(3), Value::Integer(-7));
        m.insert(Value::Integer(-1), Value::Integer(1));
        m.insert(
            Value::Integer(-2),
            Value::Bytes(
                hex_literal::hex!(
                    "65eda5a12577c2bae829437fe338701a10aaa375e1bb5b5de108de439c08551d"
                )
                .to_vec(),
            ),
        );
        m.insert(
            Value::Integer(-3),
            Value::Bytes(
                hex_literal::hex!(
                    "1e52ed75701163f7f9e40ddf9f341b3dc9ba860af7e0ca7ca7e9eecd0084d19c"
                )
                .to_vec(),
            ),
        );
        let cose = serde_cbor_2::to_vec(&Value::Map(m)).unwrap();

        let cred = stored_credential(YK5_CRED_ID.to_vec(), cose, 0);
        assert!(matches!(
            wan.authenticate_credential(&rsp_d, &state, &cred),
            Err(WebauthnError::AuthenticationFailure)
        ));
    }

    // ---- options generation ----

    #[test]
    fn registration_options_shape() {
        let config = RelyingPartyConfig::new(
            "Example",
            "example.com",
            vec!["https://example.com".to_string()],
        );
        let wan = unsafe { WebauthnCore::new(config) };

        let (options, state) = wan
            .generate_challenge_register("alice", None, &RegistrationOverrides::default())
            .unwrap();

        assert_eq!(options.rp.id, "example.com");
        assert_eq!(options.user.name, "alice");
        assert_eq!(options.user.display_name, "alice");
        assert_eq!(options.pub_key_cred_params[0].alg, -7);
        assert_eq!(options.challenge.len(), 32);
        assert_eq!(options.challenge, *state.challenge());
        assert_eq!(options.user.id, *state.webauthn_user_id());
        assert_eq!(state.webauthn_user_id().len(), 32);
        assert_eq!(options.timeout, Some(60_000));
        assert_eq!(
            options.attestation,
            Some(AttestationConveyancePreference::None)
        );

        let sel = options.authenticator_selection.unwrap();
        assert_eq!(sel.resident_key, Some(ResidentKeyRequirement::Preferred));
        assert_eq!(sel.require_resident_key, Some(false));
        assert_eq!(sel.user_verification, Some(UserVerificationPolicy::Preferred));
        assert_eq!(sel.authenticator_attachment, None);
    }

    #[test]
    fn registration_options_attachment_mapping() {
        let config = RelyingPartyConfig::new(
            "Example",
            "example.com",
            vec!["https://example.com".to_string()],
        );
        let wan = unsafe { WebauthnCore::new(config) };

        let overrides = RegistrationOverrides {
            preferred_authenticator_type: Some(PreferredAuthenticatorType::SecurityKey),
            ..Default::default()
        };
        let (options, _) = wan
            .generate_challenge_register("alice", None, &overrides)
            .unwrap();
        assert_eq!(
            options
                .authenticator_selection
                .unwrap()
                .authenticator_attachment,
            Some(AuthenticatorAttachment::CrossPlatform)
        );

        let overrides = RegistrationOverrides {
            preferred_authenticator_type: Some(PreferredAuthenticatorType::RemoteDevice),
            authenticator_selection: Some(AuthenticatorSelectionCriteria {
                authenticator_attachment: Some(AuthenticatorAttachment::Platform),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (options, _) = wan
            .generate_challenge_register("alice", None, &overrides)
            .unwrap();
        // remote_device unsets the attachment, even over a per-call hint.
        assert_eq!(
            options
                .authenticator_selection
                .unwrap()
                .authenticator_attachment,
            None
        );
    }

    #[test]
    fn registration_options_uv_override_drives_state() {
        let config = RelyingPartyConfig::new(
            "Example",
            "example.com",
            vec!["https://example.com".to_string()],
        );
        let wan = unsafe { WebauthnCore::new(config) };

        let overrides = RegistrationOverrides {
            authenticator_selection: Some(AuthenticatorSelectionCriteria {
                user_verification: Some(UserVerificationPolicy::Required),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (_, state) = wan
            .generate_challenge_register("alice", None, &overrides)
            .unwrap();
        assert!(state.require_user_verification);
    }

    #[test]
    fn authentication_options_shape() {
        let config = RelyingPartyConfig::new(
            "Example",
            "example.com",
            vec!["https://example.com".to_string()],
        );
        let wan = unsafe { WebauthnCore::new(config) };

        // Empty allow list: the field is omitted for discoverable flows.
        let (options, state) = wan
            .generate_challenge_authenticate(vec![], &AuthenticationOverrides::default())
            .unwrap();
        assert!(options.allow_credentials.is_none());
        assert_eq!(options.rp_id.as_deref(), Some("example.com"));
        assert_eq!(options.challenge.len(), 32);
        assert!(!state.require_user_verification);

        let allow = vec![AllowCredentials {
            type_: "public-key".to_string(),
            id: vec![1, 2, 3].into(),
            transports: None,
        }];
        let (options, state) = wan
            .generate_challenge_authenticate(
                allow,
                &AuthenticationOverrides {
                    user_verification: Some(UserVerificationPolicy::Required),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(options.allow_credentials.as_ref().map(|a| a.len()), Some(1));
        assert!(state.require_user_verification);
    }

    #[test]
    fn config_validation_bounds() {
        let base = |f: &dyn Fn(&mut RelyingPartyConfig)| {
            let mut c = RelyingPartyConfig::new(
                "Example",
                "example.com",
                vec!["https://example.com".to_string()],
            );
            f(&mut c);
            c.validate()
        };

        assert!(base(&|_| {}).is_ok());
        assert!(base(&|c| c.challenge_size_bytes = 15).is_err());
        assert!(base(&|c| c.challenge_size_bytes = 16).is_ok());
        assert!(base(&|c| c.challenge_size_bytes = 64).is_ok());
        assert!(base(&|c| c.challenge_size_bytes = 65).is_err());
        assert!(base(&|c| c.operation_timeout_ms = 9_999).is_err());
        assert!(base(&|c| c.operation_timeout_ms = 10_000).is_ok());
        assert!(base(&|c| c.rp_id = String::new()).is_err());
        assert!(base(&|c| c.origins = vec![]).is_err());
        assert!(base(&|c| c.supported_algorithms = vec![]).is_err());
    }

    // ---- self-signed end to end ceremonies ----

    struct SoftToken {
        pkey: pkey::PKey<pkey::Private>,
        cose: Vec<u8>,
        cred_id: Vec<u8>,
    }

    // A minimal software authenticator: a P-256 key and the COSE encoding
    // of its public half.
    fn soft_token() -> SoftToken {
        let group = ec::EcGroup::from_curve_name(nid::Nid::X9_62_PRIME256V1).unwrap();
        let ec_key = ec::EcKey::generate(&group).unwrap();

        let mut ctx = bn::BigNumContext::new().unwrap();
        let mut x = bn::BigNum::new().unwrap();
        let mut y = bn::BigNum::new().unwrap();
        ec_key
            .public_key()
            .affine_coordinates_gfp(&group, &mut x, &mut y, &mut ctx)
            .unwrap();

        let mut m = BTreeMap::new();
        m.insert(Value::Integer(1), Value::Integer(2));
        m.insert(Value::Integer(3), Value::Integer(-7));
        m.insert(Value::Integer(-1), Value::Integer(1));
        m.insert(Value::Integer(-2), Value::Bytes(x.to_vec_padded(32).unwrap()));
        m.insert(Value::Integer(-3), Value::Bytes(y.to_vec_padded(32).unwrap()));
        let cose = serde_cbor_2::to_vec(&Value::Map(m)).unwrap();

        let mut cred_id = vec![0u8; 16];
        rand::thread_rng().fill_bytes(&mut cred_id);

        SoftToken {
            pkey: pkey::PKey::from_ec_key(ec_key).unwrap(),
            cose,
            cred_id,
        }
    }

    fn build_auth_data(rp_id: &str, flags: u8, counter: u32, acd: Option<&SoftToken>) -> Vec<u8> {
        let mut out = compute_sha256(rp_id.as_bytes());
        out.push(flags);
        out.extend_from_slice(&counter.to_be_bytes());
        if let Some(token) = acd {
            out.extend_from_slice(&[0u8; 16]); // anonymised aaguid
            out.extend_from_slice(&(token.cred_id.len() as u16).to_be_bytes());
            out.extend_from_slice(&token.cred_id);
            out.extend_from_slice(&token.cose);
        }
        out
    }

    #[test]
    fn self_signed_es256_registration_and_authentication() {
        let wan = core("Example", "https://example.com", "example.com");
        let token = soft_token();

        // -- registration, attestation format none --
        let (options, reg_state) = wan
            .generate_challenge_register("alice", None, &RegistrationOverrides::default())
            .unwrap();

        let client_data_json = serde_json::json!({
            "type": "webauthn.create",
            "challenge": options.challenge.to_string(),
            "origin": "https://example.com",
            "crossOrigin": false,
        })
        .to_string();

        let auth_data = build_auth_data(
            "example.com",
            FLAG_USER_PRESENT | FLAG_USER_VERIFIED | FLAG_ATTESTED_CRED_DATA,
            0,
            Some(&token),
        );

        let mut att_obj = BTreeMap::new();
        att_obj.insert(Value::Text("fmt".to_string()), Value::Text("none".to_string()));
        att_obj.insert(Value::Text("attStmt".to_string()), Value::Map(BTreeMap::new()));
        att_obj.insert(Value::Text("authData".to_string()), Value::Bytes(auth_data));
        let att_obj_bytes = serde_cbor_2::to_vec(&Value::Map(att_obj)).unwrap();

        let reg = RegisterPublicKeyCredential {
            id: Base64UrlSafeData(token.cred_id.clone()).to_string(),
            raw_id: token.cred_id.clone().into(),
            response: AuthenticatorAttestationResponseRaw {
                client_data_json: client_data_json.clone().into_bytes().into(),
                attestation_object: att_obj_bytes.into(),
                transports: Some(vec![AuthenticatorTransport::Usb]),
            },
            authenticator_attachment: None,
            client_extension_results: serde_json::Map::new(),
            type_: "public-key".to_string(),
        };

        let info = wan.register_credential(&reg, &reg_state).unwrap();
        assert_eq!(info.credential_id.as_ref(), token.cred_id.as_slice());
        assert!(info.user_verified);
        assert_eq!(info.device_type, CredentialDeviceType::SingleDevice);
        assert_eq!(info.transports, vec![AuthenticatorTransport::Usb]);
        assert_eq!(info.attestation_format, "none");
        assert!(info.aaguid.is_none());

        // -- authentication with the registered key --
        let cred = PasskeyCredential::from_registration(
            "u1",
            reg_state.webauthn_user_id().clone(),
            &info,
        );

        let allow = vec![AllowCredentials {
            type_: "public-key".to_string(),
            id: cred.credential_id.clone(),
            transports: None,
        }];
        let (auth_options, auth_state) = wan
            .generate_challenge_authenticate(allow, &AuthenticationOverrides::default())
            .unwrap();

        let client_data_json = serde_json::json!({
            "type": "webauthn.get",
            "challenge": auth_options.challenge.to_string(),
            "origin": "https://example.com",
            "crossOrigin": false,
        })
        .to_string();

        let auth_data = build_auth_data("example.com", FLAG_USER_PRESENT, 1, None);

        let mut verification_data = auth_data.clone();
        verification_data.extend_from_slice(&compute_sha256(client_data_json.as_bytes()));

        let mut signer = sign::Signer::new(MessageDigest::sha256(), &token.pkey).unwrap();
        signer.update(&verification_data).unwrap();
        let signature = signer.sign_to_vec().unwrap();

        let rsp = PublicKeyCredential {
            id: cred.credential_id.to_string(),
            raw_id: cred.credential_id.clone(),
            response: AuthenticatorAssertionResponseRaw {
                authenticator_data: auth_data.into(),
                client_data_json: client_data_json.into_bytes().into(),
                signature: signature.into(),
                user_handle: None,
            },
            authenticator_attachment: None,
            client_extension_results: serde_json::Map::new(),
            type_: "public-key".to_string(),
        };

        let auth_info = wan
            .authenticate_credential(&rsp, &auth_state, &cred)
            .unwrap();
        assert_eq!(auth_info.new_counter, 1);
        assert!(!auth_info.user_verified);
        assert!(!auth_info.backup_state);
    }

    #[test]
    fn self_signed_ed25519_authentication() {
        let wan = core("Example", "https://example.com", "example.com");

        let privkey = pkey::PKey::generate_ed25519().unwrap();
        let pub_raw = privkey.raw_public_key().unwrap();

        // COSE: {1: 1 (OKP), 3: -8 (EdDSA), -1: 6 (Ed25519), -2: x}
        let mut m = BTreeMap::new();
        m.insert(Value::Integer(1), Value::Integer(1));
        m.insert(Value::Integer(3), Value::Integer(-8));
        m.insert(Value::Integer(-1), Value::Integer(6));
        m.insert(Value::Integer(-2), Value::Bytes(pub_raw));
        let cose = serde_cbor_2::to_vec(&Value::Map(m)).unwrap();

        let cred_id = vec![9u8; 32];
        let cred = stored_credential(cred_id.clone(), cose, 0);

        let (auth_options, auth_state) = wan
            .generate_challenge_authenticate(vec![], &AuthenticationOverrides::default())
            .unwrap();

        let client_data_json = serde_json::json!({
            "type": "webauthn.get",
            "challenge": auth_options.challenge.to_string(),
            "origin": "https://example.com",
        })
        .to_string();

        let auth_data = build_auth_data(
            "example.com",
            FLAG_USER_PRESENT | FLAG_USER_VERIFIED | FLAG_BACKUP_ELIGIBLE | FLAG_BACKUP_STATE,
            0,
            None,
        );

        // Ed25519 signs the message directly - no pre-hash.
        let mut verification_data = auth_data.clone();
        verification_data.extend_from_slice(&compute_sha256(client_data_json.as_bytes()));
        let mut signer = sign::Signer::new_without_digest(&privkey).unwrap();
        let signature = signer.sign_oneshot_to_vec(&verification_data).unwrap();

        let rsp = PublicKeyCredential {
            id: Base64UrlSafeData(cred_id.clone()).to_string(),
            raw_id: cred_id.into(),
            response: AuthenticatorAssertionResponseRaw {
                authenticator_data: auth_data.into(),
                client_data_json: client_data_json.into_bytes().into(),
                signature: signature.into(),
                user_handle: None,
            },
            authenticator_attachment: None,
            client_extension_results: serde_json::Map::new(),
            type_: "public-key".to_string(),
        };

        let info = wan
            .authenticate_credential(&rsp, &auth_state, &cred)
            .unwrap();
        // Counter pair (0, 0): accepted without an advance.
        assert_eq!(info.new_counter, 0);
        assert!(info.user_verified);
        assert!(info.backup_state);
    }
}
