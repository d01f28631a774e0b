//! Possible errors that may occur during Webauthn operations.
//!
//! Every variant maps to a stable, machine readable code via
//! [WebauthnError::error_code]. Codes never change once published; messages
//! may. No variant ever carries secret material - challenges, keys and the
//! token secret do not appear in messages.

use thiserror::Error;

/// A result alias for Webauthn operations.
pub type WebauthnResult<T> = Result<T, WebauthnError>;

/// Possible errors that may occur during Webauthn operations.
#[derive(Debug, Error)]
pub enum WebauthnError {
    /// The configuration of the relying party was rejected. The message
    /// names the offending field.
    #[error("configuration invalid: {0}")]
    Configuration(&'static str),

    /// A CBOR structure was unable to be parsed.
    #[error("CBOR parse failure")]
    ParseCBORFailure(#[from] serde_cbor_2::error::Error),

    /// A JSON structure was unable to be parsed.
    #[error("JSON parse failure")]
    ParseJSONFailure(#[from] serde_json::Error),

    /// A Base64 value was unable to be decoded.
    #[error("base64 decode failure")]
    ParseBase64Failure,

    /// The COSE key map has no key type (kty) entry.
    #[error("COSE key has no kty")]
    COSEKeyMissingKty,

    /// The COSE EC2 key is missing fields or has invalid coordinates.
    #[error("COSE EC2 key invalid")]
    COSEKeyEC2Invalid,

    /// The COSE RSA key is missing its modulus or exponent.
    #[error("COSE RSA key invalid")]
    COSEKeyRSAInvalid,

    /// The COSE OKP key is missing fields or has an invalid coordinate.
    #[error("COSE OKP key invalid")]
    COSEKeyOKPInvalid,

    /// The COSE key type is not one this library supports.
    #[error("COSE key type unsupported")]
    COSEKeyUnsupportedType,

    /// The COSE key algorithm is unknown, or could not be inferred.
    #[error("COSE key algorithm unknown")]
    COSEKeyUnknownAlgorithm,

    /// A CBOR value was not of the type required in its position.
    #[error("CBOR value of unexpected type")]
    COSEKeyInvalidCBORValue,

    /// The authenticator data is shorter than its fixed header.
    #[error("authenticator data too short")]
    AuthenticatorDataTooShort,

    /// The attested credential data inside the authenticator data is
    /// truncated or malformed.
    #[error("attested credential data malformed")]
    AttestedCredentialDataMalformed,

    /// The attestation object is not a map of the expected shape.
    #[error("attestation object structure invalid")]
    AttestationStatementMapInvalid,

    /// The user present bit was not set and presence is required.
    #[error("user presence required but not asserted")]
    UserNotPresent,

    /// The user verified bit was not set and verification is required.
    #[error("user verification required but not asserted")]
    UserNotVerified,

    /// The client data type was not the one this ceremony requires.
    #[error("invalid client data ceremony type")]
    InvalidClientDataType,

    /// The challenge in the client data does not match the issued challenge.
    #[error("challenge mismatch")]
    MismatchedChallenge,

    /// The challenge was not found in the challenge store, has expired, or
    /// was already consumed.
    #[error("challenge not found or already consumed")]
    ChallengeNotFound,

    /// The origin in the client data is not one of the expected origins.
    #[error("origin mismatch")]
    InvalidRPOrigin,

    /// The rpIdHash in the authenticator data matches none of the expected
    /// relying party ids.
    #[error("relying party id hash mismatch")]
    InvalidRPIDHash,

    /// The authenticator did not return attested credential data.
    #[error("attested credential data missing")]
    MissingAttestedCredentialData,

    /// The asserted credential id does not match the stored credential.
    #[error("credential id mismatch")]
    CredentialIDMismatch,

    /// No stored credential matches the asserted credential id.
    #[error("credential not found")]
    CredentialNotFound,

    /// The credential id is already registered.
    #[error("credential already registered")]
    CredentialAlreadyExists,

    /// The credential's algorithm is not in the set this relying party
    /// offered at registration.
    #[error("credential algorithm not in the offered set")]
    CredentialAlteredAlgFromRequest,

    /// The signature counter went backwards - at least two copies of the
    /// credential private key may exist.
    #[error("signature counter regression, credential may be cloned")]
    CredentialPossibleCompromise,

    /// The assertion signature did not verify over the signed data.
    #[error("signature verification failed")]
    AuthenticationFailure,

    /// The requested algorithm cannot be used for verification.
    #[error("unsupported verification algorithm")]
    UnsupportedAlgorithm,

    /// A session token could not be created.
    #[error("token creation failed")]
    TokenCreationFailure,

    /// A session token failed to open. No further detail is available, by
    /// design.
    #[error("invalid token")]
    InvalidToken,

    /// The session has passed its expiry.
    #[error("session expired")]
    SessionExpired,

    /// The session does not exist in the session store.
    #[error("session not found")]
    SessionNotFound,

    /// The storage adapter reported a fault.
    #[error("storage error: {0}")]
    Storage(String),

    /// A fault occurred in the cryptographic provider.
    #[error("openssl error")]
    OpenSSLError(#[from] openssl::error::ErrorStack),

    /// Entropy was unavailable from the system.
    #[error("random number generator unavailable")]
    RngUnavailable,
}

impl WebauthnError {
    /// The stable, machine readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            WebauthnError::Configuration(_) => "CONFIGURATION_ERROR",
            WebauthnError::ParseCBORFailure(_) => "CBOR_DECODE_ERROR",
            WebauthnError::ParseJSONFailure(_) => "JSON_PARSE_ERROR",
            WebauthnError::ParseBase64Failure => "BASE64_DECODE_ERROR",
            WebauthnError::COSEKeyMissingKty => "COSE_MISSING_KTY",
            WebauthnError::COSEKeyEC2Invalid => "COSE_EC2_INVALID",
            WebauthnError::COSEKeyRSAInvalid => "COSE_RSA_INVALID",
            WebauthnError::COSEKeyOKPInvalid => "COSE_OKP_INVALID",
            WebauthnError::COSEKeyUnsupportedType => "COSE_UNSUPPORTED_KEY_TYPE",
            WebauthnError::COSEKeyUnknownAlgorithm => "COSE_UNKNOWN_ALGORITHM",
            WebauthnError::COSEKeyInvalidCBORValue => "CBOR_DECODE_ERROR",
            WebauthnError::AuthenticatorDataTooShort => "AUTHENTICATOR_DATA_TOO_SHORT",
            WebauthnError::AttestedCredentialDataMalformed => {
                "AUTHENTICATOR_DATA_INVALID_CREDENTIAL_DATA"
            }
            WebauthnError::AttestationStatementMapInvalid => "CBOR_DECODE_ERROR",
            WebauthnError::UserNotPresent => "USER_PRESENCE_REQUIRED",
            WebauthnError::UserNotVerified => "USER_VERIFICATION_REQUIRED",
            WebauthnError::InvalidClientDataType => "INVALID_CLIENT_DATA_TYPE",
            WebauthnError::MismatchedChallenge => "CHALLENGE_MISMATCH",
            WebauthnError::ChallengeNotFound => "CHALLENGE_NOT_FOUND",
            WebauthnError::InvalidRPOrigin => "ORIGIN_MISMATCH",
            WebauthnError::InvalidRPIDHash => "RPID_MISMATCH",
            WebauthnError::MissingAttestedCredentialData => "MISSING_CREDENTIAL_DATA",
            WebauthnError::CredentialIDMismatch => "CREDENTIAL_ID_MISMATCH",
            WebauthnError::CredentialNotFound => "CREDENTIAL_NOT_FOUND",
            WebauthnError::CredentialAlreadyExists => "CREDENTIAL_ALREADY_EXISTS",
            WebauthnError::CredentialAlteredAlgFromRequest => "UNSUPPORTED_ALGORITHM",
            WebauthnError::CredentialPossibleCompromise => "COUNTER_ERROR",
            WebauthnError::AuthenticationFailure => "SIGNATURE_VERIFICATION_FAILED",
            WebauthnError::UnsupportedAlgorithm => "UNSUPPORTED_ALGORITHM",
            WebauthnError::TokenCreationFailure => "TOKEN_CREATION_FAILED",
            WebauthnError::InvalidToken => "INVALID_TOKEN",
            WebauthnError::SessionExpired => "SESSION_EXPIRED",
            WebauthnError::SessionNotFound => "SESSION_NOT_FOUND",
            WebauthnError::Storage(_) => "STORAGE_ERROR",
            WebauthnError::OpenSSLError(_) => "CRYPTO_ERROR",
            WebauthnError::RngUnavailable => "RNG_UNAVAILABLE",
        }
    }
}
