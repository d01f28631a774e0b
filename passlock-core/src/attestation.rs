//! Attestation statement format identifiers.
//!
//! This library deliberately does not verify attestation statements. The
//! trust model is trust-on-first-use, bound to the credential public key the
//! authenticator signed into its attested credential data. Formats are still
//! recognised so that callers who need chain validation (for `direct`
//! attestation policies) can dispatch to an external verifier.

use std::convert::TryFrom;

/// The type of attestation format a client conveyed in its attestation
/// object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationFormat {
    /// Packed attestation, the CTAP2 default.
    Packed,
    /// TPM attestation, usually Windows Hello.
    Tpm,
    /// Android hardware key attestation.
    AndroidKey,
    /// Android SafetyNet attestation.
    AndroidSafetyNet,
    /// The legacy FIDO U2F format.
    FidoU2F,
    /// Apple's anonymous attestation.
    AppleAnonymous,
    /// No attestation was provided.
    None,
}

impl TryFrom<&str> for AttestationFormat {
    type Error = ();

    fn try_from(a: &str) -> Result<AttestationFormat, Self::Error> {
        match a {
            "packed" => Ok(AttestationFormat::Packed),
            "tpm" => Ok(AttestationFormat::Tpm),
            "android-key" => Ok(AttestationFormat::AndroidKey),
            "android-safetynet" => Ok(AttestationFormat::AndroidSafetyNet),
            "fido-u2f" => Ok(AttestationFormat::FidoU2F),
            "apple" => Ok(AttestationFormat::AppleAnonymous),
            "none" => Ok(AttestationFormat::None),
            _ => Err(()),
        }
    }
}
