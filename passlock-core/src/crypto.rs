//! Cryptographic operation wrapper for Webauthn. This module exists to
//! allow ease of auditing, safe operation wrappers for the webauthn library,
//! and cryptographic provider abstraction. This module currently uses OpenSSL
//! as the cryptographic primitive provider.

use openssl::{bn, ec, hash::MessageDigest, memcmp, nid, pkey, rsa, sha, sign};
use serde_cbor_2::Value;
use std::convert::TryFrom;

use crate::error::WebauthnError;
use crate::interface::*;
use crate::proto::COSEAlgorithm;

// Why OpenSSL over another rust crate?
// - The openssl crate allows us to reconstruct a public key from the
//   x/y group coords, where most others want a pkcs formatted structure. As
//   a result, it's easiest to use openssl as it gives us exactly what we need
//   for these operations, and despite it's many challenges as a library, it
//   has resources and investment into it's maintenance, so we can at least
//   assert a higher level of confidence in it that <backyard crypto here>.

/// Compute the SHA-256 of a slice of data.
pub fn compute_sha256(data: &[u8]) -> Vec<u8> {
    sha::sha256(data).to_vec()
}

/// Compute the SHA-384 of a slice of data.
pub fn compute_sha384(data: &[u8]) -> Vec<u8> {
    sha::sha384(data).to_vec()
}

/// Compute the SHA-512 of a slice of data.
pub fn compute_sha512(data: &[u8]) -> Vec<u8> {
    sha::sha512(data).to_vec()
}

/// Compare two byte strings in constant time with respect to their content.
/// A length mismatch short-circuits, which is permitted - lengths of the
/// values compared here are public.
pub(crate) fn ct_equal(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && (a.is_empty() || memcmp::eq(a, b))
}

impl ECDSACurve {
    /// The size of an affine coordinate on this curve, in bytes.
    pub(crate) fn coordinate_size(&self) -> usize {
        match self {
            ECDSACurve::SECP256R1 => 32,
            ECDSACurve::SECP384R1 => 48,
            ECDSACurve::SECP521R1 => 66,
        }
    }

    fn to_openssl_nid(self) -> nid::Nid {
        match self {
            ECDSACurve::SECP256R1 => nid::Nid::X9_62_PRIME256V1,
            ECDSACurve::SECP384R1 => nid::Nid::SECP384R1,
            ECDSACurve::SECP521R1 => nid::Nid::SECP521R1,
        }
    }

    /// The signature algorithm this curve pairs with by convention, used
    /// when a COSE key carries no explicit alg entry.
    fn implied_algorithm(self) -> COSEAlgorithm {
        match self {
            ECDSACurve::SECP256R1 => COSEAlgorithm::ES256,
            ECDSACurve::SECP384R1 => COSEAlgorithm::ES384,
            ECDSACurve::SECP521R1 => COSEAlgorithm::ES512,
        }
    }
}

impl TryFrom<i128> for ECDSACurve {
    type Error = WebauthnError;
    fn try_from(u: i128) -> Result<Self, Self::Error> {
        match u {
            1 => Ok(ECDSACurve::SECP256R1),
            2 => Ok(ECDSACurve::SECP384R1),
            3 => Ok(ECDSACurve::SECP521R1),
            _ => Err(WebauthnError::COSEKeyEC2Invalid),
        }
    }
}

impl TryFrom<&Value> for COSEKey {
    type Error = WebauthnError;

    fn try_from(d: &Value) -> Result<COSEKey, Self::Error> {
        let m = cbor_try_map!(d).map_err(|_| WebauthnError::COSEKeyMissingKty)?;

        // See https://tools.ietf.org/html/rfc8152#section-7.1
        // The map is keyed by small integers:
        //   1  -> kty (1 OKP, 2 EC2, 3 RSA)
        //   3  -> alg (optional; inferred from the key shape when absent)
        //   -1 -> crv for EC2/OKP, n for RSA
        //   -2 -> x   for EC2/OKP, e for RSA
        //   -3 -> y   for EC2
        let key_type_value = m
            .get(&Value::Integer(1))
            .ok_or(WebauthnError::COSEKeyMissingKty)?;
        let key_type =
            cbor_try_i128!(key_type_value).map_err(|_| WebauthnError::COSEKeyMissingKty)?;

        let alg = match m.get(&Value::Integer(3)) {
            Some(alg_value) => {
                let alg_id = cbor_try_i128!(alg_value)
                    .map_err(|_| WebauthnError::COSEKeyUnknownAlgorithm)?;
                Some(
                    COSEAlgorithm::try_from(alg_id as i64)
                        .map_err(|_| WebauthnError::COSEKeyUnknownAlgorithm)?,
                )
            }
            None => None,
        };

        let cose_key = match key_type {
            // EC2: crv (-1), x (-2), y (-3)
            2 => {
                let curve_value = m
                    .get(&Value::Integer(-1))
                    .ok_or(WebauthnError::COSEKeyEC2Invalid)?;
                let curve = cbor_try_i128!(curve_value)
                    .map_err(|_| WebauthnError::COSEKeyEC2Invalid)
                    .and_then(ECDSACurve::try_from)?;

                let x_value = m
                    .get(&Value::Integer(-2))
                    .ok_or(WebauthnError::COSEKeyEC2Invalid)?;
                let x = cbor_try_bytes!(x_value).map_err(|_| WebauthnError::COSEKeyEC2Invalid)?;

                let y_value = m
                    .get(&Value::Integer(-3))
                    .ok_or(WebauthnError::COSEKeyEC2Invalid)?;
                let y = cbor_try_bytes!(y_value).map_err(|_| WebauthnError::COSEKeyEC2Invalid)?;

                let coord_len = curve.coordinate_size();
                if x.len() != coord_len || y.len() != coord_len {
                    return Err(WebauthnError::COSEKeyEC2Invalid);
                }

                COSEKey {
                    type_: alg.unwrap_or_else(|| curve.implied_algorithm()),
                    key: COSEKeyType::EC_EC2(COSEEC2Key {
                        curve,
                        x: x.as_slice().into(),
                        y: y.as_slice().into(),
                    }),
                }
            }
            // RSA: n (-1), e (-2)
            3 => {
                let n_value = m
                    .get(&Value::Integer(-1))
                    .ok_or(WebauthnError::COSEKeyRSAInvalid)?;
                let n = cbor_try_bytes!(n_value).map_err(|_| WebauthnError::COSEKeyRSAInvalid)?;

                let e_value = m
                    .get(&Value::Integer(-2))
                    .ok_or(WebauthnError::COSEKeyRSAInvalid)?;
                let e = cbor_try_bytes!(e_value).map_err(|_| WebauthnError::COSEKeyRSAInvalid)?;

                if n.is_empty() || e.is_empty() {
                    return Err(WebauthnError::COSEKeyRSAInvalid);
                }

                COSEKey {
                    type_: alg.unwrap_or(COSEAlgorithm::RS256),
                    key: COSEKeyType::RSA(COSERSAKey {
                        n: n.as_slice().into(),
                        e: e.as_slice().into(),
                    }),
                }
            }
            // OKP: crv (-1), x (-2)
            1 => {
                let curve_value = m
                    .get(&Value::Integer(-1))
                    .ok_or(WebauthnError::COSEKeyOKPInvalid)?;
                let curve =
                    cbor_try_i128!(curve_value).map_err(|_| WebauthnError::COSEKeyOKPInvalid)?;

                // Only Ed25519 (crv 6) is supported. Ed448 and the ECDH
                // curves are not signature keys we can verify.
                if curve != 6 {
                    return Err(WebauthnError::COSEKeyUnknownAlgorithm);
                }

                let x_value = m
                    .get(&Value::Integer(-2))
                    .ok_or(WebauthnError::COSEKeyOKPInvalid)?;
                let x = cbor_try_bytes!(x_value).map_err(|_| WebauthnError::COSEKeyOKPInvalid)?;

                if x.len() != 32 {
                    return Err(WebauthnError::COSEKeyOKPInvalid);
                }

                COSEKey {
                    type_: alg.unwrap_or(COSEAlgorithm::EDDSA),
                    key: COSEKeyType::EC_OKP(COSEOKPKey {
                        curve: EDDSACurve::ED25519,
                        x: x.as_slice().into(),
                    }),
                }
            }
            _ => {
                debug!(?key_type, "COSE key type unsupported");
                return Err(WebauthnError::COSEKeyUnsupportedType);
            }
        };

        // The rfc additionally states:
        //   "Applications MUST check that the curve and the key type are
        //    consistent and reject a key if they are not."
        // Feeding the values to openssl validates them for us.
        cose_key.validate()?;
        Ok(cose_key)
    }
}

impl TryFrom<&[u8]> for COSEKey {
    type Error = WebauthnError;

    fn try_from(d: &[u8]) -> Result<COSEKey, Self::Error> {
        let value: Value = serde_cbor_2::from_slice(d)?;
        COSEKey::try_from(&value)
    }
}

impl COSEKey {
    pub(crate) fn validate(&self) -> Result<(), WebauthnError> {
        self.get_openssl_pkey().map(|_| ())
    }

    fn get_openssl_pkey(&self) -> Result<pkey::PKey<pkey::Public>, WebauthnError> {
        match &self.key {
            COSEKeyType::EC_EC2(ec2k) => {
                let curve = ec2k.curve.to_openssl_nid();
                let ec_group = ec::EcGroup::from_curve_name(curve)?;

                let xbn = bn::BigNum::from_slice(ec2k.x.as_ref())?;
                let ybn = bn::BigNum::from_slice(ec2k.y.as_ref())?;

                let ec_key = ec::EcKey::from_public_key_affine_coordinates(&ec_group, &xbn, &ybn)?;

                // This asserts the point is actually on the named curve.
                ec_key.check_key()?;

                Ok(pkey::PKey::from_ec_key(ec_key)?)
            }
            COSEKeyType::RSA(rsak) => {
                let nbn = bn::BigNum::from_slice(rsak.n.as_ref())?;
                let ebn = bn::BigNum::from_slice(rsak.e.as_ref())?;

                let rsa_key = rsa::Rsa::from_public_components(nbn, ebn)?;
                Ok(pkey::PKey::from_rsa(rsa_key)?)
            }
            COSEKeyType::EC_OKP(okpk) => Ok(pkey::PKey::public_key_from_raw_bytes(
                okpk.x.as_ref(),
                pkey::Id::ED25519,
            )?),
        }
    }

    /// Verify that `signature` is valid over `verification_data` with this
    /// key, under the key's signature scheme.
    ///
    /// ECDSA signatures must be in the DER `SEQUENCE { r, s }` form browsers
    /// deliver; raw `r || s` is rejected. RSASSA-PSS uses a salt length equal
    /// to the digest length. Ed25519 signs the message directly.
    ///
    /// Low-level verification faults deliberately collapse to `Ok(false)` so
    /// the cause cannot be distinguished by a caller (or an attacker).
    /// Algorithm and key-shape problems remain errors.
    pub fn verify_signature(
        &self,
        signature: &[u8],
        verification_data: &[u8],
    ) -> Result<bool, WebauthnError> {
        let pkey = self.get_openssl_pkey()?;

        match self.type_ {
            COSEAlgorithm::ES256 | COSEAlgorithm::ES384 | COSEAlgorithm::ES512 => {
                if !matches!(self.key, COSEKeyType::EC_EC2(_)) {
                    return Err(WebauthnError::UnsupportedAlgorithm);
                }
                let mut verifier = sign::Verifier::new(self.digest()?, &pkey)?;
                Ok(verifier
                    .update(verification_data)
                    .and_then(|_| verifier.verify(signature))
                    .unwrap_or(false))
            }
            COSEAlgorithm::RS256 | COSEAlgorithm::RS384 | COSEAlgorithm::RS512 => {
                if !matches!(self.key, COSEKeyType::RSA(_)) {
                    return Err(WebauthnError::UnsupportedAlgorithm);
                }
                let mut verifier = sign::Verifier::new(self.digest()?, &pkey)?;
                Ok(verifier
                    .update(verification_data)
                    .and_then(|_| verifier.verify(signature))
                    .unwrap_or(false))
            }
            COSEAlgorithm::PS256 | COSEAlgorithm::PS384 | COSEAlgorithm::PS512 => {
                if !matches!(self.key, COSEKeyType::RSA(_)) {
                    return Err(WebauthnError::UnsupportedAlgorithm);
                }
                let mut verifier = sign::Verifier::new(self.digest()?, &pkey)?;
                verifier.set_rsa_padding(rsa::Padding::PKCS1_PSS)?;
                verifier.set_rsa_pss_saltlen(sign::RsaPssSaltlen::DIGEST_LENGTH)?;
                Ok(verifier
                    .update(verification_data)
                    .and_then(|_| verifier.verify(signature))
                    .unwrap_or(false))
            }
            COSEAlgorithm::EDDSA => {
                if !matches!(self.key, COSEKeyType::EC_OKP(_)) {
                    return Err(WebauthnError::UnsupportedAlgorithm);
                }
                let mut verifier = sign::Verifier::new_without_digest(&pkey)?;
                Ok(verifier
                    .verify_oneshot(signature, verification_data)
                    .unwrap_or(false))
            }
        }
    }

    fn digest(&self) -> Result<MessageDigest, WebauthnError> {
        match self.type_ {
            COSEAlgorithm::ES256 | COSEAlgorithm::RS256 | COSEAlgorithm::PS256 => {
                Ok(MessageDigest::sha256())
            }
            COSEAlgorithm::ES384 | COSEAlgorithm::RS384 | COSEAlgorithm::PS384 => {
                Ok(MessageDigest::sha384())
            }
            COSEAlgorithm::ES512 | COSEAlgorithm::RS512 | COSEAlgorithm::PS512 => {
                Ok(MessageDigest::sha512())
            }
            COSEAlgorithm::EDDSA => Err(WebauthnError::UnsupportedAlgorithm),
        }
    }
}
