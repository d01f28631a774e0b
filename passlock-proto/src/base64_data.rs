//! A wrapper for `Vec<u8>` that makes Serde emit URL-safe, non-padded Base64
//! (RFC 4648 §5) and tolerate the padded and standard-alphabet forms on input.
//!
//! Serde's default behaviour is to serialise `Vec<u8>` as a sequence of
//! integers, which bloats JSON badly. Every binary field a Webauthn client
//! sends or receives is Base64URL on the wire, so this type is used for all
//! of them.

use base64::{
    engine::general_purpose::{GeneralPurpose, STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use serde::de::{Error, SeqAccess, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::convert::TryFrom;
use std::fmt;
use std::ops::{Deref, DerefMut};

static ALLOWED_DECODING_FORMATS: &[GeneralPurpose] =
    &[URL_SAFE_NO_PAD, URL_SAFE, STANDARD, STANDARD_NO_PAD];

/// Returns true exactly when `s` consists only of the RFC 4648 §5 alphabet
/// (`A-Z a-z 0-9 - _`). The empty string is valid.
pub fn is_base64url(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Serde wrapper for `Vec<u8>` which always emits URL-safe, non-padded
/// Base64, and accepts Base64 (padded or not, URL-safe or standard), byte
/// strings and integer sequences on input.
///
/// Otherwise, this type should work as much like a `Vec<u8>` as possible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Base64UrlSafeData(pub Vec<u8>);

impl fmt::Display for Base64UrlSafeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self))
    }
}

impl Borrow<[u8]> for Base64UrlSafeData {
    fn borrow(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl Deref for Base64UrlSafeData {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Base64UrlSafeData {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<u8>> for Base64UrlSafeData {
    fn from(v: Vec<u8>) -> Base64UrlSafeData {
        Base64UrlSafeData(v)
    }
}

impl From<&[u8]> for Base64UrlSafeData {
    fn from(v: &[u8]) -> Base64UrlSafeData {
        Base64UrlSafeData(v.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Base64UrlSafeData {
    fn from(v: [u8; N]) -> Base64UrlSafeData {
        Base64UrlSafeData(v.to_vec())
    }
}

impl From<Base64UrlSafeData> for Vec<u8> {
    fn from(d: Base64UrlSafeData) -> Vec<u8> {
        d.0
    }
}

impl AsRef<[u8]> for Base64UrlSafeData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&str> for Base64UrlSafeData {
    type Error = ();

    fn try_from(v: &str) -> Result<Self, Self::Error> {
        for config in ALLOWED_DECODING_FORMATS {
            if let Ok(data) = config.decode(v) {
                return Ok(Base64UrlSafeData(data));
            }
        }
        Err(())
    }
}

struct Base64UrlSafeDataVisitor;

impl<'de> Visitor<'de> for Base64UrlSafeDataVisitor {
    type Value = Base64UrlSafeData;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(
            formatter,
            "a url-safe base64-encoded string, bytes, or sequence of integers"
        )
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        // Forgive alt base64 decoding formats
        for config in ALLOWED_DECODING_FORMATS {
            if let Ok(data) = config.decode(v) {
                return Ok(Base64UrlSafeData(data));
            }
        }

        Err(serde::de::Error::invalid_value(Unexpected::Str(v), &self))
    }

    fn visit_seq<A>(self, mut v: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut data = if let Some(sz) = v.size_hint() {
            Vec::with_capacity(sz)
        } else {
            Vec::new()
        };

        while let Some(i) = v.next_element()? {
            data.push(i)
        }
        Ok(Base64UrlSafeData(data))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Ok(Base64UrlSafeData(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Ok(Base64UrlSafeData(v.into()))
    }
}

impl<'de> Deserialize<'de> for Base64UrlSafeData {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(Base64UrlSafeDataVisitor)
    }
}

impl Serialize for Base64UrlSafeData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = URL_SAFE_NO_PAD.encode(self);
        serializer.serialize_str(&encoded)
    }
}
