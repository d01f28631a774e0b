//! Wire protocol bindings for the Passlock Webauthn relying party library.
//!
//! These are the JSON structures exchanged with a browser or platform client
//! during the `navigator.credentials.create()` and `navigator.credentials.get()`
//! ceremonies. They are designed to serialise exactly to the shapes the
//! Webauthn Level 2 specification describes, so you can hand them to a client
//! without further transformation.

#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]

mod base64_data;

pub mod attest;
pub mod auth;
pub mod cose;
pub mod options;

pub use crate::attest::*;
pub use crate::auth::*;
pub use crate::base64_data::{is_base64url, Base64UrlSafeData};
pub use crate::cose::*;
pub use crate::options::*;
