//! Passlock core - Webauthn ceremony verification for Rust server
//! applications.
//!
//! This crate implements the cryptographic heart of a Webauthn relying
//! party: building the option structures that drive the client ceremonies,
//! and verifying the binary artifacts (client data, attestation objects,
//! authenticator data, signatures) a client returns.
//!
//! Most users should prefer the `passlock` crate, which layers validated
//! configuration, challenge/credential storage and session tokens over this
//! core. The APIs here assume you uphold the ceremony rules yourself.

#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]

#[macro_use]
extern crate tracing;

#[macro_use]
mod macros;

pub mod constants;

mod attestation;
mod crypto;
mod internals;

pub mod core;
pub mod error;
pub mod interface;

/// Protocol bindings
pub mod proto {
    pub use passlock_proto::*;

    pub use crate::interface::*;
}

pub use crate::attestation::AttestationFormat;
pub use crate::core::*;
pub use crate::crypto::{compute_sha256, compute_sha384, compute_sha512};
pub use crate::internals::{AttestedCredentialData, AuthenticatorData};
