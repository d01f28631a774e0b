//! Default tunables for ceremony generation.

/// The default length of a ceremony challenge, in bytes.
pub const CHALLENGE_SIZE_BYTES: usize = 32;

/// The smallest challenge length a configuration may request.
pub const CHALLENGE_SIZE_BYTES_MIN: usize = 16;

/// The largest challenge length a configuration may request.
pub const CHALLENGE_SIZE_BYTES_MAX: usize = 64;

/// The length of a generated Webauthn user handle, in bytes. The standard
/// allows 16 to 64; handles this library creates are always this size.
pub const WEBAUTHN_USER_ID_SIZE_BYTES: usize = 32;

/// The default client-side operation timeout, in milliseconds.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u32 = 60_000;

/// The smallest operation timeout a configuration may request.
pub const MIN_OPERATION_TIMEOUT_MS: u32 = 10_000;
