//! Verification hash.
//!
//! HASH = base64(PBKDF2-HMAC-SHA256(header_bytes, FIXED_SALT, rounds, 32))
//!
//! The Issuer computes this over the header it received; the Caller computes
//! it over the header it sent and publishes it at the Verify URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::constants::{FIXED_SALT, HASH_LEN};

/// Compute the padded standard-base64 verification hash of `header_bytes`.
///
/// Deterministic: identical bytes and rounds always give the same digest.
/// `rounds` should be at least 1; the parser never passes anything else.
pub fn compute_hash(header_bytes: &[u8], rounds: u32) -> String {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(header_bytes, &FIXED_SALT, rounds, &mut out);
    STANDARD.encode(out)
}
