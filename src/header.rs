//! Wire form of the HashBack authentication header.
//!
//! Six properties, all required.  Serialization is compact JSON with the
//! properties in declaration order, UTF-8 encoded; those exact bytes are what
//! gets base64-encoded onto the wire and hashed.

use serde::{Deserialize, Serialize};

/// The JSON object carried in a HashBack header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthHeader {
    /// Protocol draft, always [`crate::constants::VERSION`] when generated.
    pub version: String,
    /// The Issuer this header is addressed to.
    pub host: String,
    /// Unix seconds at generation.
    pub now: i64,
    /// Base64 of 16 random bytes, single use.
    pub unus: String,
    /// PBKDF2 iteration count.
    pub rounds: u32,
    /// Where the Caller will publish the verification hash.
    pub verify: String,
}

impl AuthHeader {
    /// Canonical bytes: compact JSON, UTF-8.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
