//! HashBack error codes and error type.
//!
//! Every rejection is a terminal, non-retryable verdict on one specific
//! header.  The `code` groups failures by kind so callers can branch on it;
//! the `message` is the human-readable text conformance tests compare.

use std::fmt;

// ── Error codes ──────────────────────────────────────────────

/// Empty or missing header.
pub const ERR_MALFORMED: &str = "ERR_MALFORMED";
/// Payload could not be base64-decoded after normalization.
pub const ERR_DECODE: &str = "ERR_DECODE";
/// Payload bytes are not in the expected text encoding.
pub const ERR_ENCODING: &str = "ERR_ENCODING";
/// Payload is not a JSON object.
pub const ERR_SYNTAX: &str = "ERR_SYNTAX";
/// A required property is absent or not well-formed.
pub const ERR_SCHEMA: &str = "ERR_SCHEMA";
/// `Version` is not the supported draft.
pub const ERR_VERSION: &str = "ERR_VERSION";
/// A host, clock, rounds or verify policy rejected the value.
pub const ERR_POLICY: &str = "ERR_POLICY";
/// The Unus has been seen before within the tracker window.
pub const ERR_REPLAY: &str = "ERR_REPLAY";
/// Caller-side or Issuer-side configuration is unusable.
pub const ERR_CONFIG: &str = "ERR_CONFIG";

/// HashBack processing error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashBackError {
    pub code: &'static str,
    pub message: String,
}

impl HashBackError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `"<Field> property is missing."`
    pub(crate) fn missing(field: &str) -> Self {
        Self::new(ERR_SCHEMA, format!("{} property is missing.", field))
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::new(ERR_CONFIG, message)
    }
}

impl fmt::Display for HashBackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for HashBackError {}
