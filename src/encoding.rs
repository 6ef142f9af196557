//! Header encoding normalizer.
//!
//! A Caller may send the header as literal JSON, standard base64, or
//! JWT-flavoured base64 with or without `=` padding, optionally behind a
//! `HashBack` scheme token.  Whatever the presentation, the hash is computed
//! over one canonical byte sequence, so this module recovers exactly the
//! bytes the Caller hashed.
//!
//! Rules:
//!   1. If the first whitespace-separated token is `HashBack` (any case) and
//!      at least one more token follows, drop it and join the remaining
//!      tokens with no separator.
//!   2. Text containing `{` is literal JSON; its bytes are used as-is and
//!      must be ASCII.
//!   3. Anything else is flexible base64 (see [`flex_base64_decode`]) whose
//!      decoded bytes must be UTF-8.

use std::borrow::Cow;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::constants::SCHEME;
use crate::errors::*;

/// Standard alphabet, canonical padding required, non-zero trailing bits
/// tolerated (other platforms' decoders accept them).
pub(crate) const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Canonical header bytes plus the JSON text they spell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedHeader {
    /// The bytes the verification hash is computed over.
    pub bytes: Vec<u8>,
    /// The same bytes as text, ready for JSON parsing.
    pub json: String,
}

/// Strip the optional scheme token and decode the payload.
pub fn normalize_header(raw: &str) -> Result<NormalizedHeader, HashBackError> {
    let payload = strip_scheme(raw);

    if payload.contains('{') {
        if !payload.is_ascii() {
            return Err(HashBackError::new(ERR_ENCODING, "Header JSON must be ASCII."));
        }
        let json = payload.into_owned();
        return Ok(NormalizedHeader {
            bytes: json.as_bytes().to_vec(),
            json,
        });
    }

    let bytes = flex_base64_decode(&payload)?;
    let json = std::str::from_utf8(&bytes)
        .map_err(|_| HashBackError::new(ERR_ENCODING, "Header is not valid UTF-8."))?
        .to_owned();
    Ok(NormalizedHeader { bytes, json })
}

fn strip_scheme(raw: &str) -> Cow<'_, str> {
    let mut tokens = raw.split_whitespace();
    match tokens.next() {
        Some(first) if first.eq_ignore_ascii_case(SCHEME) => {
            let rest: String = tokens.collect();
            if rest.is_empty() {
                Cow::Borrowed(raw)
            } else {
                Cow::Owned(rest)
            }
        }
        _ => Cow::Borrowed(raw),
    }
}

/// Decode base64 leniently: whitespace anywhere and trailing `=` are
/// dropped, the JWT alphabet (`-`, `_`) is mapped back to the standard one,
/// and padding is restored before a standard decode.
///
/// Empty input decodes to an empty vector.
pub fn flex_base64_decode(text: &str) -> Result<Vec<u8>, HashBackError> {
    let mut cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let unpadded = cleaned.trim_end_matches('=').len();
    cleaned.truncate(unpadded);
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    let padding = (4 - cleaned.len() % 4) % 4;
    cleaned.extend(std::iter::repeat('=').take(padding));

    LENIENT_STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|_| HashBackError::new(ERR_DECODE, "Header is not valid base64."))
}
