//! Issuer-side header parser.
//!
//! Single pass, first failure wins:
//!
//!   1. reject empty input
//!   2. normalize encoding (scheme token, literal JSON or flexible base64)
//!   3. parse a JSON object
//!   4. `Version` present and equal to the supported draft
//!   5. `Host` present, then the host policy
//!   6. `Now` present, then the clock policy
//!   7. `Unus` present and 16 bytes, then the replay check
//!   8. `Rounds` present, then the rounds policy
//!   9. `Verify` present and a URL, then the verify policy
//!  10. expected hash over the canonical bytes
//!
//! Each property is extracted and judged before the next one is looked at.
//!
//! The order is observable through the reported error and must not change.

use std::sync::Arc;

use base64::Engine;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::constants::{UNUS_LEN, VERSION};
use crate::encoding::{normalize_header, LENIENT_STANDARD};
use crate::errors::*;
use crate::hash::compute_hash;
use crate::policy::*;
use crate::unus::UnusTracker;

/// Terminal outcome of parsing one header.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// Rejected.  A retry needs a fresh header, not a resubmission.
    NotValid(HashBackError),
    /// Structurally valid and accepted by every policy.  The Issuer must
    /// now fetch `verify_url` and compare its content to `expected_hash`.
    NeedsVerification {
        verify_url: Url,
        expected_hash: String,
    },
}

impl ParseResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParseResult::NeedsVerification { .. })
    }

    pub fn error(&self) -> Option<&HashBackError> {
        match self {
            ParseResult::NotValid(err) => Some(err),
            ParseResult::NeedsVerification { .. } => None,
        }
    }

    /// Human-readable rejection text, if rejected.
    pub fn error_text(&self) -> Option<&str> {
        self.error().map(|e| e.message.as_str())
    }

    pub fn verify_url(&self) -> Option<&Url> {
        match self {
            ParseResult::NeedsVerification { verify_url, .. } => Some(verify_url),
            ParseResult::NotValid(_) => None,
        }
    }

    pub fn expected_hash(&self) -> Option<&str> {
        match self {
            ParseResult::NeedsVerification { expected_hash, .. } => Some(expected_hash.as_str()),
            ParseResult::NotValid(_) => None,
        }
    }
}

/// Parse and validate `raw` against `policies`, recording its Unus in
/// `unus`.
pub fn parse_auth_header(raw: &str, policies: &Policies, unus: &UnusTracker) -> ParseResult {
    match check_header(raw, policies, unus) {
        Ok((verify_url, expected_hash)) => {
            debug!(verify = %verify_url, "hashback header needs verification");
            ParseResult::NeedsVerification {
                verify_url,
                expected_hash,
            }
        }
        Err(err) => {
            if err.code == ERR_REPLAY {
                warn!(code = err.code, "hashback header rejected: {}", err.message);
            } else {
                debug!(code = err.code, "hashback header rejected: {}", err.message);
            }
            ParseResult::NotValid(err)
        }
    }
}

fn check_header(
    raw: &str,
    policies: &Policies,
    tracker: &UnusTracker,
) -> Result<(Url, String), HashBackError> {
    if raw.trim().is_empty() {
        return Err(HashBackError::new(ERR_MALFORMED, "Header is missing."));
    }

    let header = normalize_header(raw)?;

    let json: Value = serde_json::from_str(&header.json).map_err(|e| {
        HashBackError::new(ERR_SYNTAX, format!("Supplied JSON is invalid. {}", e))
    })?;
    let obj = json
        .as_object()
        .ok_or_else(|| HashBackError::new(ERR_SYNTAX, "Supplied JSON is not an object."))?;

    let version = required_str(obj, "Version")?;
    if version != VERSION {
        return Err(HashBackError::new(
            ERR_VERSION,
            format!("Only Version={} is supported.", VERSION),
        ));
    }

    let host = required_str(obj, "Host")?;
    policies.host.check(host).map_err(rejected)?;

    let now = required_int(obj, "Now")?;
    policies.now.check(now).map_err(rejected)?;

    // Recorded here, so a header failing a later check still spends it.
    let unus = decode_unus(required_str(obj, "Unus")?)
        .ok_or_else(|| HashBackError::new(ERR_SCHEMA, "Unus property is not valid."))?;
    if tracker.is_reused(&unus) {
        return Err(HashBackError::new(ERR_REPLAY, "Unus property has been reused."));
    }

    let rounds = required_int(obj, "Rounds")?;
    policies.rounds.check(rounds).map_err(rejected)?;
    // A custom policy may accept counts PBKDF2 cannot run.
    let rounds = u32::try_from(rounds)
        .ok()
        .filter(|&r| r > 0)
        .ok_or_else(|| HashBackError::new(ERR_SCHEMA, "Rounds property is not valid."))?;

    let verify = Url::parse(required_str(obj, "Verify")?).map_err(|_| {
        HashBackError::new(ERR_SCHEMA, "Verify property is not a valid URL.")
    })?;
    policies.verify.check(&verify).map_err(rejected)?;

    let expected_hash = compute_hash(&header.bytes, rounds);
    Ok((verify, expected_hash))
}

fn required_str<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a str, HashBackError> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(HashBackError::missing(name)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(HashBackError::new(
            ERR_SCHEMA,
            format!("{} property must be a string.", name),
        )),
    }
}

fn required_int(obj: &Map<String, Value>, name: &str) -> Result<i64, HashBackError> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(HashBackError::missing(name)),
        Some(v) => v.as_i64().ok_or_else(|| {
            HashBackError::new(ERR_SCHEMA, format!("{} property must be an integer.", name))
        }),
    }
}

/// Standard padded base64 of exactly `UNUS_LEN` bytes.
fn decode_unus(unus: &str) -> Option<Vec<u8>> {
    LENIENT_STANDARD
        .decode(unus)
        .ok()
        .filter(|bytes| bytes.len() == UNUS_LEN)
}

fn rejected(message: String) -> HashBackError {
    HashBackError::new(ERR_POLICY, message)
}

// ── Parser ───────────────────────────────────────────────────

/// An Issuer's parser: a set of policies plus the Unus tracker that
/// remembers what this Issuer has already accepted.
///
/// Cloning a parser shares its tracker.  Build parsers with separate
/// trackers for independent Issuers.
#[derive(Debug, Clone)]
pub struct Parser {
    policies: Policies,
    unus: Arc<UnusTracker>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Default policies: every Host and Verify URL rejected until
    /// configured, system clock with 9 seconds of skew, 1-99 rounds.
    pub fn new() -> Self {
        Self::with_policies(Policies::default())
    }

    pub fn with_policies(policies: Policies) -> Self {
        Self::with_tracker(policies, Arc::new(UnusTracker::new()))
    }

    pub fn with_tracker(policies: Policies, unus: Arc<UnusTracker>) -> Self {
        Self { policies, unus }
    }

    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    pub fn policies_mut(&mut self) -> &mut Policies {
        &mut self.policies
    }

    pub fn tracker(&self) -> &Arc<UnusTracker> {
        &self.unus
    }

    /// Accept only headers naming `host`.
    pub fn set_required_host(&mut self, host: impl Into<String>) {
        self.policies.host = HostPolicy::required(host);
    }

    pub fn set_host_policy(&mut self, policy: HostPolicy) {
        self.policies.host = policy;
    }

    /// Check `Now` against `clock` allowing `skew_seconds` either way.
    pub fn set_clock(&mut self, clock: Clock, skew_seconds: u32) {
        self.policies.now = NowPolicy::within_skew(clock, skew_seconds);
    }

    pub fn set_now_policy(&mut self, policy: NowPolicy) {
        self.policies.now = policy;
    }

    pub fn set_rounds_limit(&mut self, min: i64, max: i64) {
        self.policies.rounds = RoundsPolicy::range(min, max);
    }

    pub fn set_rounds_policy(&mut self, policy: RoundsPolicy) {
        self.policies.rounds = policy;
    }

    pub fn set_verify_policy(&mut self, policy: VerifyPolicy) {
        self.policies.verify = policy;
    }

    pub fn parse(&self, raw: &str) -> ParseResult {
        parse_auth_header(raw, &self.policies, &self.unus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_parser() -> Parser {
        let mut p = Parser::new();
        p.set_host_policy(HostPolicy::accept_all());
        p.set_now_policy(NowPolicy::from_fn(|_| Ok(())));
        p.set_verify_policy(VerifyPolicy::accept_all());
        p
    }

    fn header(now: &str, rounds: &str) -> String {
        format!(
            r#"{{"Version":"{}","Host":"h","Now":{},"Unus":"RutabagaRutabagaRutaba==","Rounds":{},"Verify":"https://v.example/"}}"#,
            VERSION, now, rounds
        )
    }

    #[test]
    fn empty_and_blank_are_malformed() {
        let p = open_parser();
        for raw in ["", "   \r\n"] {
            let r = p.parse(raw);
            assert_eq!(r.error().unwrap().code, ERR_MALFORMED);
            assert_eq!(r.error_text(), Some("Header is missing."));
        }
    }

    #[test]
    fn json_array_is_not_an_object() {
        let r = open_parser().parse("[{}]");
        assert_eq!(r.error_text(), Some("Supplied JSON is not an object."));
    }

    #[test]
    fn broken_json_is_syntax_error() {
        let r = open_parser().parse(r#"{"Version":"#);
        let err = r.error().unwrap();
        assert_eq!(err.code, ERR_SYNTAX);
        assert!(err.message.starts_with("Supplied JSON is invalid."));
    }

    #[test]
    fn float_now_is_schema_error() {
        let r = open_parser().parse(&header("1.5", "1"));
        assert_eq!(r.error_text(), Some("Now property must be an integer."));
    }

    #[test]
    fn string_rounds_is_schema_error() {
        let r = open_parser().parse(&header("1", "\"1\""));
        assert_eq!(r.error_text(), Some("Rounds property must be an integer."));
    }

    #[test]
    fn zero_rounds_accepted_by_policy_still_rejected() {
        let mut p = open_parser();
        p.set_rounds_policy(RoundsPolicy::from_fn(|_| Ok(())));
        let r = p.parse(&header("1", "0"));
        assert_eq!(r.error_text(), Some("Rounds property is not valid."));
    }

    #[test]
    fn accepted_header_exposes_url_and_hash() {
        let raw = header("1", "1");
        let r = open_parser().parse(&raw);
        assert!(r.is_valid());
        assert_eq!(r.verify_url().unwrap().as_str(), "https://v.example/");
        assert_eq!(r.expected_hash(), Some(compute_hash(raw.as_bytes(), 1).as_str()));
        assert!(r.error().is_none());
    }

    #[test]
    fn unus_is_spent_when_a_later_property_is_missing() {
        let p = open_parser();
        let without_rounds = header("1", "1").replace(r#""Rounds":1,"#, "");
        assert_eq!(p.parse(&without_rounds).error_text(), Some("Rounds property is missing."));
        assert_eq!(
            p.parse(&header("1", "1")).error_text(),
            Some("Unus property has been reused.")
        );
    }

    #[test]
    fn unus_is_spent_when_verify_is_rejected() {
        let mut p = open_parser();
        p.set_verify_policy(VerifyPolicy::reject_all());
        assert_eq!(p.parse(&header("1", "1")).error_text(), Some("Verify property is not valid."));
        p.set_verify_policy(VerifyPolicy::accept_all());
        assert_eq!(p.parse(&header("1", "1")).error().unwrap().code, ERR_REPLAY);
    }

    #[test]
    fn clones_share_the_tracker() {
        let a = open_parser();
        let b = a.clone();
        assert!(a.parse(&header("1", "1")).is_valid());
        assert_eq!(b.parse(&header("1", "1")).error().unwrap().code, ERR_REPLAY);
    }
}
