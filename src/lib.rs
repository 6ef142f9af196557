//! # hashback: HashBack draft 4.0 authentication
//!
//! A Caller proves it controls a URL by sending a header the Issuer can
//! hash, then publishing that same hash at the URL named in the header.
//!
//! ```no_run
//! use hashback::{Generator, Parser, VerifyPolicy};
//!
//! // Caller
//! let mut gen = Generator::new().with_host("server.example");
//! gen.set_verify_by_query_string("https://client.example/hashback", "id").unwrap();
//! let auth = gen.generate().unwrap();
//! // ... publish auth.verification_hash at the Verify URL, send auth.auth_header ...
//!
//! // Issuer
//! let mut parser = Parser::new();
//! parser.set_required_host("server.example");
//! parser.set_verify_policy(VerifyPolicy::accept_all());
//! let result = parser.parse(&auth.auth_header);
//! // ... fetch result.verify_url(), compare to result.expected_hash() ...
//! ```
//!
//! Fetching the Verify URL is left to the Issuer's own HTTP stack; this
//! crate performs no I/O.  Replay state lives in memory for as long as the
//! parser's [`UnusTracker`] does.

pub mod config;
pub mod constants;
pub mod encoding;
pub mod errors;
pub mod generate;
pub mod hash;
pub mod header;
pub mod parse;
pub mod policy;
pub mod unus;

pub use config::{CallerConfig, IssuerConfig, VerifyConfig};
pub use constants::{SCHEME, VERSION};
pub use encoding::{flex_base64_decode, normalize_header, NormalizedHeader};
pub use errors::{HashBackError, ERR_CONFIG, ERR_DECODE, ERR_ENCODING, ERR_MALFORMED,
                 ERR_POLICY, ERR_REPLAY, ERR_SCHEMA, ERR_SYNTAX, ERR_VERSION};
pub use generate::{GeneratedAuth, Generator, VerifyUrlStrategy};
pub use hash::compute_hash;
pub use header::AuthHeader;
pub use parse::{parse_auth_header, ParseResult, Parser};
pub use policy::{fixed_clock, system_clock, Clock, HostPolicy, NowPolicy, Policies,
                 RoundsPolicy, VerifyPolicy};
pub use unus::{fold_unus, UnusTracker};
