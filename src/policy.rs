//! Per-field validation policies injected into the parser.
//!
//! Each policy is a pure function of the supplied value (plus whatever
//! configuration it captured) returning `Ok(())` or the error text to
//! report.  Swapping policies changes who the Issuer trusts without touching
//! the parsing logic.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::constants::*;

/// Source of "now" in Unix seconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// The machine clock.
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp())
}

/// A clock stuck at `now`.
pub fn fixed_clock(now: i64) -> Clock {
    Arc::new(move || now)
}

/// Decides whether the `Host` property names this Issuer.
#[derive(Clone)]
pub struct HostPolicy(Arc<dyn Fn(&str) -> Result<(), String> + Send + Sync>);

impl HostPolicy {
    /// Wrap an arbitrary check.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: &str) -> Result<(), String> {
        (self.0)(value)
    }

    /// Rejects everything.  An Issuer must say who it is before it accepts.
    pub fn reject_all() -> Self {
        Self::from_fn(|_| Err("Host property is not valid.".to_string()))
    }

    pub fn accept_all() -> Self {
        Self::from_fn(|_| Ok(()))
    }

    /// Accept exactly `host` (case-sensitive).
    pub fn required(host: impl Into<String>) -> Self {
        let host = host.into();
        Self::from_fn(move |supplied| {
            if supplied == host {
                Ok(())
            } else {
                Err(format!("Host property must be \"{}\".", host))
            }
        })
    }
}

impl fmt::Debug for HostPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostPolicy")
    }
}

/// Decides whether the `Now` timestamp is fresh enough.
#[derive(Clone)]
pub struct NowPolicy(Arc<dyn Fn(i64) -> Result<(), String> + Send + Sync>);

impl NowPolicy {
    /// Wrap an arbitrary check.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(i64) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: i64) -> Result<(), String> {
        (self.0)(value)
    }

    /// Accept timestamps within `[clock() - skew, clock() + skew]`.
    /// The clock is read once per check.
    pub fn within_skew(clock: Clock, skew_seconds: u32) -> Self {
        let skew = i64::from(skew_seconds);
        Self::from_fn(move |supplied| {
            let actual = clock();
            if supplied < actual.saturating_sub(skew) {
                return Err("Supplied Now property is too far in the past.".to_string());
            }
            if supplied > actual.saturating_add(skew) {
                return Err("Supplied Now property is too far in the future.".to_string());
            }
            Ok(())
        })
    }
}

impl fmt::Debug for NowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NowPolicy")
    }
}

impl Default for NowPolicy {
    fn default() -> Self {
        Self::within_skew(system_clock(), DEFAULT_CLOCK_SKEW_SECONDS)
    }
}

/// Decides whether the `Rounds` iteration count is acceptable.
#[derive(Clone)]
pub struct RoundsPolicy(Arc<dyn Fn(i64) -> Result<(), String> + Send + Sync>);

impl RoundsPolicy {
    /// Wrap an arbitrary check.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(i64) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: i64) -> Result<(), String> {
        (self.0)(value)
    }

    /// Accept `min..=max`.
    pub fn range(min: i64, max: i64) -> Self {
        let too = move |what: &str| {
            format!("Rounds property is too {}. Valid range: {}-{}.", what, min, max)
        };
        Self::from_fn(move |supplied| {
            if supplied < min {
                Err(too("small"))
            } else if supplied > max {
                Err(too("large"))
            } else {
                Ok(())
            }
        })
    }
}

impl fmt::Debug for RoundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RoundsPolicy")
    }
}

impl Default for RoundsPolicy {
    fn default() -> Self {
        Self::range(DEFAULT_MIN_ROUNDS, DEFAULT_MAX_ROUNDS)
    }
}

/// Decides whether the Issuer is willing to fetch the `Verify` URL.
#[derive(Clone)]
pub struct VerifyPolicy(Arc<dyn Fn(&Url) -> Result<(), String> + Send + Sync>);

impl VerifyPolicy {
    /// Wrap an arbitrary check.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Url) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: &Url) -> Result<(), String> {
        (self.0)(value)
    }

    /// Rejects everything.  An Issuer must decide which URLs it will fetch.
    pub fn reject_all() -> Self {
        Self::from_fn(|_| Err("Verify property is not valid.".to_string()))
    }

    pub fn accept_all() -> Self {
        Self::from_fn(|_| Ok(()))
    }
}

impl fmt::Debug for VerifyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerifyPolicy")
    }
}

/// The four field policies consulted by the parser, in check order.
#[derive(Debug, Clone)]
pub struct Policies {
    pub host: HostPolicy,
    pub now: NowPolicy,
    pub rounds: RoundsPolicy,
    pub verify: VerifyPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            host: HostPolicy::reject_all(),
            now: NowPolicy::default(),
            rounds: RoundsPolicy::default(),
            verify: VerifyPolicy::reject_all(),
        }
    }
}
