//! JSON configuration documents for an Issuer's parser and a Caller's
//! generator.
//!
//! ```json
//! { "host": "server.example", "clock_skew_seconds": 9,
//!   "min_rounds": 1, "max_rounds": 99, "accept_any_verify": false }
//! ```
//!
//! ```json
//! { "host": "server.example", "rounds": 1,
//!   "verify": { "type": "query_string",
//!               "base_url": "https://client.example/hashback", "name": "id" } }
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::*;
use crate::generate::{Generator, VerifyUrlStrategy};
use crate::parse::Parser;
use crate::policy::{system_clock, HostPolicy, NowPolicy, Policies, RoundsPolicy, VerifyPolicy};

fn default_skew() -> u32 {
    DEFAULT_CLOCK_SKEW_SECONDS
}

fn default_min_rounds() -> i64 {
    DEFAULT_MIN_ROUNDS
}

fn default_max_rounds() -> i64 {
    DEFAULT_MAX_ROUNDS
}

fn default_generator_rounds() -> u32 {
    DEFAULT_GENERATOR_ROUNDS
}

/// Issuer settings.  Anything not covered here (a Verify allow-list, say)
/// is set on the resulting parser with a custom policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuerConfig {
    /// The Host value this Issuer answers to.  Absent means every header
    /// is rejected on Host.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_skew")]
    pub clock_skew_seconds: u32,
    #[serde(default = "default_min_rounds")]
    pub min_rounds: i64,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: i64,
    /// Accept every syntactically valid Verify URL.
    #[serde(default)]
    pub accept_any_verify: bool,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            host: None,
            clock_skew_seconds: DEFAULT_CLOCK_SKEW_SECONDS,
            min_rounds: DEFAULT_MIN_ROUNDS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            accept_any_verify: false,
        }
    }
}

impl IssuerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, HashBackError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| HashBackError::config(format!("Issuer config is invalid: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HashBackError> {
        if self.min_rounds > self.max_rounds {
            return Err(HashBackError::config(format!(
                "min_rounds {} exceeds max_rounds {}.",
                self.min_rounds, self.max_rounds
            )));
        }
        Ok(())
    }

    pub fn policies(&self) -> Policies {
        Policies {
            host: match &self.host {
                Some(host) => HostPolicy::required(host.clone()),
                None => HostPolicy::reject_all(),
            },
            now: NowPolicy::within_skew(system_clock(), self.clock_skew_seconds),
            rounds: RoundsPolicy::range(self.min_rounds, self.max_rounds),
            verify: if self.accept_any_verify {
                VerifyPolicy::accept_all()
            } else {
                VerifyPolicy::reject_all()
            },
        }
    }

    /// A parser with its own Unus tracker.
    pub fn build_parser(&self) -> Result<Parser, HashBackError> {
        self.validate()?;
        Ok(Parser::with_policies(self.policies()))
    }
}

/// Where the Caller publishes verification hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerifyConfig {
    QueryString { base_url: String, name: String },
    FileInFolder { folder_url: String, extension: String },
}

impl VerifyConfig {
    pub fn strategy(&self) -> Result<VerifyUrlStrategy, HashBackError> {
        match self {
            VerifyConfig::QueryString { base_url, name } => {
                VerifyUrlStrategy::query_string(base_url, name.clone())
            }
            VerifyConfig::FileInFolder {
                folder_url,
                extension,
            } => VerifyUrlStrategy::file_in_folder(folder_url, extension),
        }
    }
}

/// Caller settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallerConfig {
    /// Default Host for generated headers.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_generator_rounds")]
    pub rounds: u32,
    pub verify: VerifyConfig,
}

impl CallerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, HashBackError> {
        serde_json::from_str(text)
            .map_err(|e| HashBackError::config(format!("Caller config is invalid: {}", e)))
    }

    pub fn build_generator(&self) -> Result<Generator, HashBackError> {
        if self.rounds == 0 {
            return Err(HashBackError::config("rounds must be at least 1."));
        }
        let mut generator = Generator::new()
            .with_rounds(self.rounds)
            .with_verify(self.verify.strategy()?);
        if let Some(host) = &self.host {
            generator.set_host(host.clone());
        }
        Ok(generator)
    }
}
