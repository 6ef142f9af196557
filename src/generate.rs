//! Caller-side header generation.
//!
//! The generator builds the six-property JSON object, serializes it once,
//! and uses those same bytes both for the transmitted header and for the
//! verification hash, so the Issuer's normalizer recovers exactly what was
//! hashed.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use url::{form_urlencoded, Url};
use uuid::Uuid;

use crate::constants::*;
use crate::errors::*;
use crate::hash::compute_hash;
use crate::header::AuthHeader;
use crate::policy::{system_clock, Clock};

/// A ready-to-send header and the hash the Caller must publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAuth {
    /// `"HashBack " + base64(json)`, the `Authorization` value.
    pub auth_header: String,
    /// Content to serve at the Verify URL.
    pub verification_hash: String,
    /// Correlates the header with its Verify URL.
    pub verification_id: Uuid,
}

/// How a verification id becomes a Verify URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyUrlStrategy {
    /// `base?...&name=ID`.  Replaces the parameter's value when `base`
    /// already has it.
    QueryString { base: Url, name: String },
    /// `folder/ID.ext`.  `folder` always ends in `/` and has no query or
    /// fragment; `extension` always starts with `.`.
    FileInFolder { folder: Url, extension: String },
}

impl VerifyUrlStrategy {
    pub fn query_string(base_url: &str, name: impl Into<String>) -> Result<Self, HashBackError> {
        let name = name.into();
        if name.is_empty() {
            return Err(HashBackError::config("Query string parameter name is empty."));
        }
        Ok(VerifyUrlStrategy::QueryString {
            base: parse_base(base_url)?,
            name,
        })
    }

    pub fn file_in_folder(folder_url: &str, extension: &str) -> Result<Self, HashBackError> {
        let mut folder = parse_base(folder_url)?;
        folder.set_query(None);
        folder.set_fragment(None);
        if !folder.path().ends_with('/') {
            let path = format!("{}/", folder.path());
            folder.set_path(&path);
        }

        let extension = if extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{}", extension)
        };

        Ok(VerifyUrlStrategy::FileInFolder { folder, extension })
    }

    /// The Verify URL for `id`.
    pub fn verify_url(&self, id: &Uuid) -> Result<Url, HashBackError> {
        let id = id_text(id);
        match self {
            VerifyUrlStrategy::QueryString { base, name } => {
                let mut url = base.clone();
                // Existing parameters keep their original encoding.
                let mut placed = false;
                let segments: Vec<String> = url
                    .query()
                    .unwrap_or("")
                    .split('&')
                    .filter_map(|segment| {
                        if !names_param(segment, name) {
                            Some(segment.to_string())
                        } else if placed {
                            None
                        } else {
                            placed = true;
                            Some(
                                form_urlencoded::Serializer::new(String::new())
                                    .append_pair(name, &id)
                                    .finish(),
                            )
                        }
                    })
                    .collect();
                if placed {
                    url.set_query(Some(&segments.join("&")));
                } else {
                    url.query_pairs_mut().append_pair(name, &id);
                }
                Ok(url)
            }
            VerifyUrlStrategy::FileInFolder { folder, extension } => folder
                .join(&format!("{}{}", id, extension))
                .map_err(|e| HashBackError::config(format!("Cannot build Verify URL: {}", e))),
        }
    }
}

/// Whether one raw `key=value` query segment carries `name`.
fn names_param(segment: &str, name: &str) -> bool {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map_or(false, |(key, _)| key == name)
}

fn parse_base(raw: &str) -> Result<Url, HashBackError> {
    let url = Url::parse(raw)
        .map_err(|e| HashBackError::config(format!("Base URL \"{}\" is not valid: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(HashBackError::config(format!(
            "Base URL \"{}\" cannot hold a path.",
            raw
        )));
    }
    Ok(url)
}

/// Upper-case hyphenated form used in URLs.
fn id_text(id: &Uuid) -> String {
    id.hyphenated().to_string().to_ascii_uppercase()
}

/// 128 bits from the OS generator, standard padded base64.
fn new_unus() -> String {
    let mut bytes = [0u8; UNUS_LEN];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Builds HashBack headers for a Caller.
#[derive(Clone)]
pub struct Generator {
    host: Option<String>,
    clock: Clock,
    rounds: u32,
    verify: Option<VerifyUrlStrategy>,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("host", &self.host)
            .field("rounds", &self.rounds)
            .field("verify", &self.verify)
            .finish_non_exhaustive()
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// No host, system clock, one round, no Verify strategy.
    pub fn new() -> Self {
        Self {
            host: None,
            clock: system_clock(),
            rounds: DEFAULT_GENERATOR_ROUNDS,
            verify: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_verify(mut self, strategy: VerifyUrlStrategy) -> Self {
        self.verify = Some(strategy);
        self
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn verify_strategy(&self) -> Option<&VerifyUrlStrategy> {
        self.verify.as_ref()
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn set_rounds(&mut self, rounds: u32) {
        self.rounds = rounds;
    }

    pub fn set_verify_strategy(&mut self, strategy: VerifyUrlStrategy) {
        self.verify = Some(strategy);
    }

    pub fn set_verify_by_query_string(
        &mut self,
        base_url: &str,
        name: &str,
    ) -> Result<(), HashBackError> {
        self.verify = Some(VerifyUrlStrategy::query_string(base_url, name)?);
        Ok(())
    }

    pub fn set_verify_by_file_in_folder(
        &mut self,
        folder_url: &str,
        extension: &str,
    ) -> Result<(), HashBackError> {
        self.verify = Some(VerifyUrlStrategy::file_in_folder(folder_url, extension)?);
        Ok(())
    }

    /// Random id, configured host.
    pub fn generate(&self) -> Result<GeneratedAuth, HashBackError> {
        self.generate_with_id(Uuid::new_v4())
    }

    /// Supplied id, configured host.
    pub fn generate_with_id(&self, id: Uuid) -> Result<GeneratedAuth, HashBackError> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| HashBackError::config("Generator has no Host configured."))?;
        self.generate_with_id_for_host(id, host)
    }

    /// Random id, supplied host.
    pub fn generate_for_host(&self, host: &str) -> Result<GeneratedAuth, HashBackError> {
        self.generate_with_id_for_host(Uuid::new_v4(), host)
    }

    pub fn generate_with_id_for_host(
        &self,
        id: Uuid,
        host: &str,
    ) -> Result<GeneratedAuth, HashBackError> {
        if self.rounds == 0 {
            return Err(HashBackError::config("Rounds must be at least 1."));
        }
        let strategy = self
            .verify
            .as_ref()
            .ok_or_else(|| HashBackError::config("Generator has no Verify URL strategy."))?;

        let header = AuthHeader {
            version: VERSION.to_string(),
            host: host.to_string(),
            now: (self.clock)(),
            unus: new_unus(),
            rounds: self.rounds,
            verify: strategy.verify_url(&id)?.to_string(),
        };
        let bytes = header
            .to_bytes()
            .map_err(|e| HashBackError::new(ERR_ENCODING, format!("Cannot serialize header: {}", e)))?;

        let auth_header = format!("{} {}", SCHEME, STANDARD.encode(&bytes));
        let verification_hash = compute_hash(&bytes, self.rounds);

        debug!(id = %id, verify = %header.verify, "generated hashback header");
        Ok(GeneratedAuth {
            auth_header,
            verification_hash,
            verification_id: id,
        })
    }
}
