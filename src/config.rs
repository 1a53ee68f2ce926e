// src/config.rs
//! Server settings.
//!
//! Values are read, from lowest to highest precedence, from:
//! 1. Built-in defaults
//! 2. `uma.toml` in the working directory, or the file named by `UMA_CONFIG`
//! 3. `UMA__<SECTION>__<KEY>` environment variables, e.g. `UMA__SERVER__PORT`
//!
//! A `.env` file is loaded into the environment first.

use crate::error::{Result, UmaError};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "UMA";
/// Environment variable naming an explicit settings file.
pub const CONFIG_PATH_VAR: &str = "UMA_CONFIG";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub policy: PolicySettings,
    pub verifiers: VerifierSettings,
    pub tokens: TokenSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Public URL of the `/uma` prefix. Derived from host and port when unset.
    pub base_url: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 4000, base_url: None }
    }
}

impl ServerSettings {
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}/uma", self.host, self.port),
        }
    }
}

/// Which authorizer decides over requests.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    All,
    Namespaced,
    Rules,
    #[serde(rename = "none")]
    Deny,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PolicySettings {
    pub kind: PolicyKind,
    /// Resource prefixes for the namespaced authorizer.
    pub namespaces: Vec<String>,
    /// JSON rules file for the rules authorizer.
    pub rules_file: Option<PathBuf>,
    /// Wraps the authorizer so derived resources require upstream proofs.
    pub derivation: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self { kind: PolicyKind::Namespaced, namespaces: Vec::new(), rules_file: None, derivation: true }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct VerifierSettings {
    pub unsecure: bool,
    pub oidc: bool,
    /// OIDC providers accepted for any WebID. Others must be listed in the
    /// WebID profile.
    pub oidc_trusted_issuers: Vec<String>,
    pub access_token: bool,
    pub jwt: JwtVerifierSettings,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            unsecure: false,
            oidc: true,
            oidc_trusted_issuers: Vec::new(),
            access_token: true,
            jwt: JwtVerifierSettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct JwtVerifierSettings {
    pub enabled: bool,
    /// Claims copied into the claim set. Others are dropped or rejected.
    pub allowed_claims: Vec<String>,
    pub error_on_extra_claims: bool,
    /// Checks signatures against the issuer's key set.
    pub verify: bool,
}

impl Default for JwtVerifierSettings {
    fn default() -> Self {
        Self { enabled: false, allowed_claims: Vec::new(), error_on_extra_claims: false, verify: true }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TokenSettings {
    /// Hands out opaque identifiers instead of JWTs.
    pub opaque: bool,
    pub ttl_secs: i64,
    /// PEM file with the RSA signing key. A key is generated when unset.
    pub signing_key: Option<PathBuf>,
    pub key_id: String,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self { opaque: false, ttl_secs: 1800, signing_key: None, key_id: "uma-as".into() }
    }
}

impl Settings {
    /// Loads settings from `.env`, the settings file and the environment.
    ///
    /// # Errors
    /// `Config` if a source cannot be read or holds invalid values.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let file = std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
        Self::from_sources(file, ENV_PREFIX)
    }

    /// Merges an optional settings file with environment variables
    /// starting with `env_prefix`.
    ///
    /// Without an explicit `file`, `uma.toml` is read if present.
    pub fn from_sources(file: Option<PathBuf>, env_prefix: &str) -> Result<Self> {
        let file = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("uma").required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(env_prefix).separator("__").try_parsing(true))
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| UmaError::Config(e.to_string()))
    }
}
