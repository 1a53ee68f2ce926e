// src/utils/jwks.rs
//! JSON Web Key sets and the remote lookups that produce them.
//!
//! Three discovery conventions are in use:
//! - `<iss>/.well-known/jwks.json` for generic JWT issuers
//! - `<iss>/.well-known/openid-configuration` → `jwks_uri` for OIDC providers
//! - `<iss>/keys` for UMA authorization servers
//!
//! The same fetcher also retrieves WebID profiles.

use crate::error::{Result, UmaError};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Header};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use url::Url;

/// One public key, RSA or symmetric.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// RSA modulus, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// Symmetric key material, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl Jwk {
    /// A public RSA signing key.
    pub fn rsa(kid: impl Into<String>, n: impl Into<String>, e: impl Into<String>) -> Self {
        Jwk {
            kty: "RSA".into(),
            kid: Some(kid.into()),
            alg: Some("RS256".into()),
            key_use: Some("sig".into()),
            n: Some(n.into()),
            e: Some(e.into()),
            k: None,
        }
    }

    /// Whether this key can check signatures made with `algorithm`.
    pub fn supports(&self, algorithm: Algorithm) -> bool {
        let family_ok = match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => self.kty == "RSA",
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => self.kty == "oct",
            _ => false,
        };
        let alg_ok = match &self.alg {
            Some(alg) => Algorithm::from_str(alg).map(|a| a == algorithm).unwrap_or(false),
            None => true,
        };
        let use_ok = self.key_use.as_deref().map(|u| u == "sig").unwrap_or(true);
        family_ok && alg_ok && use_ok
    }

    /// Converts the key for use with `jsonwebtoken`.
    ///
    /// # Errors
    /// `InvalidCredential` when the key type is unsupported or its
    /// parameters are missing or malformed.
    pub fn decoding_key(&self) -> Result<DecodingKey> {
        match self.kty.as_str() {
            "RSA" => {
                let (n, e) = self.n.as_deref().zip(self.e.as_deref()).ok_or_else(|| {
                    UmaError::invalid_credential("RSA key is missing 'n' or 'e'.")
                })?;
                DecodingKey::from_rsa_components(n, e).map_err(UmaError::invalid_credential)
            }
            "oct" => {
                let k = self
                    .k
                    .as_deref()
                    .ok_or_else(|| UmaError::invalid_credential("Symmetric key is missing 'k'."))?;
                let secret = base64::decode_config(k, base64::URL_SAFE_NO_PAD)
                    .map_err(UmaError::invalid_credential)?;
                Ok(DecodingKey::from_secret(&secret))
            }
            other => Err(UmaError::invalid_credential(format!("Unsupported key type '{}'.", other))),
        }
    }
}

/// A `{"keys": [...]}` document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Finds the key matching `kid` (when given) that supports `algorithm`.
    pub fn find(&self, kid: Option<&str>, algorithm: Algorithm) -> Option<&Jwk> {
        self.keys
            .iter()
            .filter(|key| kid.map_or(true, |kid| key.kid.as_deref() == Some(kid)))
            .find(|key| key.supports(algorithm))
    }

    /// Resolves the decoding key for a token header.
    ///
    /// # Errors
    /// `InvalidCredential` if no key in the set matches.
    pub fn key_for(&self, header: &Header) -> Result<DecodingKey> {
        self.find(header.kid.as_deref(), header.alg)
            .ok_or_else(|| {
                UmaError::invalid_credential(format!(
                    "No key found for kid '{}' and alg '{:?}'.",
                    header.kid.as_deref().unwrap_or(""),
                    header.alg
                ))
            })?
            .decoding_key()
    }
}

/// Retrieves JSON documents from remote servers.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch_json(&self, url: &Url) -> Result<Value>;
}

/// Fetches documents over HTTP.
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl KeySetFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &Url) -> Result<Value> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/ld+json, application/json;q=0.9")
            .send()
            .await
            .map_err(|e| UmaError::Fetch(format!("{}: {}", url, e)))?;

        let response = response
            .error_for_status()
            .map_err(|e| UmaError::Fetch(format!("{}: {}", url, e)))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| UmaError::Fetch(format!("{}: invalid JSON: {}", url, e)))
    }
}

/// Serves pinned documents, keyed by URL.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    documents: HashMap<String, Value>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, document: Value) -> Self {
        self.documents.insert(url.into(), document);
        self
    }
}

#[async_trait]
impl KeySetFetcher for StaticFetcher {
    async fn fetch_json(&self, url: &Url) -> Result<Value> {
        self.documents
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| UmaError::Fetch(format!("{}: no pinned document", url)))
    }
}

/// Locates and downloads issuers' key sets.
#[derive(Clone)]
pub struct KeySetResolver {
    fetcher: Arc<dyn KeySetFetcher>,
}

impl KeySetResolver {
    pub fn new(fetcher: Arc<dyn KeySetFetcher>) -> Self {
        Self { fetcher }
    }

    /// Resolver backed by [`HttpFetcher`].
    pub fn http() -> Self {
        Self::new(Arc::new(HttpFetcher::new()))
    }

    /// Key set at `<issuer>/.well-known/jwks.json`.
    pub async fn well_known_key_set(&self, issuer: &str) -> Result<JwkSet> {
        let url = parse_url(&format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/')))?;
        self.key_set(&url).await
    }

    /// Key set referenced by the issuer's OpenID configuration.
    pub async fn openid_key_set(&self, issuer: &str) -> Result<JwkSet> {
        let url = parse_url(&format!(
            "{}/.well-known/openid-configuration",
            issuer.trim_end_matches('/')
        ))?;
        let configuration = self.fetcher.fetch_json(&url).await?;
        let jwks_uri = configuration
            .get("jwks_uri")
            .and_then(Value::as_str)
            .ok_or_else(|| UmaError::Fetch(format!("{}: no 'jwks_uri'", url)))?;
        self.key_set(&parse_url(jwks_uri)?).await
    }

    /// Key set of an UMA authorization server, published at `<issuer>/keys`.
    pub async fn uma_key_set(&self, issuer: &str) -> Result<JwkSet> {
        let base = if issuer.ends_with('/') {
            parse_url(issuer)?
        } else {
            parse_url(&format!("{}/", issuer))?
        };
        let url = base
            .join("keys")
            .map_err(|e| UmaError::Fetch(format!("{}: {}", issuer, e)))?;
        self.key_set(&url).await
    }

    /// Any JSON document, such as a JSON-LD WebID profile.
    pub async fn document(&self, url: &str) -> Result<Value> {
        self.fetcher.fetch_json(&parse_url(url)?).await
    }

    async fn key_set(&self, url: &Url) -> Result<JwkSet> {
        let document = self.fetcher.fetch_json(url).await?;
        serde_json::from_value(document).map_err(|e| UmaError::Fetch(format!("{}: not a key set: {}", url, e)))
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| UmaError::Fetch(format!("<{}> is not a URL: {}", raw, e)))
}
