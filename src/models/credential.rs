// src/models/credential.rs
//! Presented credentials and the vocabulary used to describe them.
//!
//! A credential is an opaque token together with the format URI that tells
//! the server which verifier can make sense of it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Format URI of the insecure `webid[:clientid]` token.
pub const UNSECURE: &str = "urn:solidlab:uma:claims:formats:webid";
/// Format URI of a generic signed JWT.
pub const JWT: &str = "urn:solidlab:uma:claims:formats:jwt";
/// Format URI of a Solid-OIDC identity token.
pub const OIDC: &str = "http://openid.net/specs/openid-connect-core-1_0.html#IDToken";
/// Format URI of an access token minted by an (upstream) authorization server.
pub const ACCESS_TOKEN: &str = "urn:ietf:params:oauth:token-type:access_token";

/// Claim holding the requester's WebID.
pub const WEBID: &str = "urn:solidlab:uma:claims:types:webid";
/// Claim holding the identifier of the client acting for the requester.
pub const CLIENTID: &str = "urn:solidlab:uma:claims:types:clientid";
/// Claim holding `{issuer, derivation_resource_id}` proofs of upstream access.
pub const UPSTREAM_PERMISSION: &str = "urn:knows:uma:claims:types:upstream-permission";

/// The credential formats this server knows how to verify.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialFormat {
    #[serde(rename = "urn:solidlab:uma:claims:formats:webid")]
    Unsecure,
    #[serde(rename = "urn:solidlab:uma:claims:formats:jwt")]
    Jwt,
    #[serde(rename = "http://openid.net/specs/openid-connect-core-1_0.html#IDToken")]
    Oidc,
    #[serde(rename = "urn:ietf:params:oauth:token-type:access_token")]
    AccessToken,
}

impl CredentialFormat {
    /// Looks up a format by its URI.
    ///
    /// # Returns
    /// `None` when the URI names a format this server does not support.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            UNSECURE => Some(CredentialFormat::Unsecure),
            JWT => Some(CredentialFormat::Jwt),
            OIDC => Some(CredentialFormat::Oidc),
            ACCESS_TOKEN => Some(CredentialFormat::AccessToken),
            _ => None,
        }
    }

    pub fn as_uri(&self) -> &'static str {
        match self {
            CredentialFormat::Unsecure => UNSECURE,
            CredentialFormat::Jwt => JWT,
            CredentialFormat::Oidc => OIDC,
            CredentialFormat::AccessToken => ACCESS_TOKEN,
        }
    }
}

impl fmt::Display for CredentialFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_uri())
    }
}

/// One proof presented by the requesting party.
///
/// # Fields
/// - `token`: the raw token, never inspected outside of a verifier
/// - `format`: decides which verifier accepts the token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub format: CredentialFormat,
}

impl Credential {
    pub fn new(token: impl Into<String>, format: CredentialFormat) -> Self {
        Self { token: token.into(), format }
    }
}
