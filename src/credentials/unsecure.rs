// src/credentials/unsecure.rs
//! Self-asserted identities.
//!
//! The token is `percent_encode(webid)[:percent_encode(clientid)]` and is
//! taken at face value. Only meant for development setups.

use crate::credentials::{ensure_format, Verifier};
use crate::error::{Result, UmaError};
use crate::models::claims::ClaimSet;
use crate::models::credential::{Credential, CredentialFormat, CLIENTID, WEBID};
use async_trait::async_trait;
use log::{debug, info, warn};
use percent_encoding::percent_decode_str;

/// Accepts any `webid[:clientid]` token without checking it.
pub struct UnsecureVerifier;

impl UnsecureVerifier {
    pub fn new() -> Self {
        warn!("You are using an UnsecureVerifier. DO NOT USE THIS IN PRODUCTION !!!");
        UnsecureVerifier
    }
}

impl Default for UnsecureVerifier {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_part(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| UmaError::InvalidCredential(format!("Token part is not valid UTF-8: {}", e)))
}

#[async_trait]
impl Verifier for UnsecureVerifier {
    async fn verify(&self, credential: &Credential, mut claims: ClaimSet) -> Result<ClaimSet> {
        debug!("Verifying unsecure credential");
        ensure_format(credential, CredentialFormat::Unsecure)?;

        let parts: Vec<&str> = credential.token.split(':').collect();
        if parts.len() > 2 {
            return Err(UmaError::InvalidCredential(
                "Invalid token format, only one ':' is expected.".into(),
            ));
        }

        let webid = decode_part(parts[0])?;
        if webid.trim().is_empty() {
            return Err(UmaError::InvalidCredential("Token carries an empty identifier.".into()));
        }
        let client = parts.get(1).map(|raw| decode_part(raw)).transpose()?;

        info!("Authenticated via unsecure verifier as <{}>", webid);
        claims.push(WEBID, webid);
        if let Some(client) = client.filter(|c| !c.is_empty()) {
            claims.push(CLIENTID, client);
        }
        Ok(claims)
    }
}
