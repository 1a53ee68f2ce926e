// src/credentials/access_token.rs
//! Access tokens minted by upstream authorization servers.
//!
//! Presenting such a token proves the requester may read an upstream
//! derivation handle. Each permission in the token becomes one
//! `{issuer, derivation_resource_id}` value of the upstream-permission claim.

use crate::credentials::{credential_error, ensure_format, Verifier};
use crate::error::{Result, UmaError};
use crate::models::claims::ClaimSet;
use crate::models::credential::{Credential, CredentialFormat, UPSTREAM_PERMISSION};
use crate::models::permission::DERIVATION_READ;
use crate::utils::jwks::KeySetResolver;
use crate::utils::jwt::{decode_header, decode_unverified, issuer, verify_token, SOLID_AUDIENCE};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::{json, Map, Value};

/// Verifies upstream access tokens against `<iss>/keys`.
pub struct AccessTokenVerifier {
    keys: KeySetResolver,
}

impl AccessTokenVerifier {
    pub fn new(keys: KeySetResolver) -> Self {
        Self { keys }
    }

    async fn upstream_permissions(&self, token: &str) -> Result<Vec<Value>> {
        let payload = decode_unverified(token)?;
        let iss = issuer(&payload)
            .ok_or_else(|| UmaError::invalid_credential("Access Token missing issuer."))?
            .to_string();
        let header = decode_header(token)?;

        let key = self.keys.uma_key_set(&iss).await?.key_for(&header)?;
        let verified = verify_token(token, &key, header.alg, Some(iss.as_str()), Some(SOLID_AUDIENCE))?;

        proofs(&iss, &verified)
    }
}

/// Turns the token's `permissions` into upstream-permission values.
///
/// Every entry must name a `resource_id` and grant derivation-read, or the
/// whole token is rejected.
fn proofs(issuer: &str, payload: &Map<String, Value>) -> Result<Vec<Value>> {
    let permissions = match payload.get("permissions") {
        Some(Value::Array(permissions)) => permissions.as_slice(),
        _ => return Ok(Vec::new()),
    };

    permissions
        .iter()
        .map(|permission| {
            let resource_id = permission.get("resource_id").and_then(Value::as_str);
            let derivation_read = permission
                .get("resource_scopes")
                .and_then(Value::as_array)
                .map_or(false, |scopes| scopes.iter().any(|s| s.as_str() == Some(DERIVATION_READ)));

            match resource_id {
                Some(resource_id) if derivation_read => Ok(json!({
                    "issuer": issuer,
                    "derivation_resource_id": resource_id,
                })),
                _ => Err(UmaError::invalid_credential("Invalid RPT: 'permissions' array invalid.")),
            }
        })
        .collect()
}

#[async_trait]
impl Verifier for AccessTokenVerifier {
    async fn verify(&self, credential: &Credential, mut claims: ClaimSet) -> Result<ClaimSet> {
        debug!("Verifying upstream access token");
        ensure_format(credential, CredentialFormat::AccessToken)?;

        let proofs = self
            .upstream_permissions(&credential.token)
            .await
            .map_err(|e| credential_error("Error verifying Access Token", e))?;

        info!("Upstream access token verified with {} derivation proof(s)", proofs.len());
        for proof in proofs {
            claims.push(UPSTREAM_PERMISSION, proof);
        }
        Ok(claims)
    }
}
