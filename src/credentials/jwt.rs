// src/credentials/jwt.rs
//! Generic signed JWT credentials.

use crate::credentials::{credential_error, ensure_format, Verifier};
use crate::error::{Result, UmaError};
use crate::models::claims::ClaimSet;
use crate::models::credential::{Credential, CredentialFormat};
use crate::utils::jwks::KeySetResolver;
use crate::utils::jwt::{decode_header, decode_unverified, issuer, verify_token};
use async_trait::async_trait;
use log::debug;

/// Copies an allow-list of claims out of a JWT.
///
/// # Fields
/// - `allowed_claims`: claim names copied into the claim set
/// - `error_on_extra_claims`: reject tokens carrying any other claim
/// - `verify`: check the signature against `<iss>/.well-known/jwks.json`
pub struct JwtVerifier {
    allowed_claims: Vec<String>,
    error_on_extra_claims: bool,
    verify: bool,
    keys: KeySetResolver,
}

impl JwtVerifier {
    pub fn new(allowed_claims: Vec<String>, error_on_extra_claims: bool, verify: bool, keys: KeySetResolver) -> Self {
        Self { allowed_claims, error_on_extra_claims, verify, keys }
    }

    async fn check_signature(&self, token: &str) -> Result<()> {
        let payload = decode_unverified(token)?;
        let iss = issuer(&payload).ok_or_else(|| UmaError::invalid_credential("JWT should contain 'iss' claim."))?;
        let header = decode_header(token)?;
        if header.kid.is_none() {
            return Err(UmaError::invalid_credential("JWT should contain 'kid' header."));
        }

        let key = self.keys.well_known_key_set(iss).await?.key_for(&header)?;
        verify_token(token, &key, header.alg, None, None)?;
        Ok(())
    }
}

#[async_trait]
impl Verifier for JwtVerifier {
    async fn verify(&self, credential: &Credential, mut claims: ClaimSet) -> Result<ClaimSet> {
        debug!("Verifying JWT credential");
        ensure_format(credential, CredentialFormat::Jwt)?;

        if self.verify {
            self.check_signature(&credential.token)
                .await
                .map_err(|e| credential_error("Error verifying JWT", e))?;
        }

        for (name, value) in decode_unverified(&credential.token)? {
            if !self.allowed_claims.contains(&name) {
                if self.error_on_extra_claims {
                    return Err(UmaError::InvalidCredential(format!("Claim '{}' not allowed.", name)));
                }
                continue;
            }
            claims.push(name, value);
        }

        debug!("Returning discovered claims: {:?}", claims);
        Ok(claims)
    }
}
