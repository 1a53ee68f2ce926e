// src/tokens/jwt_factory.rs
//! Self-contained signed access tokens.

use crate::error::{Result, UmaError};
use crate::models::permission::Permission;
use crate::tokens::{AccessToken, SerializedToken, SigningKeys, TokenFactory, BEARER};
use crate::utils::jwt::{verify_token, SOLID_AUDIENCE};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registered and private claims of a minted token.
#[derive(Serialize, Deserialize, Debug)]
struct TokenClaims {
    iss: String,
    aud: String,
    iat: i64,
    exp: i64,
    jti: String,
    permissions: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contract: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<bool>,
}

/// Mints RS256 JWTs addressed to `solid`.
#[derive(Clone)]
pub struct JwtTokenFactory {
    keys: SigningKeys,
    issuer: String,
    ttl: Duration,
}

impl JwtTokenFactory {
    /// # Arguments
    /// * `keys` - The server's signing keys
    /// * `issuer` - Value of `iss`, the server's base URL
    /// * `ttl_secs` - Lifetime of minted tokens
    pub fn new(keys: SigningKeys, issuer: impl Into<String>, ttl_secs: i64) -> Self {
        Self { keys, issuer: issuer.into(), ttl: Duration::seconds(ttl_secs) }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn keys(&self) -> &SigningKeys {
        &self.keys
    }
}

#[async_trait]
impl TokenFactory for JwtTokenFactory {
    async fn serialize(&self, token: AccessToken) -> Result<SerializedToken> {
        let now = Utc::now();
        let claims = TokenClaims {
            iss: self.issuer.clone(),
            aud: SOLID_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            permissions: token.permissions,
            contract: token.contract,
            active: token.active,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.key_id().to_string());
        let jwt = encode(&header, &claims, self.keys.encoding_key())
            .map_err(|e| UmaError::Token(format!("Cannot sign access token: {}", e)))?;
        debug!("Issued token {} for {} permission(s)", claims.jti, claims.permissions.len());

        Ok(SerializedToken { token: jwt, token_type: BEARER.to_string() })
    }

    async fn deserialize(&self, token: &str) -> Result<AccessToken> {
        let claims = verify_token(
            token,
            self.keys.decoding_key(),
            Algorithm::RS256,
            Some(self.issuer.as_str()),
            Some(SOLID_AUDIENCE),
        )?;
        serde_json::from_value(Value::Object(claims))
            .map_err(|e| UmaError::InvalidCredential(format!("Malformed access token: {}", e)))
    }
}
