// src/tokens/signing.rs
//! Key material of the authorization server.
//!
//! One RSA key pair signs every JWT the server mints. The public half is
//! published as a JWK set so other servers can verify those tokens.

use crate::error::{Result, UmaError};
use crate::utils::jwks::{Jwk, JwkSet};
use jsonwebtoken::{DecodingKey, EncodingKey};
use log::info;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;

/// Size of generated keys.
const KEY_BITS: usize = 2048;

/// RSA signing key together with its public JWK.
///
/// # Security Notes
/// - The private key only leaves this struct as a `jsonwebtoken` encoding key
/// - Generated keys live in memory and change on every restart
#[derive(Clone)]
pub struct SigningKeys {
    key_id: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    public: Jwk,
}

impl SigningKeys {
    /// Generates a fresh key pair.
    ///
    /// # Errors
    /// `Config` if key generation fails.
    pub fn generate(key_id: impl Into<String>) -> Result<Self> {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), KEY_BITS)
            .map_err(|e| UmaError::Config(format!("RSA key generation failed: {}", e)))?;
        let keys = Self::from_private_key(key_id.into(), key)?;
        info!("Generated signing key '{}'", keys.key_id);
        Ok(keys)
    }

    /// Loads a PEM encoded RSA private key (PKCS#8 or PKCS#1).
    ///
    /// # Errors
    /// `Config` if the PEM holds no RSA private key.
    pub fn from_pem(key_id: impl Into<String>, pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| UmaError::Config(format!("Invalid RSA private key: {}", e)))?;
        Self::from_private_key(key_id.into(), key)
    }

    fn from_private_key(key_id: String, key: RsaPrivateKey) -> Result<Self> {
        let pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| UmaError::Config(format!("Cannot encode RSA key: {}", e)))?;
        let encoding = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| UmaError::Config(format!("Cannot use RSA key for signing: {}", e)))?;

        let n = base64::encode_config(key.n().to_bytes_be(), base64::URL_SAFE_NO_PAD);
        let e = base64::encode_config(key.e().to_bytes_be(), base64::URL_SAFE_NO_PAD);
        let decoding = DecodingKey::from_rsa_components(&n, &e)
            .map_err(|e| UmaError::Config(format!("Cannot derive verification key: {}", e)))?;

        let public = Jwk::rsa(key_id.clone(), n, e);
        Ok(Self { key_id, encoding, decoding, public })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    pub fn public_jwk(&self) -> &Jwk {
        &self.public
    }

    /// The key set published at `<base_url>/keys`.
    pub fn jwks(&self) -> JwkSet {
        JwkSet { keys: vec![self.public.clone()] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::Algorithm;

    const PEM: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/issuer_key.pem"));

    #[test]
    fn test_pem_key_publishes_rsa_jwk() {
        let keys = SigningKeys::from_pem("as-1", PEM).unwrap();
        let jwk = keys.public_jwk();

        assert_eq!(keys.key_id(), "as-1");
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid.as_deref(), Some("as-1"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert_eq!(jwk.e.as_deref(), Some("AQAB"));
        assert!(jwk.supports(Algorithm::RS256));
        assert!(jwk.decoding_key().is_ok());
        assert_eq!(keys.jwks().keys.len(), 1);
    }

    #[test]
    fn test_garbage_pem_is_a_config_error() {
        assert!(matches!(SigningKeys::from_pem("k", "not a key"), Err(UmaError::Config(_))));
    }
}
