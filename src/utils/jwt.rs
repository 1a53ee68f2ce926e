// src/utils/jwt.rs
//! Helpers for reading and checking compact JWS tokens.
//!
//! Verifiers often need a claim (usually `iss`) before they know which key
//! to verify with. [`decode_unverified`] reads the payload without touching
//! the signature; [`verify_token`] then performs the real check.

use crate::error::{Result, UmaError};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde_json::{Map, Value};

/// Audience every token exchanged between Solid servers carries.
pub const SOLID_AUDIENCE: &str = "solid";

/// Decodes the payload of a JWT without verifying it.
///
/// # Arguments
/// * `token` - Compact serialization `header.payload.signature`
///
/// # Returns
/// The payload claims as a JSON object
///
/// # Errors
/// `InvalidCredential` if the token is not three dot-separated segments,
/// the payload is not base64url, or it is not a JSON object.
pub fn decode_unverified(token: &str) -> Result<Map<String, Value>> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(UmaError::invalid_credential("Token is not a compact JWT.")),
    };

    let bytes = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
        .map_err(|e| UmaError::invalid_credential(format!("JWT payload is not base64url: {}", e)))?;

    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(UmaError::invalid_credential("JWT payload is not a JSON object.")),
        Err(e) => Err(UmaError::invalid_credential(format!("JWT payload is not JSON: {}", e))),
    }
}

/// Decodes the protected header of a JWT.
pub fn decode_header(token: &str) -> Result<Header> {
    jsonwebtoken::decode_header(token)
        .map_err(|e| UmaError::invalid_credential(format!("Invalid JWT header: {}", e)))
}

/// The `iss` claim of an unverified payload.
pub fn issuer(claims: &Map<String, Value>) -> Option<&str> {
    claims.get("iss").and_then(Value::as_str).filter(|iss| !iss.is_empty())
}

/// Verifies signature and registered claims of a JWT.
///
/// `exp` and `nbf` are checked when present but not required.
///
/// # Arguments
/// * `token` - The compact JWT
/// * `key` - Key to check the signature with
/// * `algorithm` - Expected signing algorithm (taken from the header)
/// * `issuer` - Required `iss`, if any
/// * `audience` - Required `aud`, if any
///
/// # Errors
/// `InvalidCredential` on any signature or claim mismatch.
pub fn verify_token(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
    issuer: Option<&str>,
    audience: Option<&str>,
) -> Result<Map<String, Value>> {
    verify_token_requiring(token, key, algorithm, issuer, audience, &[])
}

/// Like [`verify_token`], but fails unless every claim in `required` is
/// present. Requiring `exp` makes the token expire.
pub fn verify_token_requiring(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
    issuer: Option<&str>,
    audience: Option<&str>,
    required: &[&str],
) -> Result<Map<String, Value>> {
    let mut validation = Validation::new(algorithm);
    validation.set_required_spec_claims(required);
    validation.validate_nbf = true;
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }
    if let Some(audience) = audience {
        validation.set_audience(&[audience]);
    }

    jsonwebtoken::decode::<Map<String, Value>>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| UmaError::invalid_credential(format!("JWT verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey};
    use serde_json::json;

    const SECRET: &[u8] = b"shared-secret";

    fn hs256(claims: Value) -> String {
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn test_decode_unverified_reads_payload() {
        let token = hs256(json!({"iss": "https://idp.example/", "webid": "https://alice.example/#me"}));
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(issuer(&claims), Some("https://idp.example/"));
        assert_eq!(claims["webid"], "https://alice.example/#me");
    }

    #[test]
    fn test_decode_unverified_rejects_garbage() {
        assert!(decode_unverified("not-a-jwt").is_err());
        assert!(decode_unverified("a.b.c.d").is_err());
        assert!(decode_unverified("a.%%%.c").is_err());
    }

    #[test]
    fn test_verify_checks_issuer_and_audience() {
        let token = hs256(json!({"iss": "https://as/", "aud": "solid"}));
        let key = DecodingKey::from_secret(SECRET);

        assert!(verify_token(&token, &key, Algorithm::HS256, Some("https://as/"), Some(SOLID_AUDIENCE)).is_ok());
        assert!(verify_token(&token, &key, Algorithm::HS256, Some("https://other/"), None).is_err());
        assert!(verify_token(&token, &key, Algorithm::HS256, None, Some("elsewhere")).is_err());
    }

    #[test]
    fn test_required_claims_must_be_present() {
        let key = DecodingKey::from_secret(SECRET);
        let without_exp = hs256(json!({"iss": "https://as/"}));
        assert!(verify_token(&without_exp, &key, Algorithm::HS256, None, None).is_ok());
        assert!(verify_token_requiring(&without_exp, &key, Algorithm::HS256, None, None, &["exp"]).is_err());

        let expired = hs256(json!({"iss": "https://as/", "exp": 1_000_000}));
        assert!(verify_token_requiring(&expired, &key, Algorithm::HS256, None, None, &["exp"]).is_err());

        let exp = chrono::Utc::now().timestamp() + 3600;
        let fresh = hs256(json!({"iss": "https://as/", "exp": exp}));
        assert!(verify_token_requiring(&fresh, &key, Algorithm::HS256, None, None, &["exp"]).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let token = hs256(json!({"iss": "https://as/"}));
        let key = DecodingKey::from_secret(b"another-secret");
        assert!(matches!(
            verify_token(&token, &key, Algorithm::HS256, None, None),
            Err(UmaError::InvalidCredential(_))
        ));
    }
}
