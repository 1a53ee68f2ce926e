// src/credentials/oidc.rs
//! Solid-OIDC identity tokens.

use crate::credentials::{credential_error, ensure_format, Verifier};
use crate::error::{Result, UmaError};
use crate::models::claims::ClaimSet;
use crate::models::credential::{Credential, CredentialFormat, CLIENTID, WEBID};
use crate::utils::jwks::KeySetResolver;
use crate::utils::jwt::{decode_header, decode_unverified, issuer, verify_token_requiring, SOLID_AUDIENCE};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::{Map, Value};

/// Predicate a WebID profile uses to name the providers allowed to speak for it.
pub const OIDC_ISSUER: &str = "http://www.w3.org/ns/solid/terms#oidcIssuer";

/// Verifies ID tokens against their provider's published keys.
///
/// The provider's key set is discovered through its OpenID configuration.
/// A valid token must be addressed to `solid`, carry `exp` and a `webid`
/// claim, and come from a provider the WebID profile lists as its
/// `solid:oidcIssuer`. Providers in `trusted_issuers` skip the profile lookup.
pub struct SolidOidcVerifier {
    keys: KeySetResolver,
    trusted_issuers: Vec<String>,
}

fn same_issuer(left: &str, right: &str) -> bool {
    left.trim_end_matches('/') == right.trim_end_matches('/')
}

/// Issuers a JSON-LD profile lists for the node `webid`.
fn listed_issuers(profile: &Value, webid: &str) -> Vec<String> {
    let nodes: Vec<&Value> = match profile {
        Value::Array(nodes) => nodes.iter().collect(),
        Value::Object(node) => match node.get("@graph") {
            Some(Value::Array(graph)) => graph.iter().collect(),
            _ => vec![profile],
        },
        _ => Vec::new(),
    };

    nodes
        .into_iter()
        .filter(|node| node.get("@id").and_then(Value::as_str) == Some(webid))
        .flat_map(|node| {
            [OIDC_ISSUER, "solid:oidcIssuer", "oidcIssuer"]
                .into_iter()
                .filter_map(move |key| node.get(key))
        })
        .flat_map(|value| match value {
            Value::Array(values) => values.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .filter_map(|value| match value {
            Value::String(iri) => Some(iri.clone()),
            other => other.get("@id").and_then(Value::as_str).map(str::to_string),
        })
        .collect()
}

impl SolidOidcVerifier {
    pub fn new(keys: KeySetResolver) -> Self {
        Self { keys, trusted_issuers: Vec::new() }
    }

    pub fn with_trusted_issuers(mut self, issuers: Vec<String>) -> Self {
        self.trusted_issuers = issuers;
        self
    }

    async fn verified_claims(&self, token: &str) -> Result<Map<String, Value>> {
        let payload = decode_unverified(token)?;
        let iss = issuer(&payload).ok_or_else(|| UmaError::invalid_credential("ID token missing issuer."))?;
        let header = decode_header(token)?;

        let key = self.keys.openid_key_set(iss).await?.key_for(&header)?;
        verify_token_requiring(token, &key, header.alg, Some(iss), Some(SOLID_AUDIENCE), &["exp"])
    }

    /// Checks that `iss` may assert `webid`.
    ///
    /// # Errors
    /// `InvalidCredential` if the profile cannot be fetched or does not list
    /// the issuer.
    async fn ensure_issuer(&self, webid: &str, iss: &str) -> Result<()> {
        if self.trusted_issuers.iter().any(|trusted| same_issuer(trusted, iss)) {
            debug!("<{}> is a trusted issuer", iss);
            return Ok(());
        }

        let document = webid.split('#').next().unwrap_or(webid);
        let profile = self.keys.document(document).await?;
        if listed_issuers(&profile, webid).iter().any(|listed| same_issuer(listed, iss)) {
            return Ok(());
        }
        Err(UmaError::InvalidCredential(format!(
            "<{}> is not an OIDC issuer of <{}>.",
            iss, webid
        )))
    }
}

#[async_trait]
impl Verifier for SolidOidcVerifier {
    async fn verify(&self, credential: &Credential, mut claims: ClaimSet) -> Result<ClaimSet> {
        debug!("Verifying OIDC credential");
        ensure_format(credential, CredentialFormat::Oidc)?;

        let token = self
            .verified_claims(&credential.token)
            .await
            .map_err(|e| credential_error("Error verifying OIDC ID Token", e))?;

        let webid = token
            .get("webid")
            .and_then(Value::as_str)
            .ok_or_else(|| UmaError::invalid_credential("Error verifying OIDC ID Token: missing 'webid' claim."))?;
        let iss = issuer(&token).unwrap_or_default();
        self.ensure_issuer(webid, iss)
            .await
            .map_err(|e| credential_error("Error verifying OIDC ID Token", e))?;

        let client = token
            .get("client_id")
            .or_else(|| token.get("azp"))
            .and_then(Value::as_str);

        info!("Authenticated via Solid OIDC as <{}>", webid);
        claims.push(WEBID, webid);
        if let Some(client) = client {
            claims.push(CLIENTID, client);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::jwks::StaticFetcher;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde_json::json;
    use std::sync::Arc;

    const IDP: &str = "https://idp.example/";
    const ROGUE: &str = "https://rogue.example/";
    const ALICE: &str = "https://alice.example/#me";
    const SECRET: &[u8] = b"oidc-provider-secret";

    fn provider(fetcher: StaticFetcher, issuer: &str) -> StaticFetcher {
        let base = issuer.trim_end_matches('/');
        fetcher
            .with(
                format!("{}/.well-known/openid-configuration", base),
                json!({"issuer": issuer, "jwks_uri": format!("{}/jwks", base)}),
            )
            .with(
                format!("{}/jwks", base),
                json!({"keys": [{
                    "kty": "oct",
                    "kid": "idp-1",
                    "k": base64::encode_config(SECRET, base64::URL_SAFE_NO_PAD),
                }]}),
            )
    }

    fn fetcher() -> StaticFetcher {
        let fetcher = provider(provider(StaticFetcher::new(), IDP), ROGUE);
        fetcher.with(
            "https://alice.example/",
            json!({
                "@id": ALICE,
                "http://www.w3.org/ns/solid/terms#oidcIssuer": {"@id": IDP},
            }),
        )
    }

    fn verifier() -> SolidOidcVerifier {
        SolidOidcVerifier::new(KeySetResolver::new(Arc::new(fetcher())))
    }

    fn expiry() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    fn id_token(claims: serde_json::Value) -> Credential {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("idp-1".into());
        let token = encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap();
        Credential::new(token, CredentialFormat::Oidc)
    }

    #[tokio::test]
    async fn test_webid_and_client_are_emitted() {
        let credential = id_token(json!({
            "iss": IDP,
            "aud": "solid",
            "exp": expiry(),
            "webid": ALICE,
            "azp": "https://app.example/id",
        }));
        let claims = verifier().verify(&credential, ClaimSet::new()).await.unwrap();

        assert_eq!(claims.first_str(WEBID), Some(ALICE));
        assert_eq!(claims.first_str(CLIENTID), Some("https://app.example/id"));
    }

    #[tokio::test]
    async fn test_client_id_wins_over_azp() {
        let credential = id_token(json!({
            "iss": IDP,
            "aud": ["solid", "https://app.example/id"],
            "exp": expiry(),
            "webid": ALICE,
            "client_id": "https://client.example/id",
            "azp": "https://app.example/id",
        }));
        let claims = verifier().verify(&credential, ClaimSet::new()).await.unwrap();
        assert_eq!(claims.values(CLIENTID).len(), 1);
        assert_eq!(claims.first_str(CLIENTID), Some("https://client.example/id"));
    }

    #[tokio::test]
    async fn test_audience_and_webid_are_required() {
        let wrong_audience = id_token(json!({"iss": IDP, "aud": "other", "exp": expiry(), "webid": ALICE}));
        assert!(verifier().verify(&wrong_audience, ClaimSet::new()).await.is_err());

        let no_webid = id_token(json!({"iss": IDP, "aud": "solid", "exp": expiry()}));
        assert!(matches!(
            verifier().verify(&no_webid, ClaimSet::new()).await,
            Err(UmaError::InvalidCredential(_))
        ));
    }

    #[tokio::test]
    async fn test_id_token_must_expire() {
        let no_exp = id_token(json!({"iss": IDP, "aud": "solid", "webid": ALICE}));
        assert!(matches!(
            verifier().verify(&no_exp, ClaimSet::new()).await,
            Err(UmaError::InvalidCredential(_))
        ));

        let expired = id_token(json!({"iss": IDP, "aud": "solid", "exp": 1_000_000, "webid": ALICE}));
        assert!(verifier().verify(&expired, ClaimSet::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_issuer_must_be_listed_in_the_webid_profile() {
        // A working provider that Alice's profile does not name.
        let credential = id_token(json!({"iss": ROGUE, "aud": "solid", "exp": expiry(), "webid": ALICE}));
        let result = verifier().verify(&credential, ClaimSet::new()).await;
        assert!(matches!(result, Err(UmaError::InvalidCredential(msg)) if msg.contains("not an OIDC issuer")));
    }

    #[tokio::test]
    async fn test_unreachable_profile_is_an_invalid_credential() {
        let credential = id_token(json!({
            "iss": IDP,
            "aud": "solid",
            "exp": expiry(),
            "webid": "https://bob.example/#me",
        }));
        let result = verifier().verify(&credential, ClaimSet::new()).await;
        assert!(matches!(result, Err(UmaError::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn test_trusted_issuer_skips_profile_lookup() {
        let verifier = verifier().with_trusted_issuers(vec!["https://idp.example".into()]);
        let credential = id_token(json!({
            "iss": IDP,
            "aud": "solid",
            "exp": expiry(),
            "webid": "https://bob.example/#me",
        }));
        let claims = verifier.verify(&credential, ClaimSet::new()).await.unwrap();
        assert_eq!(claims.first_str(WEBID), Some("https://bob.example/#me"));
    }

    #[test]
    fn test_listed_issuers_reads_graphs_and_arrays() {
        let profile = json!({"@graph": [
            {"@id": "https://alice.example/#other", "solid:oidcIssuer": "https://wrong.example/"},
            {"@id": ALICE, "solid:oidcIssuer": [{"@id": IDP}, "https://second.example/"]},
        ]});
        assert_eq!(
            listed_issuers(&profile, ALICE),
            vec![IDP.to_string(), "https://second.example/".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unknown_provider_is_an_invalid_credential() {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("idp-1".into());
        let claims = json!({"iss": "https://unknown.example/", "aud": "solid", "exp": expiry(), "webid": ALICE});
        let token = encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap();

        let result = verifier().verify(&Credential::new(token, CredentialFormat::Oidc), ClaimSet::new()).await;
        assert!(matches!(result, Err(UmaError::InvalidCredential(_))));
    }
}
