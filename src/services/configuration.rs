// src/services/configuration.rs
//! UMA discovery document.

use serde::{Deserialize, Serialize};

/// The only grant type this server accepts at its token endpoint.
pub const UMA_TICKET_GRANT: &str = "urn:ietf:params:oauth:grant-type:uma-ticket";

/// Contents of `/.well-known/uma2-configuration`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UmaConfiguration {
    pub issuer: String,
    pub jwks_uri: String,
    pub token_endpoint: String,
    pub permission_endpoint: String,
    pub introspection_endpoint: String,
    pub resource_registration_endpoint: String,
    pub grant_types_supported: Vec<String>,
    pub uma_profiles_supported: Vec<String>,
    pub response_types_supported: Vec<String>,
    pub token_endpoint_auth_signing_alg_values_supported: Vec<String>,
    pub dpop_signing_alg_values_supported: Vec<String>,
}

impl UmaConfiguration {
    /// Builds the document for a server reachable at `base_url`.
    ///
    /// `base_url` is also the issuer of every token, so a trailing slash is
    /// dropped to keep `iss` and the endpoint URLs consistent.
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let endpoint = |path: &str| format!("{}/{}", base, path);

        Self {
            issuer: base.to_string(),
            jwks_uri: endpoint("keys"),
            token_endpoint: endpoint("token"),
            permission_endpoint: endpoint("ticket"),
            introspection_endpoint: endpoint("introspect"),
            resource_registration_endpoint: endpoint("resources"),
            grant_types_supported: vec![UMA_TICKET_GRANT.to_string()],
            uma_profiles_supported: vec!["http://openid.net/specs/openid-connect-core-1_0.html#IDToken".to_string()],
            response_types_supported: vec!["token".to_string()],
            token_endpoint_auth_signing_alg_values_supported: vec!["RS256".to_string()],
            dpop_signing_alg_values_supported: ["ES256", "ES384", "PS256", "PS384", "RS256", "RS384"]
                .iter()
                .map(|alg| alg.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_hang_off_the_base_url() {
        let config = UmaConfiguration::new("https://as.example/uma/");

        assert_eq!(config.issuer, "https://as.example/uma");
        assert_eq!(config.jwks_uri, "https://as.example/uma/keys");
        assert_eq!(config.permission_endpoint, "https://as.example/uma/ticket");
        assert_eq!(config.resource_registration_endpoint, "https://as.example/uma/resources");
        assert_eq!(config.grant_types_supported, vec![UMA_TICKET_GRANT.to_string()]);
    }
}
