// src/models/dialog.rs
//! Request and response shapes of one negotiation round.

use crate::error::{Result, UmaError};
use crate::models::credential::{Credential, CredentialFormat, ACCESS_TOKEN, UPSTREAM_PERMISSION};
use crate::models::permission::{validate_permissions, Permission, DERIVATION_READ};
use serde::{Deserialize, Serialize};

/// One pushed `{claim_token, claim_token_format}` pair.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ClaimToken {
    #[serde(default)]
    pub claim_token: Option<String>,
    #[serde(default)]
    pub claim_token_format: Option<String>,
}

impl ClaimToken {
    pub fn new(token: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            claim_token: Some(token.into()),
            claim_token_format: Some(format.into()),
        }
    }
}

/// Body of a token-endpoint request.
///
/// Exactly one of `ticket` and `permissions` must be present.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DialogInput {
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<Permission>>,
    /// Space-separated scopes to add to every requested permission.
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub claim_token: Option<String>,
    #[serde(default)]
    pub claim_token_format: Option<String>,
    #[serde(default)]
    pub claim_tokens: Option<Vec<ClaimToken>>,
}

impl DialogInput {
    /// Checks that the request identifies its negotiation unambiguously.
    pub fn validate(&self) -> Result<()> {
        match (&self.ticket, &self.permissions) {
            (Some(_), Some(_)) => Err(UmaError::BadRequest(
                "A token request must carry either a ticket or permissions, not both.".into(),
            )),
            (None, None) => Err(UmaError::BadRequest(
                "A token request without existing ticket should include requested permissions.".into(),
            )),
            (Some(ticket), None) if ticket.trim().is_empty() => {
                Err(UmaError::BadRequest("The provided ticket is empty.".into()))
            }
            (None, Some(permissions)) => validate_permissions(permissions),
            _ => Ok(()),
        }
    }

    /// Scopes added by the `scope` parameter, in request order.
    pub fn additional_scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|scope| scope.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Every pushed credential, single pair first.
    ///
    /// # Errors
    /// `BadRequest` when a token comes without a format (or vice versa), or
    /// when a format URI is not supported.
    pub fn credentials(&self) -> Result<Vec<Credential>> {
        let single = ClaimToken {
            claim_token: self.claim_token.clone(),
            claim_token_format: self.claim_token_format.clone(),
        };
        std::iter::once(&single)
            .chain(self.claim_tokens.iter().flatten())
            .filter(|pair| pair.claim_token.is_some() || pair.claim_token_format.is_some())
            .map(to_credential)
            .collect()
    }
}

fn to_credential(pair: &ClaimToken) -> Result<Credential> {
    let token = pair.claim_token.as_deref().ok_or_else(|| {
        UmaError::BadRequest("Request with a \"claim_token_format\" must contain a \"claim_token\".".into())
    })?;
    let format = pair.claim_token_format.as_deref().ok_or_else(|| {
        UmaError::BadRequest("Request with a \"claim_token\" must contain a \"claim_token_format\".".into())
    })?;
    let format = CredentialFormat::from_uri(format)
        .ok_or_else(|| UmaError::BadRequest(format!("Unsupported claim token format '{}'.", format)))?;
    Ok(Credential::new(token, format))
}

/// Successful negotiation result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DialogOutput {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation_resource_id: Option<String>,
}

/// Where to obtain a missing upstream proof.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpstreamDetails {
    pub issuer: String,
    pub resource_id: String,
    pub resource_scopes: Vec<String>,
}

/// One entry of the `required_claims` disclosure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RequiredClaim {
    /// Proof of access to an upstream resource.
    Upstream {
        name: String,
        friendly_name: String,
        claim_token_format: String,
        details: UpstreamDetails,
    },
    /// Any credential establishing the named claim.
    Claim { claim_token_format: String },
}

impl RequiredClaim {
    pub fn claim(name: impl Into<String>) -> Self {
        RequiredClaim::Claim { claim_token_format: name.into() }
    }

    pub fn upstream(issuer: impl Into<String>, resource_id: impl Into<String>) -> Self {
        RequiredClaim::Upstream {
            name: UPSTREAM_PERMISSION.to_string(),
            friendly_name: "Prove access to source".to_string(),
            claim_token_format: ACCESS_TOKEN.to_string(),
            details: UpstreamDetails {
                issuer: issuer.into(),
                resource_id: resource_id.into(),
                resource_scopes: vec![DERIVATION_READ.to_string()],
            },
        }
    }

    pub fn details(&self) -> Option<&UpstreamDetails> {
        match self {
            RequiredClaim::Upstream { details, .. } => Some(details),
            RequiredClaim::Claim { .. } => None,
        }
    }
}

/// Payload of a "need more information" answer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NeedInfo {
    /// Fresh single-use ticket for the next round.
    pub ticket: String,
    pub required_claims: Vec<RequiredClaim>,
}

/// What a negotiation round produced, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogOutcome {
    Granted(DialogOutput),
    NeedInfo(NeedInfo),
}
