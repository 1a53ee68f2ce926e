// src/models/resource.rs
//! Registered resource descriptions.
//!
//! A resource server registers each protected resource with the scopes it
//! supports. A resource may also declare where it was derived from, using the
//! PROV `wasDerivedFrom` relation. Each relation names the authorization
//! server guarding the source and the derivation handle that server issued.
//!
//! # Relation Format
//! The relation accepts either a single object or an array:
//! ```json
//! { "prov:wasDerivedFrom": { "issuer": "https://as-up/", "derivation_resource_id": "D1" } }
//! ```

use crate::error::{Result, UmaError};
use crate::models::permission::DERIVATION_READ;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Link from a resource to the upstream resource it was derived from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DerivationRelation {
    /// Base URL of the upstream authorization server.
    pub issuer: String,
    /// Handle the upstream AS registered for this derivation.
    pub derivation_resource_id: String,
}

/// Relations declared on a resource.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ResourceRelations {
    #[serde(
        rename = "prov:wasDerivedFrom",
        alias = "wasDerivedFrom",
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub was_derived_from: Vec<DerivationRelation>,

    /// Relations this server does not interpret, kept verbatim.
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Metadata a resource server registers for one resource.
///
/// # Fields
/// - `resource_scopes`: scopes the resource supports
/// - `resource_relations`: optional provenance links
/// - `name`, `resource_type`, `description`: informational UMA fields
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ResourceDescription {
    pub resource_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_relations: Option<ResourceRelations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceDescription {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_scopes: scopes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// The description registered for a freshly minted derivation handle.
    pub fn derivation_handle() -> Self {
        Self::new([DERIVATION_READ])
    }

    pub fn derived_from(mut self, issuer: impl Into<String>, derivation_resource_id: impl Into<String>) -> Self {
        self.resource_relations
            .get_or_insert_with(ResourceRelations::default)
            .was_derived_from
            .push(DerivationRelation {
                issuer: issuer.into(),
                derivation_resource_id: derivation_resource_id.into(),
            });
        self
    }

    /// Upstream sources of this resource; empty when it is not derived.
    pub fn upstream(&self) -> &[DerivationRelation] {
        self.resource_relations
            .as_ref()
            .map(|relations| relations.was_derived_from.as_slice())
            .unwrap_or(&[])
    }

    /// Checks a description received for registration.
    ///
    /// # Errors
    /// Returns `BadRequest` if:
    /// - no scope, or a blank scope, is listed
    /// - a derivation issuer is not an absolute URL
    /// - a derivation resource id is blank
    pub fn validate(&self) -> Result<()> {
        if self.resource_scopes.is_empty() {
            return Err(UmaError::BadRequest("'resource_scopes' must not be empty.".into()));
        }
        if self.resource_scopes.iter().any(|scope| scope.trim().is_empty()) {
            return Err(UmaError::BadRequest("'resource_scopes' contains an empty scope.".into()));
        }
        for relation in self.upstream() {
            Url::parse(&relation.issuer).map_err(|e| {
                UmaError::BadRequest(format!("Derivation issuer <{}> is not a URL: {}", relation.issuer, e))
            })?;
            if relation.derivation_resource_id.trim().is_empty() {
                return Err(UmaError::BadRequest("Derivation relation without 'derivation_resource_id'.".into()));
            }
        }
        Ok(())
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<DerivationRelation>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(DerivationRelation),
        Many(Vec<DerivationRelation>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(relation) => vec![relation],
        OneOrMany::Many(relations) => relations,
    })
}
