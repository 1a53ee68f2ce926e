// src/models/requirements.rs
//! Per-permission proof obligations.
//!
//! Predicates are plain data rather than closures so tickets holding them
//! can be stored, compared and logged.

use crate::models::claims::ClaimSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A test one claim value must pass.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaimPredicate {
    /// Any value is accepted; the claim only has to be present.
    Any,
    /// The value must equal `value`.
    Equals { value: Value },
    /// The value must be one of `values`.
    OneOf { values: Vec<Value> },
    /// The value must be an upstream-permission proof for exactly this
    /// issuer and derivation resource.
    UpstreamPermission {
        issuer: String,
        derivation_resource_id: String,
    },
}

impl ClaimPredicate {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ClaimPredicate::Any => true,
            ClaimPredicate::Equals { value: expected } => expected == value,
            ClaimPredicate::OneOf { values } => values.contains(value),
            ClaimPredicate::UpstreamPermission { issuer, derivation_resource_id } => {
                value.get("issuer").and_then(Value::as_str) == Some(issuer.as_str())
                    && value.get("derivation_resource_id").and_then(Value::as_str)
                        == Some(derivation_resource_id.as_str())
            }
        }
    }

    /// At least one of `values` satisfies the predicate.
    pub fn satisfied_by(&self, values: &[Value]) -> bool {
        values.iter().any(|value| self.matches(value))
    }
}

/// Claim name to the predicates that must all hold for it.
///
/// An empty `Requirements` means the associated permission is granted.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Requirements {
    claims: BTreeMap<String, Vec<ClaimPredicate>>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate for `claim`. Predicates for the same claim are
    /// conjunctive.
    pub fn require(&mut self, claim: impl Into<String>, predicate: ClaimPredicate) {
        let predicates = self.claims.entry(claim.into()).or_default();
        if !predicates.contains(&predicate) {
            predicates.push(predicate);
        }
    }

    pub fn with(mut self, claim: impl Into<String>, predicate: ClaimPredicate) -> Self {
        self.require(claim, predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Number of claim names still outstanding.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn predicates(&self, claim: &str) -> &[ClaimPredicate] {
        self.claims.get(claim).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ClaimPredicate])> {
        self.claims.iter().map(|(name, preds)| (name.as_str(), preds.as_slice()))
    }

    pub fn claim_names(&self) -> impl Iterator<Item = &str> {
        self.claims.keys().map(String::as_str)
    }

    /// Returns a copy without the predicates `claims` satisfies.
    ///
    /// A claim name disappears once every predicate under it holds. Nothing
    /// is ever added, so the result is never larger than `self`.
    pub fn eliminate(&self, claims: &ClaimSet) -> Requirements {
        let claims = self
            .claims
            .iter()
            .filter_map(|(name, predicates)| {
                let values = claims.values(name);
                let remaining: Vec<ClaimPredicate> = predicates
                    .iter()
                    .filter(|predicate| !predicate.satisfied_by(values))
                    .cloned()
                    .collect();
                (!remaining.is_empty()).then(|| (name.clone(), remaining))
            })
            .collect();
        Requirements { claims }
    }
}
