// src/models/claims.rs
//! Accumulated claims about a requesting party.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Facts asserted about the requester, keyed by claim name.
///
/// Every claim name maps to the ordered list of values asserted for it.
/// Several credentials may assert the same claim, so values are only ever
/// appended, never replaced.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ClaimSet {
    claims: BTreeMap<String, Vec<Value>>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the values held for `name`.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.claims.entry(name.into()).or_default().push(value.into());
    }

    /// Values held for `name`, in assertion order. Empty when none.
    pub fn values(&self, name: &str) -> &[Value] {
        self.claims.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first value held for `name` that is a JSON string.
    pub fn first_str(&self, name: &str) -> Option<&str> {
        self.values(name).iter().find_map(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.values(name).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.values().all(Vec::is_empty)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.claims.keys().map(String::as_str)
    }

    /// Appends every value of `other`, preserving order.
    pub fn merge(&mut self, other: ClaimSet) {
        for (name, values) in other.claims {
            self.claims.entry(name).or_default().extend(values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_is_additive() {
        let mut claims = ClaimSet::new();
        claims.push("webid", "https://alice.example/#me");
        claims.push("webid", "https://bob.example/#me");

        assert_eq!(claims.values("webid").len(), 2);
        assert_eq!(claims.first_str("webid"), Some("https://alice.example/#me"));
        assert!(claims.values("clientid").is_empty());
    }

    #[test]
    fn test_merge_never_drops_values() {
        let mut left = ClaimSet::new();
        left.push("webid", "a");
        let mut right = ClaimSet::new();
        right.push("webid", "b");
        right.push("upstream", json!({"issuer": "https://as/", "derivation_resource_id": "D1"}));

        left.merge(right);

        assert_eq!(left.values("webid"), &[json!("a"), json!("b")]);
        assert!(left.contains("upstream"));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut claims = ClaimSet::new();
        claims.push("webid", "a");
        assert_eq!(serde_json::to_value(&claims).unwrap(), json!({"webid": ["a"]}));
        assert!(ClaimSet::new().is_empty());
    }
}
