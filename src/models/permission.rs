// src/models/permission.rs
//! Requested and granted permissions.

use crate::error::{Result, UmaError};
use serde::{Deserialize, Serialize};

/// Scope granting the right to present a resource as a derivation source.
pub const DERIVATION_READ: &str = "urn:knows:uma:scopes:derivation-read";
/// Scope asking the AS to mint a derivation handle alongside the token.
pub const DERIVATION_CREATION: &str = "urn:knows:uma:scopes:derivation-creation";

/// One resource + scopes request unit.
///
/// # Fields
/// - `resource_id`: the registered resource, `None` meaning any resource
/// - `resource_scopes`: scope URIs, all of which must be authorized together;
///   `None` meaning any scope
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Permission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_scopes: Option<Vec<String>>,
}

impl Permission {
    pub fn new<I, S>(resource_id: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_id: Some(resource_id.into()),
            resource_scopes: Some(scopes.into_iter().map(Into::into).collect()),
        }
    }

    /// Appends scopes, skipping ones already present.
    ///
    /// An absent scope list is treated as empty, so expanding "any scope"
    /// yields exactly the added scopes.
    pub fn add_scopes<S: AsRef<str>>(&mut self, scopes: &[S]) {
        let current = self.resource_scopes.get_or_insert_with(Vec::new);
        for scope in scopes {
            let scope = scope.as_ref();
            if !current.iter().any(|s| s == scope) {
                current.push(scope.to_string());
            }
        }
    }

    /// `true` when this permission (as a grant) includes `requested`.
    ///
    /// A missing resource or scope list on the grant side matches anything;
    /// on the requested side it can only be matched by an equally open grant.
    pub fn covers(&self, requested: &Permission) -> bool {
        let resource_ok = match (&self.resource_id, &requested.resource_id) {
            (None, _) => true,
            (Some(granted), Some(wanted)) => granted == wanted,
            (Some(_), None) => false,
        };
        let scopes_ok = match (&self.resource_scopes, &requested.resource_scopes) {
            (None, _) => true,
            (Some(granted), Some(wanted)) => wanted.iter().all(|s| granted.contains(s)),
            (Some(_), None) => false,
        };
        resource_ok && scopes_ok
    }

    /// Rejects blank identifiers and blank scopes.
    pub fn validate(&self) -> Result<()> {
        if matches!(&self.resource_id, Some(id) if id.trim().is_empty()) {
            return Err(UmaError::BadRequest("Permission has an empty 'resource_id'.".into()));
        }
        if let Some(scopes) = &self.resource_scopes {
            if scopes.iter().any(|s| s.trim().is_empty()) {
                return Err(UmaError::BadRequest("Permission has an empty scope.".into()));
            }
        }
        Ok(())
    }
}

/// Validates a non-empty list of permissions.
pub fn validate_permissions(permissions: &[Permission]) -> Result<()> {
    if permissions.is_empty() {
        return Err(UmaError::BadRequest("At least one permission is required.".into()));
    }
    permissions.iter().try_for_each(Permission::validate)
}
