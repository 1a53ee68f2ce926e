// src/policies/namespaced.rs
//! Grants any authenticated identity access within configured namespaces.

use crate::error::Result;
use crate::models::claims::ClaimSet;
use crate::models::credential::WEBID;
use crate::models::permission::Permission;
use crate::models::requirements::{ClaimPredicate, Requirements};
use crate::policies::{queried, Authorizer};
use async_trait::async_trait;
use log::info;

/// Grants any WebID access to resources whose id starts with one of the
/// configured namespaces.
///
/// Without namespaces every resource is in scope.
pub struct NamespacedAuthorizer {
    namespaces: Vec<String>,
}

impl NamespacedAuthorizer {
    pub fn new(namespaces: Vec<String>) -> Self {
        Self { namespaces }
    }

    fn in_scope(&self, permission: &Permission) -> bool {
        if self.namespaces.is_empty() {
            return true;
        }
        match &permission.resource_id {
            Some(id) => self.namespaces.iter().any(|ns| id.starts_with(ns.as_str())),
            None => false,
        }
    }
}

#[async_trait]
impl Authorizer for NamespacedAuthorizer {
    async fn permissions(&self, claims: &ClaimSet, query: Option<&[Permission]>) -> Result<Vec<Permission>> {
        info!("Calculating permissions for {:?}", claims.values(WEBID));
        if claims.first_str(WEBID).is_none() {
            return Ok(Vec::new());
        }
        Ok(queried(query).into_iter().filter(|p| self.in_scope(p)).collect())
    }

    async fn credentials(&self, permissions: &[Permission], _query: Option<&Requirements>) -> Result<Vec<Requirements>> {
        info!("Calculating credentials for {} permission(s)", permissions.len());
        if !permissions.iter().all(|p| self.in_scope(p)) {
            return Ok(Vec::new());
        }
        Ok(permissions
            .iter()
            .map(|_| Requirements::new().with(WEBID, ClaimPredicate::Any))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorizer() -> NamespacedAuthorizer {
        NamespacedAuthorizer::new(vec!["https://pod.example/alice/".into()])
    }

    #[tokio::test]
    async fn test_requires_any_webid_inside_namespace() {
        let permissions = [Permission::new("https://pod.example/alice/notes", ["read"])];
        let required = authorizer().credentials(&permissions, None).await.unwrap();

        assert_eq!(required, vec![Requirements::new().with(WEBID, ClaimPredicate::Any)]);
    }

    #[tokio::test]
    async fn test_one_foreign_resource_denies_the_set() {
        let permissions = [
            Permission::new("https://pod.example/alice/notes", ["read"]),
            Permission::new("https://pod.example/bob/notes", ["read"]),
        ];
        assert!(authorizer().credentials(&permissions, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_permissions_need_an_identity() {
        let query = [
            Permission::new("https://pod.example/alice/notes", ["read"]),
            Permission::new("https://elsewhere.example/", ["read"]),
        ];
        assert!(authorizer().permissions(&ClaimSet::new(), Some(&query)).await.unwrap().is_empty());

        let mut claims = ClaimSet::new();
        claims.push(WEBID, "https://alice.example/#me");
        let granted = authorizer().permissions(&claims, Some(&query)).await.unwrap();
        assert_eq!(granted, vec![query[0].clone()]);
    }

    #[tokio::test]
    async fn test_no_namespaces_means_everything() {
        let open = NamespacedAuthorizer::new(Vec::new());
        let required = open.credentials(&[Permission::default()], None).await.unwrap();
        assert_eq!(required.len(), 1);
    }
}
