// src/policies/derived_from.rs
//! Upstream requirements for derived resources.

use crate::error::Result;
use crate::models::claims::ClaimSet;
use crate::models::credential::UPSTREAM_PERMISSION;
use crate::models::permission::Permission;
use crate::models::requirements::{ClaimPredicate, Requirements};
use crate::policies::Authorizer;
use crate::storage::ResourceStore;
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;

/// Wraps another authorizer and, for resources derived from upstream
/// sources, additionally requires proof of access to each source.
///
/// Every `wasDerivedFrom` relation of a requested resource adds one
/// upstream-permission predicate; all of them must be satisfied.
pub struct DerivedFromAuthorizer {
    inner: Arc<dyn Authorizer>,
    resources: ResourceStore,
}

impl DerivedFromAuthorizer {
    /// # Arguments
    /// * `inner` - The authorizer deciding everything but derivation
    /// * `resources` - Registered resource descriptions
    pub fn new(inner: Arc<dyn Authorizer>, resources: ResourceStore) -> Self {
        Self { inner, resources }
    }
}

#[async_trait]
impl Authorizer for DerivedFromAuthorizer {
    async fn permissions(&self, claims: &ClaimSet, query: Option<&[Permission]>) -> Result<Vec<Permission>> {
        self.inner.permissions(claims, query).await
    }

    async fn credentials(&self, permissions: &[Permission], query: Option<&Requirements>) -> Result<Vec<Requirements>> {
        let mut required = self.inner.credentials(permissions, query).await?;
        info!("Computing upstream requirements for {} permission(s)", permissions.len());

        // Only entries the inner authorizer produced are augmented; a
        // missing entry stays a denial.
        for (permission, requirements) in permissions.iter().zip(required.iter_mut()) {
            let Some(resource_id) = permission.resource_id.as_deref() else {
                continue;
            };
            let Some(description) = self.resources.get(resource_id).await? else {
                debug!("No registration for <{}>", resource_id);
                continue;
            };

            let upstream = description.upstream();
            if upstream.is_empty() {
                debug!("No upstream derivation found for <{}>", resource_id);
                continue;
            }
            info!("<{}> has {} upstream derivation relation(s)", resource_id, upstream.len());
            for relation in upstream {
                debug!("Requiring upstream permission {} at {}", relation.derivation_resource_id, relation.issuer);
                requirements.require(
                    UPSTREAM_PERMISSION,
                    ClaimPredicate::UpstreamPermission {
                        issuer: relation.issuer.clone(),
                        derivation_resource_id: relation.derivation_resource_id.clone(),
                    },
                );
            }
        }

        Ok(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::WEBID;
    use crate::models::resource::ResourceDescription;
    use crate::policies::{AllAuthorizer, NamespacedAuthorizer, NoneAuthorizer};
    use crate::storage::{KeyValueStore, MemoryStore};

    async fn store() -> ResourceStore {
        let store: MemoryStore<ResourceDescription> = MemoryStore::new();
        store
            .set(
                "R2",
                ResourceDescription::new(["read"])
                    .derived_from("https://as-a/", "D1")
                    .derived_from("https://as-b/", "D2"),
            )
            .await
            .unwrap();
        store.set("R3", ResourceDescription::new(["read"])).await.unwrap();
        Arc::new(store)
    }

    fn upstream(issuer: &str, id: &str) -> ClaimPredicate {
        ClaimPredicate::UpstreamPermission { issuer: issuer.into(), derivation_resource_id: id.into() }
    }

    #[tokio::test]
    async fn test_every_relation_becomes_a_predicate() {
        let authorizer = DerivedFromAuthorizer::new(Arc::new(AllAuthorizer::new()), store().await);
        let required = authorizer
            .credentials(&[Permission::new("R2", ["read"]), Permission::new("R3", ["read"])], None)
            .await
            .unwrap();

        assert_eq!(
            required[0].predicates(UPSTREAM_PERMISSION),
            &[upstream("https://as-a/", "D1"), upstream("https://as-b/", "D2")]
        );
        assert!(required[1].is_empty());
    }

    #[tokio::test]
    async fn test_inner_requirements_are_kept() {
        let inner = Arc::new(NamespacedAuthorizer::new(Vec::new()));
        let authorizer = DerivedFromAuthorizer::new(inner, store().await);
        let required = authorizer.credentials(&[Permission::new("R2", ["read"])], None).await.unwrap();

        assert_eq!(required[0].predicates(WEBID), &[ClaimPredicate::Any]);
        assert_eq!(required[0].predicates(UPSTREAM_PERMISSION).len(), 2);
    }

    #[tokio::test]
    async fn test_denials_stay_denials() {
        let authorizer = DerivedFromAuthorizer::new(Arc::new(NoneAuthorizer), store().await);
        let required = authorizer.credentials(&[Permission::new("R2", ["read"])], None).await.unwrap();
        assert!(required.is_empty());
    }

    #[tokio::test]
    async fn test_permissions_are_delegated() {
        let authorizer = DerivedFromAuthorizer::new(Arc::new(NoneAuthorizer), store().await);
        let query = [Permission::new("R2", ["read"])];
        assert!(authorizer.permissions(&ClaimSet::new(), Some(&query)).await.unwrap().is_empty());
    }
}
