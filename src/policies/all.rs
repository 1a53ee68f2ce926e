// src/policies/all.rs
use crate::error::Result;
use crate::models::claims::ClaimSet;
use crate::models::permission::Permission;
use crate::models::requirements::Requirements;
use crate::policies::{queried, Authorizer};
use async_trait::async_trait;
use log::{info, warn};

/// Grants every permission to anyone.
pub struct AllAuthorizer;

impl AllAuthorizer {
    pub fn new() -> Self {
        warn!("You are using an AllAuthorizer: every request will be granted.");
        AllAuthorizer
    }
}

impl Default for AllAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authorizer for AllAuthorizer {
    async fn permissions(&self, _claims: &ClaimSet, query: Option<&[Permission]>) -> Result<Vec<Permission>> {
        Ok(queried(query))
    }

    async fn credentials(&self, permissions: &[Permission], _query: Option<&Requirements>) -> Result<Vec<Requirements>> {
        info!("Granting {} permission(s) without requirements", permissions.len());
        Ok(vec![Requirements::new(); permissions.len()])
    }
}
