// src/policies/none.rs
use crate::error::Result;
use crate::models::claims::ClaimSet;
use crate::models::permission::Permission;
use crate::models::requirements::Requirements;
use crate::policies::Authorizer;
use async_trait::async_trait;

/// Denies everything.
#[derive(Default)]
pub struct NoneAuthorizer;

#[async_trait]
impl Authorizer for NoneAuthorizer {
    async fn permissions(&self, _claims: &ClaimSet, _query: Option<&[Permission]>) -> Result<Vec<Permission>> {
        Ok(Vec::new())
    }

    async fn credentials(&self, _permissions: &[Permission], _query: Option<&Requirements>) -> Result<Vec<Requirements>> {
        Ok(Vec::new())
    }
}
