// src/policies/mod.rs
//! Authorization policies.
//!
//! An [`Authorizer`] answers two questions:
//! - which permissions a requester holding some claims may be granted
//! - which claims must be proven before a list of permissions is granted
//!
//! Authorizers compose by wrapping: [`DerivedFromAuthorizer`] owns another
//! authorizer and adds upstream requirements to its answers.

pub mod all;
pub mod derived_from;
pub mod namespaced;
pub mod none;
pub mod rules;

use crate::error::Result;
use crate::models::claims::ClaimSet;
use crate::models::permission::Permission;
use crate::models::requirements::Requirements;
use async_trait::async_trait;

pub use all::AllAuthorizer;
pub use derived_from::DerivedFromAuthorizer;
pub use namespaced::NamespacedAuthorizer;
pub use none::NoneAuthorizer;
pub use rules::RulesAuthorizer;

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Permissions the holder of `claims` may be granted.
    ///
    /// When `query` is given, the answer is restricted to it.
    async fn permissions(&self, claims: &ClaimSet, query: Option<&[Permission]>) -> Result<Vec<Permission>>;

    /// Proof obligations for `permissions`, index-aligned.
    ///
    /// An empty entry grants the permission outright. A missing entry (the
    /// result being shorter than `permissions`) means it can never be granted.
    /// When `query` is given, it lists the claims the caller is able to
    /// supply; policies may deny when they would need anything else.
    async fn credentials(&self, permissions: &[Permission], query: Option<&Requirements>) -> Result<Vec<Requirements>>;
}

/// The requested permissions, or "everything" when nothing was asked for.
pub(crate) fn queried(query: Option<&[Permission]>) -> Vec<Permission> {
    match query {
        Some(query) => query.to_vec(),
        None => vec![Permission::default()],
    }
}
