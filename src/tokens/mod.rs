// src/tokens/mod.rs
//! Access tokens and the factories that mint them.

pub mod jwt_factory;
pub mod opaque_factory;
pub mod signing;

use crate::error::Result;
use crate::models::permission::Permission;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use jwt_factory::JwtTokenFactory;
pub use opaque_factory::{IssuedToken, OpaqueTokenFactory};
pub use signing::SigningKeys;

/// Token type of every token this server mints.
pub const BEARER: &str = "Bearer";

/// What an access token grants.
///
/// # Fields
/// - `permissions`: the granted permissions
/// - `contract`: an optional usage contract attached to the grant
/// - `active`: set on introspection results
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AccessToken {
    pub permissions: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl AccessToken {
    pub fn new(permissions: Vec<Permission>) -> Self {
        Self { permissions, ..Self::default() }
    }
}

/// A minted token as handed to the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SerializedToken {
    pub token: String,
    pub token_type: String,
}

#[async_trait]
pub trait TokenFactory: Send + Sync {
    async fn serialize(&self, token: AccessToken) -> Result<SerializedToken>;

    /// Recovers the token from its serialized form.
    async fn deserialize(&self, token: &str) -> Result<AccessToken>;
}
