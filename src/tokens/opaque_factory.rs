// src/tokens/opaque_factory.rs
//! Opaque access tokens backed by the token store.

use crate::error::{Result, UmaError};
use crate::storage::TokenStore;
use crate::tokens::{AccessToken, SerializedToken, TokenFactory, BEARER};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use uuid::Uuid;

/// A stored grant and the moment it stops being valid.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub token: AccessToken,
    pub expires_at: DateTime<Utc>,
}

/// Hands out random identifiers and keeps the grant server-side.
///
/// Resource servers learn what a token grants through the introspection
/// endpoint. Expired entries are dropped when they are looked up.
pub struct OpaqueTokenFactory {
    store: TokenStore,
    ttl: Duration,
}

impl OpaqueTokenFactory {
    /// # Arguments
    /// * `store` - Where issued grants are kept
    /// * `ttl_secs` - Lifetime of minted tokens
    pub fn new(store: TokenStore, ttl_secs: i64) -> Self {
        Self { store, ttl: Duration::seconds(ttl_secs) }
    }
}

#[async_trait]
impl TokenFactory for OpaqueTokenFactory {
    async fn serialize(&self, token: AccessToken) -> Result<SerializedToken> {
        let id = Uuid::new_v4().to_string();
        let issued = IssuedToken { token, expires_at: Utc::now() + self.ttl };
        self.store.set(&id, issued).await?;
        debug!("Stored opaque token {}", id);
        Ok(SerializedToken { token: id, token_type: BEARER.to_string() })
    }

    async fn deserialize(&self, token: &str) -> Result<AccessToken> {
        let issued = self
            .store
            .get(token)
            .await?
            .ok_or_else(|| UmaError::NotFound("Token not found.".into()))?;

        if issued.expires_at <= Utc::now() {
            debug!("Opaque token {} expired at {}", token, issued.expires_at);
            self.store.delete(token).await?;
            return Err(UmaError::NotFound("Token not found.".into()));
        }
        Ok(issued.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::permission::Permission;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn factory(ttl_secs: i64) -> (OpaqueTokenFactory, Arc<MemoryStore<IssuedToken>>) {
        let store = Arc::new(MemoryStore::<IssuedToken>::new());
        (OpaqueTokenFactory::new(store.clone(), ttl_secs), store)
    }

    #[tokio::test]
    async fn test_opaque_token_is_stored() {
        let (factory, _) = factory(60);
        let grant = AccessToken::new(vec![Permission::new("R1", ["read"])]);

        let serialized = factory.serialize(grant.clone()).await.unwrap();
        assert!(Uuid::parse_str(&serialized.token).is_ok());
        assert_eq!(serialized.token_type, BEARER);
        assert_eq!(factory.deserialize(&serialized.token).await.unwrap(), grant);
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let (factory, _) = factory(60);
        assert!(matches!(factory.deserialize("nope").await, Err(UmaError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_expired_token_is_not_found_and_dropped() {
        let (factory, store) = factory(0);
        let serialized = factory
            .serialize(AccessToken::new(vec![Permission::new("R1", ["read"])]))
            .await
            .unwrap();
        assert!(store.has(&serialized.token).await.unwrap());

        assert!(matches!(factory.deserialize(&serialized.token).await, Err(UmaError::NotFound(_))));
        assert!(!store.has(&serialized.token).await.unwrap());
    }
}
