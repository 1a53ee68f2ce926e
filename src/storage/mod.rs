// src/storage/mod.rs
//! Key-value storage contract used for tickets, resources and tokens.

pub mod memory_store;

use crate::error::Result;
use crate::models::resource::ResourceDescription;
use crate::models::ticket::Ticket;
use crate::tokens::IssuedToken;
use async_trait::async_trait;
use std::sync::Arc;

pub use memory_store::MemoryStore;

/// Asynchronous key-value store.
#[async_trait]
pub trait KeyValueStore<V>: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<V>>;

    async fn set(&self, key: &str, value: V) -> Result<()>;

    /// Returns `true` if an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn has(&self, key: &str) -> Result<bool>;

    /// Atomically fetches and removes an entry.
    ///
    /// Of several concurrent callers asking for the same key, at most one
    /// receives the value.
    async fn take(&self, key: &str) -> Result<Option<V>>;
}

/// Pending negotiation tickets by id.
pub type TicketStore = Arc<dyn KeyValueStore<Ticket>>;
/// Registered resources by resource id.
pub type ResourceStore = Arc<dyn KeyValueStore<ResourceDescription>>;
/// Issued access tokens by opaque id.
pub type TokenStore = Arc<dyn KeyValueStore<IssuedToken>>;
