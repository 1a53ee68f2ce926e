// src/ticketing/mod.rs
//! Ticket lifecycle strategies.
//!
//! A strategy decides how a ticket starts out, how presented claims change
//! it, and when it can be resolved into granted permissions. Strategies
//! never mutate the ticket they are given; they return a new one.

pub mod claim_elimination;
pub mod immediate;

use crate::error::Result;
use crate::models::claims::ClaimSet;
use crate::models::permission::Permission;
use crate::models::ticket::{Resolution, Ticket};
use async_trait::async_trait;

pub use claim_elimination::ClaimEliminationStrategy;
pub use immediate::ImmediateAuthorizerStrategy;

#[async_trait]
pub trait TicketingStrategy: Send + Sync {
    /// Creates the ticket for a fresh negotiation.
    async fn initialize_ticket(&self, permissions: Vec<Permission>) -> Result<Ticket>;

    /// Returns `ticket` updated with newly verified `claims`.
    async fn validate_claims(&self, ticket: &Ticket, claims: ClaimSet) -> Result<Ticket>;

    /// Decides whether the ticket grants its permissions.
    async fn resolve_ticket(&self, ticket: &Ticket) -> Result<Resolution>;
}
