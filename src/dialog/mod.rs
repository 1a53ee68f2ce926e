// src/dialog/mod.rs
//! Negotiation rounds of the UMA grant.

pub mod base_negotiator;

use crate::error::Result;
use crate::models::dialog::{DialogInput, DialogOutcome};
use async_trait::async_trait;

pub use base_negotiator::BaseNegotiator;

/// Runs one round of the token-endpoint dialog.
#[async_trait]
pub trait Negotiator: Send + Sync {
    /// Either grants a token or answers with the claims still missing.
    ///
    /// # Errors
    /// Malformed requests, invalid credentials, terminal denials and
    /// infrastructure failures.
    async fn negotiate(&self, input: DialogInput) -> Result<DialogOutcome>;
}
