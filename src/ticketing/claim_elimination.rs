// src/ticketing/claim_elimination.rs
use crate::error::Result;
use crate::models::claims::ClaimSet;
use crate::models::permission::Permission;
use crate::models::requirements::Requirements;
use crate::models::ticket::{Resolution, Ticket};
use crate::policies::Authorizer;
use crate::ticketing::TicketingStrategy;
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// Strikes requirements off as claims satisfy them.
///
/// The ticket starts with the requirements the authorizer asks for and is
/// resolved once every one of them is gone. Requirements only ever shrink.
pub struct ClaimEliminationStrategy {
    authorizer: Arc<dyn Authorizer>,
}

impl ClaimEliminationStrategy {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }
}

#[async_trait]
impl TicketingStrategy for ClaimEliminationStrategy {
    async fn initialize_ticket(&self, permissions: Vec<Permission>) -> Result<Ticket> {
        let required = self.authorizer.credentials(&permissions, None).await?;
        debug!("Initialized ticket requiring {:?}", required);
        Ok(Ticket::new(permissions, required))
    }

    async fn validate_claims(&self, ticket: &Ticket, claims: ClaimSet) -> Result<Ticket> {
        let mut provided = ticket.provided.clone();
        provided.merge(claims);

        let required: Vec<Requirements> = ticket.required.iter().map(|r| r.eliminate(&provided)).collect();
        Ok(Ticket { permissions: ticket.permissions.clone(), required, provided })
    }

    async fn resolve_ticket(&self, ticket: &Ticket) -> Result<Resolution> {
        if ticket.is_fully_satisfied() {
            Ok(Resolution::Success(ticket.permissions.clone()))
        } else {
            Ok(Resolution::Failure)
        }
    }
}
