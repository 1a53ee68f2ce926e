// src/dialog/base_negotiator.rs
//! The default negotiator.
//!
//! One round goes through these steps:
//! 1. Validate the request and the credential formats before touching any
//!    state
//! 2. Consume the presented ticket, or start a new one
//! 3. Add requested scopes, restarting the ticket if there are any
//! 4. Verify all pushed credentials concurrently
//! 5. Resolve: mint a token, or store the ticket under a new id and list
//!    what is still missing

use crate::credentials::Verifier;
use crate::dialog::Negotiator;
use crate::error::{Result, UmaError};
use crate::models::claims::ClaimSet;
use crate::models::credential::{Credential, UPSTREAM_PERMISSION};
use crate::models::dialog::{DialogInput, DialogOutcome, DialogOutput, NeedInfo, RequiredClaim};
use crate::models::permission::{Permission, DERIVATION_CREATION};
use crate::models::requirements::ClaimPredicate;
use crate::models::resource::ResourceDescription;
use crate::models::ticket::{Resolution, Ticket};
use crate::storage::{ResourceStore, TicketStore};
use crate::ticketing::TicketingStrategy;
use crate::tokens::{AccessToken, TokenFactory};
use async_trait::async_trait;
use futures::future::try_join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

/// Negotiator driven by a [`TicketingStrategy`].
pub struct BaseNegotiator {
    verifier: Arc<dyn Verifier>,
    tickets: TicketStore,
    strategy: Arc<dyn TicketingStrategy>,
    tokens: Arc<dyn TokenFactory>,
    resources: ResourceStore,
}

impl BaseNegotiator {
    /// # Arguments
    /// * `verifier` - Verifies pushed credentials
    /// * `tickets` - Pending tickets between rounds
    /// * `strategy` - Ticket lifecycle
    /// * `tokens` - Mints access tokens
    /// * `resources` - Receives derivation handles
    pub fn new(
        verifier: Arc<dyn Verifier>,
        tickets: TicketStore,
        strategy: Arc<dyn TicketingStrategy>,
        tokens: Arc<dyn TokenFactory>,
        resources: ResourceStore,
    ) -> Self {
        Self { verifier, tickets, strategy, tokens, resources }
    }

    /// Consumes the presented ticket or creates one for the requested
    /// permissions.
    async fn ticket(&self, input: &DialogInput) -> Result<Ticket> {
        match (&input.ticket, &input.permissions) {
            (Some(id), _) => self.tickets.take(id).await?.ok_or_else(|| {
                warn!("Unknown ticket {}", id);
                UmaError::BadRequest("The provided ticket is not valid.".into())
            }),
            (None, Some(permissions)) => self.strategy.initialize_ticket(permissions.clone()).await,
            (None, None) => Err(UmaError::BadRequest(
                "A token request without existing ticket should include requested permissions.".into(),
            )),
        }
    }

    /// Verifies every credential and validates the resulting claims
    /// against `ticket`.
    async fn process_credentials(&self, credentials: &[Credential], ticket: &Ticket) -> Result<Ticket> {
        if credentials.is_empty() {
            return Ok(ticket.clone());
        }

        let verified = try_join_all(
            credentials
                .iter()
                .map(|credential| self.verifier.verify(credential, ClaimSet::new())),
        )
        .await?;

        let mut claims = ClaimSet::new();
        for set in verified {
            claims.merge(set);
        }
        debug!("Verified claims {:?}", claims);

        if claims.is_empty() {
            return Ok(ticket.clone());
        }
        self.strategy.validate_claims(ticket, claims).await
    }

    async fn grant(&self, permissions: Vec<Permission>, scopes: &[String]) -> Result<DialogOutput> {
        let serialized = self.tokens.serialize(AccessToken::new(permissions)).await?;
        let mut output = DialogOutput {
            access_token: serialized.token,
            token_type: serialized.token_type,
            derivation_resource_id: None,
        };

        if scopes.iter().any(|scope| scope == DERIVATION_CREATION) {
            let handle = Uuid::new_v4().to_string();
            self.resources.set(&handle, ResourceDescription::derivation_handle()).await?;
            info!("Registered derivation handle {}", handle);
            output.derivation_resource_id = Some(handle);
        }
        Ok(output)
    }
}

/// What the requester still has to present for `ticket`.
///
/// Upstream-permission predicates become descriptors pointing at the
/// upstream server; every other outstanding claim name is listed once.
pub fn required_claims(ticket: &Ticket) -> Vec<RequiredClaim> {
    let mut required = Vec::new();
    let mut push = |claim: RequiredClaim| {
        if !required.contains(&claim) {
            required.push(claim);
        }
    };

    for requirements in &ticket.required {
        for (name, predicates) in requirements.iter() {
            for predicate in predicates {
                match predicate {
                    ClaimPredicate::UpstreamPermission { issuer, derivation_resource_id } if name == UPSTREAM_PERMISSION => {
                        push(RequiredClaim::upstream(issuer.clone(), derivation_resource_id.clone()))
                    }
                    _ => push(RequiredClaim::claim(name)),
                }
            }
        }
    }
    required
}

#[async_trait]
impl Negotiator for BaseNegotiator {
    async fn negotiate(&self, input: DialogInput) -> Result<DialogOutcome> {
        input.validate().map_err(|e| {
            warn!("{}", e);
            e
        })?;
        let credentials = input.credentials()?;
        if let Some(credential) = credentials.iter().find(|c| !self.verifier.supports(c.format)) {
            warn!("No verifier configured for format <{}>", credential.format);
            return Err(UmaError::BadRequest(format!(
                "Unsupported claim token format '{}'.",
                credential.format
            )));
        }
        let scopes = input.additional_scopes();

        let mut ticket = self.ticket(&input).await?;
        debug!("Processing ticket {:?}", ticket);

        if !scopes.is_empty() {
            let mut permissions = ticket.permissions;
            for permission in &mut permissions {
                permission.add_scopes(&scopes);
            }
            ticket = self.strategy.initialize_ticket(permissions).await?;
            debug!("Updated ticket with additional scopes {:?}", ticket);
        }

        let ticket = self.process_credentials(&credentials, &ticket).await?;

        match self.strategy.resolve_ticket(&ticket).await? {
            Resolution::Success(permissions) => {
                info!("Granting {} permission(s)", permissions.len());
                let output = self.grant(permissions, &scopes).await?;
                Ok(DialogOutcome::Granted(output))
            }
            Resolution::Failure => {
                let required = if ticket.required.len() < ticket.permissions.len() {
                    Vec::new()
                } else {
                    required_claims(&ticket)
                };
                if required.is_empty() {
                    info!("Denying request for {:?}", ticket.permissions);
                    return Err(UmaError::Forbidden);
                }

                let id = Uuid::new_v4().to_string();
                self.tickets.set(&id, ticket).await?;
                info!("Need more info for ticket {}", id);
                Ok(DialogOutcome::NeedInfo(NeedInfo { ticket: id, required_claims: required }))
            }
        }
    }
}
