// src/ticketing/immediate.rs
use crate::error::Result;
use crate::models::claims::ClaimSet;
use crate::models::permission::Permission;
use crate::models::ticket::{Resolution, Ticket};
use crate::policies::Authorizer;
use crate::ticketing::TicketingStrategy;
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// Asks the authorizer directly, using every claim gathered so far.
///
/// `required` is only kept to tell the requester what to present; the
/// decision comes from [`Authorizer::permissions`].
pub struct ImmediateAuthorizerStrategy {
    authorizer: Arc<dyn Authorizer>,
}

impl ImmediateAuthorizerStrategy {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }
}

#[async_trait]
impl TicketingStrategy for ImmediateAuthorizerStrategy {
    async fn initialize_ticket(&self, permissions: Vec<Permission>) -> Result<Ticket> {
        let required = self.authorizer.credentials(&permissions, None).await?;
        Ok(Ticket::new(permissions, required))
    }

    async fn validate_claims(&self, ticket: &Ticket, claims: ClaimSet) -> Result<Ticket> {
        let mut updated = ticket.clone();
        updated.provided.merge(claims);
        Ok(updated)
    }

    async fn resolve_ticket(&self, ticket: &Ticket) -> Result<Resolution> {
        let granted = self
            .authorizer
            .permissions(&ticket.provided, Some(&ticket.permissions))
            .await?;
        debug!("Authorizer granted {:?}", granted);

        let covered = ticket
            .permissions
            .iter()
            .all(|requested| granted.iter().any(|grant| grant.covers(requested)));
        if covered && !ticket.permissions.is_empty() {
            Ok(Resolution::Success(ticket.permissions.clone()))
        } else {
            Ok(Resolution::Failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::WEBID;
    use crate::policies::{NamespacedAuthorizer, NoneAuthorizer};

    fn alice() -> ClaimSet {
        let mut claims = ClaimSet::new();
        claims.push(WEBID, "https://alice.example/#me");
        claims
    }

    #[tokio::test]
    async fn test_resolves_once_authorizer_grants() {
        let strategy =
            ImmediateAuthorizerStrategy::new(Arc::new(NamespacedAuthorizer::new(vec!["https://pod/".into()])));
        let ticket = strategy
            .initialize_ticket(vec![Permission::new("https://pod/notes", ["read"])])
            .await
            .unwrap();
        assert_eq!(strategy.resolve_ticket(&ticket).await.unwrap(), Resolution::Failure);

        let ticket = strategy.validate_claims(&ticket, alice()).await.unwrap();
        assert!(strategy.resolve_ticket(&ticket).await.unwrap().is_success());
        // Requirements are left for disclosure only.
        assert_eq!(ticket.required.len(), 1);
    }

    #[tokio::test]
    async fn test_partial_grant_fails() {
        let strategy =
            ImmediateAuthorizerStrategy::new(Arc::new(NamespacedAuthorizer::new(vec!["https://pod/".into()])));
        let ticket = strategy
            .initialize_ticket(vec![
                Permission::new("https://pod/notes", ["read"]),
                Permission::new("https://elsewhere/notes", ["read"]),
            ])
            .await
            .unwrap();
        let ticket = strategy.validate_claims(&ticket, alice()).await.unwrap();
        assert_eq!(strategy.resolve_ticket(&ticket).await.unwrap(), Resolution::Failure);
    }

    #[tokio::test]
    async fn test_none_authorizer_never_resolves() {
        let strategy = ImmediateAuthorizerStrategy::new(Arc::new(NoneAuthorizer));
        let ticket = strategy.initialize_ticket(vec![Permission::new("R1", ["read"])]).await.unwrap();
        let ticket = strategy.validate_claims(&ticket, alice()).await.unwrap();
        assert!(!strategy.resolve_ticket(&ticket).await.unwrap().is_success());
    }
}
