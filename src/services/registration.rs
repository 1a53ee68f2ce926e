// src/services/registration.rs
//! Resource registration and permission tickets.
//!
//! Resource servers use these services before any requester shows up:
//! they register the resources they protect, including derivation
//! relations, and ask for tickets when a request arrives without a token.

use crate::error::{Result, UmaError};
use crate::models::permission::{validate_permissions, Permission};
use crate::models::resource::ResourceDescription;
use crate::storage::{ResourceStore, TicketStore};
use crate::ticketing::TicketingStrategy;
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

/// Keeps the registry of protected resources.
pub struct ResourceRegistrar {
    resources: ResourceStore,
}

impl ResourceRegistrar {
    pub fn new(resources: ResourceStore) -> Self {
        Self { resources }
    }

    /// Registers a resource under a fresh identifier.
    ///
    /// # Arguments
    /// * `description` - Scopes and relations of the resource
    ///
    /// # Returns
    /// The identifier the resource server uses from now on
    ///
    /// # Errors
    /// `BadRequest` if the description is invalid.
    pub async fn register(&self, description: ResourceDescription) -> Result<String> {
        description.validate()?;

        let id = Uuid::new_v4().to_string();
        debug!("Registering resource {:?}", description);
        self.resources.set(&id, description).await?;
        info!("Registered resource {}", id);
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ResourceDescription>> {
        self.resources.get(id).await
    }

    /// Removes a registered resource.
    ///
    /// # Errors
    /// `NotFound` if no resource has this identifier.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.resources.delete(id).await? {
            return Err(UmaError::NotFound(format!("Resource {} is not registered.", id)));
        }
        info!("Deleted resource {}", id);
        Ok(())
    }
}

/// Issues permission tickets for resource servers.
pub struct PermissionTicketService {
    strategy: Arc<dyn TicketingStrategy>,
    tickets: TicketStore,
}

impl PermissionTicketService {
    pub fn new(strategy: Arc<dyn TicketingStrategy>, tickets: TicketStore) -> Self {
        Self { strategy, tickets }
    }

    /// Starts a negotiation for `permissions`.
    ///
    /// # Returns
    /// `None` when the permissions can be granted without further claims,
    /// otherwise the id of the stored ticket
    ///
    /// # Errors
    /// `BadRequest` for invalid permissions.
    pub async fn request_ticket(&self, permissions: Vec<Permission>) -> Result<Option<String>> {
        validate_permissions(&permissions)?;

        let ticket = self.strategy.initialize_ticket(permissions).await?;
        if self.strategy.resolve_ticket(&ticket).await?.is_success() {
            debug!("Permissions {:?} need no ticket", ticket.permissions);
            return Ok(None);
        }

        let id = Uuid::new_v4().to_string();
        self.tickets.set(&id, ticket).await?;
        info!("Issued ticket {}", id);
        Ok(Some(id))
    }
}
