// src/services/mod.rs
//! Services exposed to resource servers and requesting parties.

pub mod api_server;
pub mod configuration;
pub mod registration;

pub use api_server::ApiServer;
pub use configuration::UmaConfiguration;
pub use registration::{PermissionTicketService, ResourceRegistrar};
