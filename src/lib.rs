// src/lib.rs
//! # UMA Authorization Server
//!
//! Negotiates access tokens for protected resources following the UMA 2.0
//! grant, with support for resources derived from data guarded by other
//! authorization servers.
//!
//! ## Architecture Overview
//! 1. **Credentials**: verifiers turning presented tokens into claims
//! 2. **Policies**: authorizers deciding what claims grant which permissions
//! 3. **Ticketing**: strategies tracking what is still missing between rounds
//! 4. **Dialog**: the negotiator running one token request
//! 5. **Tokens**: access token minting and the server's signing keys
//! 6. **Services**: ticket and resource registration, the HTTP interface

pub mod config;        // Settings from file and environment
pub mod credentials;   // Credential verification
pub mod dialog;        // Negotiation rounds
pub mod error;         // Error taxonomy
pub mod models;        // Data structures
pub mod policies;      // Authorizers
pub mod services;      // Registration services and API
pub mod storage;       // Key-value stores
pub mod ticketing;     // Ticket lifecycle
pub mod tokens;        // Access tokens and keys
pub mod utils;         // JWT and JWKS helpers

pub use error::{Result, UmaError};
