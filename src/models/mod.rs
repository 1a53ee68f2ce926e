// src/models/mod.rs
//! Data structures exchanged between the negotiation components.

pub mod claims;
pub mod credential;
pub mod dialog;
pub mod permission;
pub mod requirements;
pub mod resource;
pub mod ticket;
