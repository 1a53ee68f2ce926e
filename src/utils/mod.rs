// src/utils/mod.rs
pub mod jwks;
pub mod jwt;
