// src/credentials/mod.rs
//! Credential verification.
//!
//! A [`Verifier`] turns one presented [`Credential`] into claims. Each
//! implementation understands a single format; [`TypedVerifier`] routes a
//! credential to the implementation registered for its format.

pub mod access_token;
pub mod jwt;
pub mod oidc;
pub mod typed;
pub mod unsecure;

use crate::error::{Result, UmaError};
use crate::models::claims::ClaimSet;
use crate::models::credential::{Credential, CredentialFormat};
use async_trait::async_trait;

pub use access_token::AccessTokenVerifier;
pub use jwt::JwtVerifier;
pub use oidc::SolidOidcVerifier;
pub use typed::TypedVerifier;
pub use unsecure::UnsecureVerifier;

/// Extracts claims from credentials.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verifies `credential` and appends what it proves to `claims`.
    ///
    /// Values already in `claims` are kept.
    ///
    /// # Errors
    /// `InvalidCredential` when the credential is not in the expected format
    /// or fails verification.
    async fn verify(&self, credential: &Credential, claims: ClaimSet) -> Result<ClaimSet>;

    /// Whether credentials in `format` can be verified at all.
    fn supports(&self, _format: CredentialFormat) -> bool {
        true
    }
}

pub(crate) fn ensure_format(credential: &Credential, expected: CredentialFormat) -> Result<()> {
    if credential.format != expected {
        return Err(UmaError::InvalidCredential(format!(
            "Token format '{}' does not match this processor's format.",
            credential.format
        )));
    }
    Ok(())
}

/// Rewraps any failure as `InvalidCredential`, prefixed with `context`.
pub(crate) fn credential_error(context: &str, err: UmaError) -> UmaError {
    let message = match err {
        UmaError::InvalidCredential(message) | UmaError::Fetch(message) => message,
        other => other.to_string(),
    };
    UmaError::InvalidCredential(format!("{}: {}", context, message))
}
