// src/error.rs
//! Error taxonomy shared by every layer of the authorization server.
//!
//! A "need more information" result is deliberately *not* an error: the
//! negotiator returns it as [`crate::models::dialog::DialogOutcome::NeedInfo`].

use thiserror::Error;

/// Errors raised by verifiers, authorizers, stores and the negotiator.
#[derive(Debug, Error)]
pub enum UmaError {
    /// Malformed request: missing field combinations, unknown ticket,
    /// incomplete credential pair or unsupported credential format.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A presented credential failed verification.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// Resolution failed and there is nothing left to ask the requester for.
    #[error("access denied")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    /// Store or infrastructure failure. Fatal for the current round.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A remote document (key set, discovery document) could not be obtained.
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("token error: {0}")]
    Token(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, UmaError>;

impl UmaError {
    /// Wraps any displayable cause as an invalid-credential failure.
    pub fn invalid_credential(cause: impl std::fmt::Display) -> Self {
        UmaError::InvalidCredential(cause.to_string())
    }

    /// `true` for failures caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UmaError::BadRequest(_)
                | UmaError::InvalidCredential(_)
                | UmaError::Forbidden
                | UmaError::NotFound(_)
        )
    }
}
