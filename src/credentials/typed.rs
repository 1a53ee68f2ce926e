// src/credentials/typed.rs
use crate::credentials::Verifier;
use crate::error::{Result, UmaError};
use crate::models::claims::ClaimSet;
use crate::models::credential::{Credential, CredentialFormat};
use async_trait::async_trait;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

/// Routes each credential to the verifier registered for its format.
#[derive(Clone, Default)]
pub struct TypedVerifier {
    verifiers: HashMap<CredentialFormat, Arc<dyn Verifier>>,
}

impl TypedVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `verifier` for `format`, replacing any previous one.
    pub fn register(&mut self, format: CredentialFormat, verifier: Arc<dyn Verifier>) {
        self.verifiers.insert(format, verifier);
    }

    pub fn with(mut self, format: CredentialFormat, verifier: Arc<dyn Verifier>) -> Self {
        self.register(format, verifier);
        self
    }
}

#[async_trait]
impl Verifier for TypedVerifier {
    async fn verify(&self, credential: &Credential, claims: ClaimSet) -> Result<ClaimSet> {
        match self.verifiers.get(&credential.format) {
            Some(verifier) => verifier.verify(credential, claims).await,
            None => {
                warn!("No verifier configured for format <{}>", credential.format);
                Err(UmaError::BadRequest(format!(
                    "Unsupported claim token format '{}'.",
                    credential.format
                )))
            }
        }
    }

    fn supports(&self, format: CredentialFormat) -> bool {
        self.verifiers.contains_key(&format)
    }
}
