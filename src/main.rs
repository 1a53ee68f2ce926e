// src/main.rs

//! # UMA Authorization Server - Main Entry Point
//!
//! Loads [`Settings`], wires verifiers, policies and token factories
//! together and starts the API server.
//!
//! ## Configuration
//! - `UMA_CONFIG`: (Optional) settings file, defaults to `uma.toml`
//! - `UMA__<SECTION>__<KEY>`: overrides single settings
//! - `RUST_LOG`: log filter, defaults to `info`

use anyhow::{bail, Context};
use log::{info, warn};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use uma_server::config::{PolicyKind, PolicySettings, Settings, TokenSettings, VerifierSettings};
use uma_server::credentials::{
    AccessTokenVerifier, JwtVerifier, SolidOidcVerifier, TypedVerifier, UnsecureVerifier, Verifier,
};
use uma_server::dialog::BaseNegotiator;
use uma_server::models::credential::CredentialFormat;
use uma_server::models::resource::ResourceDescription;
use uma_server::models::ticket::Ticket;
use uma_server::policies::{
    AllAuthorizer, Authorizer, DerivedFromAuthorizer, NamespacedAuthorizer, NoneAuthorizer, RulesAuthorizer,
};
use uma_server::services::{ApiServer, PermissionTicketService, ResourceRegistrar};
use uma_server::storage::{MemoryStore, ResourceStore, TicketStore};
use uma_server::ticketing::ClaimEliminationStrategy;
use uma_server::tokens::{IssuedToken, JwtTokenFactory, OpaqueTokenFactory, SigningKeys, TokenFactory};
use uma_server::utils::jwks::KeySetResolver;

/// Builds the authorizer selected in the policy settings
fn authorizer(settings: &PolicySettings, resources: ResourceStore) -> anyhow::Result<Arc<dyn Authorizer>> {
    let base: Arc<dyn Authorizer> = match settings.kind {
        PolicyKind::All => Arc::new(AllAuthorizer::new()),
        PolicyKind::Namespaced => Arc::new(NamespacedAuthorizer::new(settings.namespaces.clone())),
        PolicyKind::Rules => {
            let Some(path) = &settings.rules_file else {
                bail!("policy.rules_file is required for the rules policy");
            };
            Arc::new(RulesAuthorizer::new(path.clone())?)
        }
        PolicyKind::Deny => Arc::new(NoneAuthorizer),
    };

    if settings.derivation {
        return Ok(Arc::new(DerivedFromAuthorizer::new(base, resources)));
    }
    Ok(base)
}

/// Registers a verifier for every enabled credential format
fn verifier(settings: &VerifierSettings) -> Arc<dyn Verifier> {
    let keys = KeySetResolver::http();
    let mut verifier = TypedVerifier::new();

    if settings.unsecure {
        verifier.register(CredentialFormat::Unsecure, Arc::new(UnsecureVerifier::new()));
    }
    if settings.oidc {
        let oidc = SolidOidcVerifier::new(keys.clone()).with_trusted_issuers(settings.oidc_trusted_issuers.clone());
        verifier.register(CredentialFormat::Oidc, Arc::new(oidc));
    }
    if settings.access_token {
        verifier.register(CredentialFormat::AccessToken, Arc::new(AccessTokenVerifier::new(keys.clone())));
    }
    if settings.jwt.enabled {
        let jwt = JwtVerifier::new(
            settings.jwt.allowed_claims.clone(),
            settings.jwt.error_on_extra_claims,
            settings.jwt.verify,
            keys,
        );
        verifier.register(CredentialFormat::Jwt, Arc::new(jwt));
    }

    if !settings.oidc && !settings.access_token && !settings.jwt.enabled && !settings.unsecure {
        warn!("No credential format is enabled, only open resources can be granted");
    }
    Arc::new(verifier)
}

/// Loads or generates the signing keys
fn signing_keys(settings: &TokenSettings) -> anyhow::Result<SigningKeys> {
    match &settings.signing_key {
        Some(path) => {
            let pem = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read signing key {}", path.display()))?;
            Ok(SigningKeys::from_pem(settings.key_id.clone(), &pem)?)
        }
        None => Ok(SigningKeys::generate(settings.key_id.clone())?),
    }
}

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load settings and install the logger
/// 2. Create stores and signing keys
/// 3. Wire policies, verifiers and the negotiator
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let settings = Settings::load().context("Failed to load settings")?;
    let base_url = settings.server.base_url();

    // Shared stores
    let tickets: TicketStore = Arc::new(MemoryStore::<Ticket>::new());
    let resources: ResourceStore = Arc::new(MemoryStore::<ResourceDescription>::new());

    let keys = signing_keys(&settings.tokens)?;
    let jwt = Arc::new(JwtTokenFactory::new(keys, base_url.clone(), settings.tokens.ttl_secs));
    let tokens: Arc<dyn TokenFactory> = if settings.tokens.opaque {
        Arc::new(OpaqueTokenFactory::new(
            Arc::new(MemoryStore::<IssuedToken>::new()),
            settings.tokens.ttl_secs,
        ))
    } else {
        jwt.clone()
    };

    let authorizer = authorizer(&settings.policy, resources.clone())?;
    let strategy = Arc::new(ClaimEliminationStrategy::new(authorizer));
    let negotiator = BaseNegotiator::new(
        verifier(&settings.verifiers),
        tickets.clone(),
        strategy.clone(),
        tokens.clone(),
        resources.clone(),
    );

    let api_server = ApiServer::new(
        Arc::new(negotiator),
        PermissionTicketService::new(strategy, tickets),
        ResourceRegistrar::new(resources),
        tokens,
        jwt,
        &base_url,
    );

    let host: IpAddr = settings
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server.host '{}'", settings.server.host))?;
    let addr = SocketAddr::new(host, settings.server.port);
    info!("UMA server running at http://{} as {}", addr, base_url);

    api_server.run(addr).await.context("API server failed")
}
