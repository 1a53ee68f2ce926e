// src/services/api_server.rs
//! HTTP interface of the authorization server
//!
//! Every route lives under `/uma`:
//! - Discovery document and public keys
//! - The UMA token endpoint, where negotiation happens
//! - Permission tickets and resource registration for resource servers
//! - Token introspection

use crate::dialog::Negotiator;
use crate::error::UmaError;
use crate::models::dialog::{DialogInput, DialogOutcome};
use crate::models::permission::Permission;
use crate::models::resource::ResourceDescription;
use crate::services::configuration::UmaConfiguration;
use crate::services::registration::{PermissionTicketService, ResourceRegistrar};
use crate::tokens::{AccessToken, JwtTokenFactory, TokenFactory};
use axum::{
    extract::{rejection::JsonRejection, Form, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Response for a newly registered resource
#[derive(Serialize, Deserialize, Debug)]
struct RegisterResourceResponse {
    #[serde(rename = "_id")]
    id: String,
    user_access_policy_uri: String,
}

/// Response carrying a new permission ticket
#[derive(Serialize, Deserialize, Debug)]
struct TicketResponse {
    ticket: String,
}

/// Form body of an introspection request
#[derive(Deserialize, Debug)]
struct IntrospectionRequest {
    token: String,
}

impl IntoResponse for UmaError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            UmaError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            UmaError::InvalidCredential(_) => (StatusCode::BAD_REQUEST, "invalid_grant"),
            UmaError::Forbidden => (StatusCode::FORBIDDEN, "request_denied"),
            UmaError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            UmaError::Fetch(_) => (StatusCode::BAD_GATEWAY, "server_error"),
            UmaError::Storage(_) | UmaError::Token(_) | UmaError::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
            }
        };

        if self.is_client_error() {
            warn!("{}", self);
        } else {
            error!("{}", self);
        }
        (status, Json(json!({ "error": code, "message": self.to_string() }))).into_response()
    }
}

/// Main API server structure holding all service dependencies
pub struct ApiServer {
    /// Runs the token endpoint's negotiation rounds
    negotiator: Arc<dyn Negotiator>,

    /// Issues permission tickets
    tickets: Arc<PermissionTicketService>,

    /// Registry of protected resources
    registrar: Arc<ResourceRegistrar>,

    /// Factory of the tokens handed out by the negotiator
    tokens: Arc<dyn TokenFactory>,

    /// Signs introspection results; its keys are published at `/keys`
    jwt: Arc<JwtTokenFactory>,

    /// Discovery document
    configuration: UmaConfiguration,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `negotiator` - Negotiator behind the token endpoint
    /// * `tickets` - Permission ticket service
    /// * `registrar` - Resource registrar
    /// * `tokens` - Token factory the negotiator mints with
    /// * `jwt` - JWT factory holding this server's signing keys
    /// * `base_url` - Public URL of the `/uma` prefix, also the token issuer
    pub fn new(
        negotiator: Arc<dyn Negotiator>,
        tickets: PermissionTicketService,
        registrar: ResourceRegistrar,
        tokens: Arc<dyn TokenFactory>,
        jwt: Arc<JwtTokenFactory>,
        base_url: &str,
    ) -> Self {
        ApiServer {
            negotiator,
            tickets: Arc::new(tickets),
            registrar: Arc::new(registrar),
            tokens,
            jwt,
            configuration: UmaConfiguration::new(base_url),
        }
    }

    /// Builds the application router
    pub fn router(&self) -> Router {
        let uma = Router::new()
            .route("/.well-known/uma2-configuration", get(Self::configuration_handler))
            .route("/keys", get(Self::keys_handler))
            .route("/token", post(Self::token_handler))
            .route("/ticket", post(Self::ticket_handler))
            .route("/resources", post(Self::register_resource_handler))
            .route("/resources/:id", delete(Self::delete_resource_handler))
            .route("/introspect", post(Self::introspection_handler))
            .with_state(Arc::new(self.clone()));

        Router::new().nest("/uma", uma).layer(CorsLayer::permissive())
    }

    /// Starts the API server
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind the server to
    ///
    /// # Errors
    /// Fails if the address cannot be bound.
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await
    }

    // =====================
    // Discovery
    // =====================

    /// Returns the UMA discovery document
    ///
    /// # Endpoint
    /// GET /uma/.well-known/uma2-configuration
    async fn configuration_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        Json(state.configuration.clone())
    }

    /// Returns the public keys tokens are signed with
    ///
    /// # Endpoint
    /// GET /uma/keys
    async fn keys_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        Json(state.jwt.keys().jwks())
    }

    // =====================
    // Negotiation
    // =====================

    /// Runs one negotiation round
    ///
    /// # Endpoint
    /// POST /uma/token
    ///
    /// # Request Body
    /// JSON token request with a ticket or permissions, plus claim tokens
    ///
    /// # Responses
    /// - 200 OK: Access token
    /// - 400 Bad Request: Malformed request or invalid credential
    /// - 403 Forbidden: `{ticket, required_claims}` when more claims can
    ///   change the outcome, an error body when they cannot
    /// - 415 Unsupported Media Type: Body is not JSON
    async fn token_handler(
        State(state): State<Arc<ApiServer>>,
        payload: Result<Json<DialogInput>, JsonRejection>,
    ) -> Result<Response, UmaError> {
        let Json(input) = match payload {
            Ok(payload) => payload,
            Err(JsonRejection::MissingJsonContentType(_)) => {
                return Ok((
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    Json(json!({ "error": "invalid_request", "message": "Only JSON requests are supported." })),
                )
                    .into_response());
            }
            Err(rejection) => return Err(UmaError::BadRequest(rejection.body_text())),
        };

        debug!("Token request {:?}", input);
        match state.negotiator.negotiate(input).await? {
            DialogOutcome::Granted(output) => Ok((StatusCode::OK, Json(output)).into_response()),
            DialogOutcome::NeedInfo(need_info) => Ok((StatusCode::FORBIDDEN, Json(need_info)).into_response()),
        }
    }

    // =====================
    // Resource Server Interface
    // =====================

    /// Requests a permission ticket
    ///
    /// # Endpoint
    /// POST /uma/ticket
    ///
    /// # Request Body
    /// JSON array of permissions
    ///
    /// # Responses
    /// - 200 OK: The permissions are granted without negotiation
    /// - 201 Created: Returns the ticket
    /// - 400 Bad Request: Invalid permissions
    async fn ticket_handler(
        State(state): State<Arc<ApiServer>>,
        Json(permissions): Json<Vec<Permission>>,
    ) -> Result<Response, UmaError> {
        match state.tickets.request_ticket(permissions).await? {
            Some(ticket) => Ok((StatusCode::CREATED, Json(TicketResponse { ticket })).into_response()),
            None => Ok(StatusCode::OK.into_response()),
        }
    }

    /// Registers a resource
    ///
    /// # Endpoint
    /// POST /uma/resources
    ///
    /// # Request Body
    /// JSON resource description, optionally with derivation relations
    ///
    /// # Responses
    /// - 201 Created: Returns the resource id
    /// - 400 Bad Request: Invalid description
    async fn register_resource_handler(
        State(state): State<Arc<ApiServer>>,
        Json(description): Json<ResourceDescription>,
    ) -> Result<Response, UmaError> {
        let id = state.registrar.register(description).await?;
        let user_access_policy_uri = format!("{}/policies", state.configuration.issuer);
        Ok((StatusCode::CREATED, Json(RegisterResourceResponse { id, user_access_policy_uri })).into_response())
    }

    /// Deletes a registered resource
    ///
    /// # Endpoint
    /// DELETE /uma/resources/:id
    ///
    /// # Responses
    /// - 204 No Content: Resource removed
    /// - 404 Not Found: Unknown resource
    async fn delete_resource_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> Result<StatusCode, UmaError> {
        state.registrar.delete(&id).await?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// Introspects an access token
    ///
    /// # Endpoint
    /// POST /uma/introspect
    ///
    /// # Request Body
    /// Form with a `token` field
    ///
    /// # Responses
    /// - 200 OK: The token as a signed JWT with `active: true`
    /// - 400 Bad Request: The token is not valid
    /// - 404 Not Found: Unknown opaque token
    async fn introspection_handler(
        State(state): State<Arc<ApiServer>>,
        Form(request): Form<IntrospectionRequest>,
    ) -> Result<Response, UmaError> {
        let token = state.tokens.deserialize(&request.token).await?;
        debug!("Introspected token with {} permission(s)", token.permissions.len());
        let introspected = state.jwt.serialize(AccessToken { active: Some(true), ..token }).await?;
        Ok((StatusCode::OK, Json(introspected)).into_response())
    }
}

// Implement Clone for ApiServer to allow sharing across threads
impl Clone for ApiServer {
    fn clone(&self) -> Self {
        ApiServer {
            negotiator: Arc::clone(&self.negotiator),
            tickets: Arc::clone(&self.tickets),
            registrar: Arc::clone(&self.registrar),
            tokens: Arc::clone(&self.tokens),
            jwt: Arc::clone(&self.jwt),
            configuration: self.configuration.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{TypedVerifier, UnsecureVerifier};
    use crate::dialog::BaseNegotiator;
    use crate::models::credential::{CredentialFormat, UNSECURE, WEBID};
    use crate::models::ticket::Ticket;
    use crate::policies::NamespacedAuthorizer;
    use crate::services::configuration::UMA_TICKET_GRANT;
    use crate::storage::{MemoryStore, TicketStore};
    use crate::ticketing::ClaimEliminationStrategy;
    use crate::tokens::SigningKeys;
    use crate::utils::jwt::decode_unverified;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    const BASE_URL: &str = "https://as.example/uma";
    const POD: &str = "https://pod.example/";

    fn server() -> ApiServer {
        let pem = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/issuer_key.pem"));
        let keys = SigningKeys::from_pem("as-1", pem).unwrap();

        let tickets: TicketStore = Arc::new(MemoryStore::<Ticket>::new());
        let resources = Arc::new(MemoryStore::<ResourceDescription>::new());
        let strategy = Arc::new(ClaimEliminationStrategy::new(Arc::new(NamespacedAuthorizer::new(vec![POD.into()]))));
        let verifier = TypedVerifier::new().with(CredentialFormat::Unsecure, Arc::new(UnsecureVerifier::new()));
        let jwt = Arc::new(JwtTokenFactory::new(keys, BASE_URL, 300));
        let tokens: Arc<dyn TokenFactory> = jwt.clone();

        let negotiator = BaseNegotiator::new(
            Arc::new(verifier),
            tickets.clone(),
            strategy.clone(),
            tokens.clone(),
            resources.clone(),
        );
        ApiServer::new(
            Arc::new(negotiator),
            PermissionTicketService::new(strategy, tickets),
            ResourceRegistrar::new(resources),
            tokens,
            jwt,
            BASE_URL,
        )
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    #[tokio::test]
    async fn test_discovery_and_keys() {
        let router = server().router();

        let request = Request::get("/uma/.well-known/uma2-configuration").body(Body::empty()).unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["issuer"], BASE_URL);
        assert_eq!(body["jwks_uri"], "https://as.example/uma/keys");

        let (status, body) = send(&router, Request::get("/uma/keys").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keys"][0]["kid"], "as-1");
        assert_eq!(body["keys"][0]["alg"], "RS256");
    }

    #[tokio::test]
    async fn test_need_info_then_token() {
        let router = server().router();
        let request = json_request(
            "POST",
            "/uma/token",
            json!({ "permissions": [{ "resource_id": "https://pod.example/alice/data", "resource_scopes": ["read"] }] }),
        );
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["required_claims"][0]["claim_token_format"], WEBID);
        let ticket = body["ticket"].as_str().unwrap().to_string();

        let request = json_request(
            "POST",
            "/uma/token",
            json!({
                "grant_type": UMA_TICKET_GRANT,
                "ticket": ticket,
                "claim_token": "https%3A%2F%2Fpod.example%2Falice%23me",
                "claim_token_format": UNSECURE,
            }),
        );
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");

        let introspect = Request::post("/uma/introspect")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("token={}", body["access_token"].as_str().unwrap())))
            .unwrap();
        let (status, body) = send(&router, introspect).await;
        assert_eq!(status, StatusCode::OK);
        let claims = decode_unverified(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims["active"], true);
        assert_eq!(claims["permissions"][0]["resource_id"], "https://pod.example/alice/data");
    }

    #[tokio::test]
    async fn test_foreign_resource_is_forbidden() {
        let request = json_request(
            "POST",
            "/uma/token",
            json!({ "permissions": [{ "resource_id": "https://elsewhere.example/x", "resource_scopes": ["read"] }] }),
        );
        let (status, body) = send(&server().router(), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "request_denied");
    }

    #[tokio::test]
    async fn test_token_endpoint_rejects_non_json() {
        let request = Request::post("/uma/token")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("ticket=abc"))
            .unwrap();
        let (status, _) = send(&server().router(), request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_unknown_ticket_is_a_bad_request() {
        let request = json_request("POST", "/uma/token", json!({ "ticket": "does-not-exist" }));
        let (status, body) = send(&server().router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_ticket_endpoint() {
        let request = json_request(
            "POST",
            "/uma/ticket",
            json!([{ "resource_id": "https://pod.example/alice/data", "resource_scopes": ["read"] }]),
        );
        let (status, body) = send(&server().router(), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["ticket"].is_string());
    }

    #[tokio::test]
    async fn test_register_and_delete_resource() {
        let router = server().router();
        let request = json_request(
            "POST",
            "/uma/resources",
            json!({
                "resource_scopes": ["read"],
                "resource_relations": {
                    "prov:wasDerivedFrom": { "issuer": "https://as-up.example/uma", "derivation_resource_id": "D1" }
                }
            }),
        );
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["_id"].as_str().unwrap().to_string();
        assert_eq!(body["user_access_policy_uri"], "https://as.example/uma/policies");

        let uri = format!("/uma/resources/{}", id);
        let (status, _) = send(&router, Request::delete(uri.as_str()).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&router, Request::delete(uri.as_str()).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_garbage_token_is_not_introspected() {
        let request = Request::post("/uma/introspect")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("token=garbage"))
            .unwrap();
        let (status, body) = send(&server().router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_grant");
    }
}
