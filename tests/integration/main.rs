//! Integration tests against WireMock authorization servers.
//!
//! These exercise the real reqwest transport end to end: request encoding,
//! client authentication, response classification and flow orchestration.

mod authorization_code;
mod classifier;
mod flows;

use std::sync::Arc;

use oidc_cli::{oauth2_config, OAuth2Config, OidcClient};
use wiremock::MockServer;

/// Start a fresh mock authorization server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Configuration with every endpoint pointing at `server`.
pub fn server_config(server: &MockServer, client_secret: Option<&str>) -> OAuth2Config {
    let uri = server.uri();
    let mut builder = oauth2_config()
        .client_id("integration-client")
        .issuer(&uri)
        .authorization_endpoint(format!("{}/authorize", uri))
        .token_endpoint(format!("{}/token", uri))
        .device_authorization_endpoint(format!("{}/device", uri))
        .introspection_endpoint(format!("{}/introspect", uri))
        .pushed_authorization_request_endpoint(format!("{}/par", uri));
    if let Some(secret) = client_secret {
        builder = builder.client_secret(secret);
    }
    builder.build().expect("valid configuration")
}

/// Client with the production transport.
pub fn client(config: OAuth2Config) -> Arc<OidcClient> {
    Arc::new(OidcClient::new(config).expect("transport builds"))
}
