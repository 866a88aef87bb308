//! OIDC CLI
//!
//! Client side of the OAuth2/OpenID Connect token-acquisition protocols.
//!
//! # Features
//!
//! - Authorization Code Flow (RFC 6749 Section 4.1)
//! - PKCE (RFC 7636) and Pushed Authorization Requests (RFC 9126)
//! - Client Credentials Flow (RFC 6749 Section 4.4)
//! - Device Authorization Flow (RFC 8628)
//! - Token Refresh (RFC 6749 Section 6)
//! - Token Exchange (RFC 8693)
//! - Token Introspection (RFC 7662)
//! - DPoP-bound tokens (RFC 9449)
//! - OIDC Discovery
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oidc_cli::{oauth2_config, ClientCredentialsFlow, ClientCredentialsFlowConfig, Flow, OidcClient};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = oauth2_config()
//!         .client_id("my-client-id")
//!         .client_secret("my-client-secret")
//!         .token_endpoint("https://provider.com/token")
//!         .build()?;
//!
//!     let client = Arc::new(OidcClient::new(config)?);
//!     let flow = ClientCredentialsFlow::new(
//!         client,
//!         ClientCredentialsFlowConfig { scopes: "api:read".to_string() },
//!     );
//!
//!     let token = flow.run(CancellationToken::new()).await?;
//!     println!("{}", oidc_cli::flows::to_pretty_json(&token)?);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: requests, responses and configuration
//! - `error`: error hierarchy with step context
//! - `core`: transport, response classification, PKCE, DPoP, discovery, browser
//! - `builders`: configuration and token request builders
//! - `client`: the protocol client every flow runs against
//! - `flows`: one orchestrator per grant, plus callback coordination and device polling
//! - `cli`: command layer of the `oidc-cli` binary (feature `cli`)

pub mod builders;
#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod types;

// Re-export main client
pub use client::OidcClient;

// Re-export builders
pub use builders::{oauth2_config, token_request, OAuth2ConfigBuilder, TokenRequestBuilder};

// Re-export errors
pub use error::{
    AuthorizationError, CallbackError, ConfigurationError, DpopError, NetworkError, OAuth2Error,
    OAuth2Result, ProtocolError, ResultExt,
};

// Re-export types
pub use types::{
    // Config
    AuthMethod, ClientCredentials, DiscoveryDocument, GrantType, OAuth2Config, ProviderConfig,
    // Token
    TokenExchangeInput, TokenRequest, TokenResponse, ACCESS_TOKEN_TYPE,
    // Auth
    AuthorizationCodeRequest, AuthorizationCodeResponse, CustomArgs, PkceMethod, PkceParams,
    // Callback
    CallbackResponse,
    // Device
    DeviceAuthorizationRequest, DeviceAuthorizationResponse,
    // Introspection
    IntrospectionRequest, TokenTypeHint,
};

// Re-export core components
pub use crate::core::{
    // Transport
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
    // Classification
    ClassifiedResponse,
    // PKCE
    DefaultPkceGenerator, MockPkceGenerator, PkceGenerator,
    // DPoP
    DpopProver, MockDpopProver,
    // Discovery
    DefaultDiscoveryClient, DiscoveryClient, MockDiscoveryClient,
    // Browser
    BrowserLauncher, MockBrowserLauncher, SystemBrowserLauncher,
};

#[cfg(feature = "jwt")]
pub use crate::core::{JwtDpopProver, KeyMaterialReader};

// Re-export flows
pub use flows::{
    AuthFlowDependencies, AuthorizationCodeFlow, AuthorizationCodeFlowConfig,
    CallbackServerManager, ClientCredentialsFlow, ClientCredentialsFlowConfig,
    DefaultCallbackServerManager, DeviceFlow, DeviceFlowConfig, DevicePoller, Flow,
    IntrospectFlow, MockCallbackServerManager, MockFlow, PollStep, TokenExchangeFlow,
    TokenRefreshFlow, TokenRefreshFlowConfig,
};
