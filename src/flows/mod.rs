//! OAuth2 Flows
//!
//! One orchestrator per grant, each exposing [`Flow::run`]:
//!
//! - **Authorization Code** (RFC 6749 Section 4.1), with PKCE (RFC 7636), PAR (RFC 9126)
//! - **Client Credentials** (RFC 6749 Section 4.4)
//! - **Device Authorization** (RFC 8628)
//! - **Token Refresh** (RFC 6749 Section 6)
//! - **Token Exchange** (RFC 8693)
//! - **Token Introspection** (RFC 7662)
//!
//! DPoP (RFC 9449) is a property of the [`OidcClient`](crate::client::OidcClient)
//! the flow is built with.

pub mod authorization_code;
pub mod callback;
pub mod client_credentials;
pub mod device;
pub mod introspect;
pub mod polling;
pub mod token_exchange;
pub mod token_refresh;

use async_trait::async_trait;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{OAuth2Error, OAuth2Result, ProtocolError};
use crate::types::TokenResponse;

pub use authorization_code::{AuthorizationCodeFlow, AuthorizationCodeFlowConfig, DEFAULT_CALLBACK_URI};
pub use callback::{
    AuthFlowDependencies, AuthorizationUrlBuilder, CallbackServer, CallbackServerManager,
    DefaultAuthorizationUrlBuilder, DefaultCallbackServerManager, DefaultResponseValidator,
    MockCallbackServerManager, ResponseValidator, DEFAULT_CALLBACK_TIMEOUT,
    SERVER_STARTUP_TIMEOUT,
};
pub use client_credentials::{ClientCredentialsFlow, ClientCredentialsFlowConfig};
pub use device::{DeviceFlow, DeviceFlowConfig};
pub use introspect::IntrospectFlow;
pub use polling::{DevicePoller, PollStep};
pub use token_exchange::TokenExchangeFlow;
pub use token_refresh::{TokenRefreshFlow, TokenRefreshFlowConfig};

/// A grant run to completion within one cancellation scope.
#[async_trait]
pub trait Flow: Send + Sync {
    /// Run the flow. Cancellation surfaces as [`OAuth2Error::Cancelled`].
    async fn run(&self, cancel: CancellationToken) -> OAuth2Result<TokenResponse>;
}

/// Render a flow result as indented JSON.
pub fn to_pretty_json(response: &TokenResponse) -> OAuth2Result<String> {
    serde_json::to_string_pretty(response).map_err(|e| {
        OAuth2Error::from(ProtocolError::InvalidJson {
            message: e.to_string(),
        })
        .context("failed to format token response")
    })
}

/// Mock flow for testing.
#[derive(Default)]
pub struct MockFlow {
    outcome: Mutex<Option<OAuth2Result<TokenResponse>>>,
    runs: Mutex<u32>,
}

impl MockFlow {
    /// A flow that succeeds with `response`.
    pub fn succeeding(response: TokenResponse) -> Self {
        Self {
            outcome: Mutex::new(Some(Ok(response))),
            ..Self::default()
        }
    }

    /// A flow that fails with `error`.
    pub fn failing(error: OAuth2Error) -> Self {
        Self {
            outcome: Mutex::new(Some(Err(error))),
            ..Self::default()
        }
    }

    /// Number of times the flow was run.
    pub fn run_count(&self) -> u32 {
        *self.runs.lock().unwrap()
    }
}

#[async_trait]
impl Flow for MockFlow {
    async fn run(&self, cancel: CancellationToken) -> OAuth2Result<TokenResponse> {
        *self.runs.lock().unwrap() += 1;
        if cancel.is_cancelled() {
            return Err(OAuth2Error::Cancelled);
        }
        self.outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(TokenResponse::new()))
    }
}
