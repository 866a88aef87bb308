//! Token Refresh Flow
//!
//! RFC 6749 Section 6 - Refreshing an Access Token.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::Flow;
use crate::builders::token_request;
use crate::client::OidcClient;
use crate::core::HttpTransport;
use crate::error::{OAuth2Result, ResultExt};
use crate::types::TokenResponse;

/// Token Refresh Flow settings.
#[derive(Debug, Clone)]
pub struct TokenRefreshFlowConfig {
    pub refresh_token: SecretString,
    /// Space separated scopes. Sent only if non-empty.
    pub scopes: String,
}

/// Token Refresh Flow.
pub struct TokenRefreshFlow<T: HttpTransport> {
    client: Arc<OidcClient<T>>,
    config: TokenRefreshFlowConfig,
}

impl<T: HttpTransport> TokenRefreshFlow<T> {
    pub fn new(client: Arc<OidcClient<T>>, config: TokenRefreshFlowConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl<T: HttpTransport> Flow for TokenRefreshFlow<T> {
    async fn run(&self, cancel: CancellationToken) -> OAuth2Result<TokenResponse> {
        let config = self.client.config();
        let request = token_request::refresh_token(
            &config.credentials,
            self.config.refresh_token.expose_secret(),
            &self.config.scopes,
        );

        self.client
            .execute_token_request(
                &cancel,
                &config.provider.token_endpoint,
                &request,
                HashMap::new(),
            )
            .await
            .context("token request failed")?
            .into_result()
            .context("token")
    }
}
