//! Client Credentials Flow
//!
//! RFC 6749 Section 4.4 - Client Credentials Grant.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::Flow;
use crate::builders::token_request;
use crate::client::OidcClient;
use crate::core::HttpTransport;
use crate::error::{OAuth2Result, ResultExt};
use crate::types::TokenResponse;

/// Client Credentials Flow settings.
#[derive(Debug, Clone, Default)]
pub struct ClientCredentialsFlowConfig {
    /// Space separated scopes. Sent only if non-empty.
    pub scopes: String,
}

/// Client Credentials Flow.
pub struct ClientCredentialsFlow<T: HttpTransport> {
    client: Arc<OidcClient<T>>,
    config: ClientCredentialsFlowConfig,
}

impl<T: HttpTransport> ClientCredentialsFlow<T> {
    /// Create new Client Credentials Flow.
    pub fn new(client: Arc<OidcClient<T>>, config: ClientCredentialsFlowConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl<T: HttpTransport> Flow for ClientCredentialsFlow<T> {
    async fn run(&self, cancel: CancellationToken) -> OAuth2Result<TokenResponse> {
        let config = self.client.config();
        let request = token_request::client_credentials(&config.credentials, &self.config.scopes);

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
