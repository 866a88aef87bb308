//! Token Exchange Flow
//!
//! RFC 8693 - OAuth 2.0 Token Exchange.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::Flow;
use crate::builders::token_request;
use crate::client::OidcClient;
use crate::core::HttpTransport;
use crate::error::{OAuth2Result, ResultExt};
use crate::types::{TokenExchangeInput, TokenResponse};

/// Token Exchange Flow.
pub struct TokenExchangeFlow<T: HttpTransport> {
    client: Arc<OidcClient<T>>,
    input: TokenExchangeInput,
}

impl<T: HttpTransport> TokenExchangeFlow<T> {
    pub fn new(client: Arc<OidcClient<T>>, input: TokenExchangeInput) -> Self {
        Self { client, input }
    }
}

#[async_trait]
impl<T: HttpTransport> Flow for TokenExchangeFlow<T> {
    async fn run(&self, cancel: CancellationToken) -> OAuth2Result<TokenResponse> {
        let config = self.client.config();
        let request = token_request::token_exchange(&config.credentials, &self.input);

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
