//! Token Introspection Flow
//!
//! RFC 7662 - OAuth 2.0 Token Introspection.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::Flow;
use crate::client::OidcClient;
use crate::core::HttpTransport;
use crate::error::{OAuth2Result, ResultExt};
use crate::types::{IntrospectionRequest, TokenResponse};

/// Token Introspection Flow. The introspection response is returned as
/// received.
pub struct IntrospectFlow<T: HttpTransport> {
    client: Arc<OidcClient<T>>,
    request: IntrospectionRequest,
}

impl<T: HttpTransport> IntrospectFlow<T> {
    pub fn new(client: Arc<OidcClient<T>>, request: IntrospectionRequest) -> Self {
        Self { client, request }
    }
}

#[async_trait]
impl<T: HttpTransport> Flow for IntrospectFlow<T> {
    async fn run(&self, cancel: CancellationToken) -> OAuth2Result<TokenResponse> {
        let endpoint = self
            .client
            .config()
            .provider
            .introspection_endpoint
            .as_deref()
            .unwrap_or_default();

        self.client
            .introspect(&cancel, endpoint, &self.request)
            .await
            .context("introspection request failed")?
            .into_result()
            .context("introspection")
    }
}
